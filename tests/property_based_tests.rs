use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use sentinel_outbox::clock::ManualClock;
use sentinel_outbox::queue::stamp::{record_file_name, TimestampStamper};
use sentinel_outbox::queue::{DurableQueue, RecordHandle};
use serde_json::{json, Value};
use std::sync::Arc;

// 2001-01-01 .. 2099-12-31, in microseconds since the epoch
const MIN_MICROS: i64 = 978_307_200_000_000;
const MAX_MICROS: i64 = 4_102_358_400_000_000;

fn stamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (MIN_MICROS..MAX_MICROS).prop_filter_map("representable", DateTime::<Utc>::from_timestamp_micros)
}

fn record_type_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(sentinel_outbox::record_types::ALL.to_vec())
}

proptest! {
    /// Property: file names of one type sort lexically in stamp order
    #[test]
    fn file_names_sort_in_stamp_order(
        record_type in record_type_strategy(),
        a in stamp_strategy(),
        b in stamp_strategy(),
    ) {
        let name_a = record_file_name(record_type, &a);
        let name_b = record_file_name(record_type, &b);
        prop_assert_eq!(a.cmp(&b), name_a.cmp(&name_b));
    }

    /// Property: every generated file name is an acceptable record handle
    #[test]
    fn file_names_are_valid_handles(record_type in record_type_strategy(), stamp in stamp_strategy()) {
        let name = record_file_name(record_type, &stamp);
        let prefix = format!("{record_type}_");
        prop_assert!(name.starts_with(&prefix));
        prop_assert!(RecordHandle::new(name).is_ok());
    }

    /// Property: stamps strictly increase whatever the clock does between calls
    #[test]
    fn stamper_is_strictly_monotonic(steps in prop::collection::vec(-5_000_000i64..5_000_000, 1..64)) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let stamper = TimestampStamper::new(clock.clone());

        let mut previous = stamper.next();
        for step in steps {
            clock.advance(Duration::microseconds(step));
            let next = stamper.next();
            prop_assert!(next > previous, "{} did not advance past {}", next, previous);
            previous = next;
        }
    }

    /// Property: handles that could escape the queue directory are rejected
    #[test]
    fn path_like_handles_are_rejected(stem in "[a-z_]{1,12}", sep in prop::sample::select(vec!["/", "\\"])) {
        let candidate = format!("{stem}{sep}{stem}.json");
        prop_assert!(RecordHandle::new(candidate).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: any finite float in a payload reads back bit-for-bit
    #[test]
    fn float_payloads_read_back_exactly(
        bits in prop::collection::vec(any::<u64>(), 1..8)
    ) {
        let values: Vec<f64> = bits
            .into_iter()
            .map(f64::from_bits)
            .filter(|v| v.is_finite())
            .collect();
        let payload = json!({"values": values});

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let read_back = runtime.block_on(async {
            let queue = DurableQueue::open(dir.path()).await.unwrap();
            let handle = queue.enqueue("message", payload.clone()).await.unwrap();
            queue.read(&handle).await.unwrap()
        });

        let restored: Vec<f64> = read_back.payload["values"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        prop_assert_eq!(
            restored.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            values.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
        prop_assert_eq!(Value::Object(read_back.payload), payload);
    }
}
