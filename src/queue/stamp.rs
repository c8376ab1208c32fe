use crate::clock::Clock;
use crate::constants::layout;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Issues strictly increasing microsecond timestamps.
///
/// Two stamps from the same stamper always differ by at least one microsecond,
/// even when the clock has not advanced (bursts) or has stepped backwards. File
/// names derived from the stamps therefore never collide in-process and sort
/// lexically in issue order.
#[derive(Debug)]
pub struct TimestampStamper {
    clock: Arc<dyn Clock>,
    last_micros: Mutex<i64>,
}

impl TimestampStamper {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_micros: Mutex::new(i64::MIN),
        }
    }

    pub fn next(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        let mut last = self.last_micros.lock();
        let micros = now.timestamp_micros().max(last.saturating_add(1));
        *last = micros;
        DateTime::from_timestamp_micros(micros).unwrap_or(now)
    }
}

/// `{type}_{YYYYMMDDHHMMSS}_{micros:06}.json`
pub fn record_file_name(record_type: &str, stamp: &DateTime<Utc>) -> String {
    format!(
        "{}_{}_{:06}.{}",
        record_type,
        stamp.format(layout::FILENAME_TIME_FORMAT),
        stamp.timestamp_subsec_micros(),
        layout::RECORD_EXTENSION
    )
}

/// Epoch seconds with microsecond precision
pub fn epoch_seconds(stamp: &DateTime<Utc>) -> f64 {
    stamp.timestamp_micros() as f64 / 1_000_000.0
}
