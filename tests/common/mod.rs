//! Shared fixtures: a scriptable datastore probe, a replay handler that keeps
//! natural keys in memory, and a harness wiring them to a temp-dir queue.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use sentinel_outbox::clock::ManualClock;
use sentinel_outbox::config::HealthConfig;
use sentinel_outbox::health::{DatastoreProbe, HealthMonitor, ProbeError};
use sentinel_outbox::queue::DurableQueue;
use sentinel_outbox::reconciler::{ReplayError, ReplayHandler, ReplayOutcome};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Probe whose availability is flipped by the test
#[derive(Debug, Default)]
pub struct FakeProbe {
    up: AtomicBool,
    repair_succeeds: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub pings: AtomicUsize,
    pub repairs: AtomicUsize,
}

impl FakeProbe {
    pub fn up() -> Self {
        let probe = Self::default();
        probe.set_up(true);
        probe
    }

    pub fn down() -> Self {
        Self::default()
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    /// Repair "creates" the missing schema and brings the store up
    pub fn repair_restores(&self) {
        self.repair_succeeds.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn repair_count(&self) -> usize {
        self.repairs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatastoreProbe for FakeProbe {
    async fn ping(&self) -> Result<(), ProbeError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProbeError::MissingSchema(
                "database \"sentinel\" does not exist".to_string(),
            ))
        }
    }

    async fn repair(&self) -> Result<(), ProbeError> {
        self.repairs.fetch_add(1, Ordering::SeqCst);
        if self.repair_succeeds.load(Ordering::SeqCst) {
            self.set_up(true);
            Ok(())
        } else {
            Err(ProbeError::Unreachable("connection refused".to_string()))
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Replay handler backed by an in-memory set of natural keys
#[derive(Debug)]
pub struct RecordingReplay {
    key_field: String,
    stored: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, ReplayError>>,
    calls: Mutex<Vec<String>>,
    journal: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecordingReplay {
    pub fn new(key_field: &str) -> Self {
        Self {
            key_field: key_field.to_string(),
            stored: Mutex::new(HashSet::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// Also append `"{tag}:{key}"` to a journal shared across handlers
    pub fn with_journal(key_field: &str, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new(key_field)
        }
    }

    /// Pretend `key` already landed in the primary store
    pub fn preload(&self, key: &str) {
        self.stored.lock().insert(key.to_string());
    }

    pub fn fail_with(&self, key: &str, error: ReplayError) {
        self.failures.lock().insert(key.to_string(), error);
    }

    pub fn clear_failure(&self, key: &str) {
        self.failures.lock().remove(key);
    }

    /// Natural keys in the order replay was attempted
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn stored_count(&self) -> usize {
        self.stored.lock().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.stored.lock().contains(key)
    }
}

#[async_trait]
impl ReplayHandler for RecordingReplay {
    async fn replay(&self, payload: &Map<String, Value>) -> Result<ReplayOutcome, ReplayError> {
        let key = payload
            .get(&self.key_field)
            .and_then(Value::as_str)
            .ok_or_else(|| ReplayError::Permanent(format!("missing {}", self.key_field)))?
            .to_string();

        self.calls.lock().push(key.clone());
        if let Some(journal) = &self.journal {
            journal.lock().push(format!("{}:{}", self.key_field, key));
        }

        if let Some(error) = self.failures.lock().get(&key) {
            return Err(error.clone());
        }
        if self.stored.lock().insert(key) {
            Ok(ReplayOutcome::Inserted)
        } else {
            Ok(ReplayOutcome::AlreadyExists)
        }
    }
}

/// Temp-dir queue plus health monitor sharing one manual clock
pub struct Harness {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub probe: Arc<FakeProbe>,
    pub health: Arc<HealthMonitor>,
    pub queue: Arc<DurableQueue>,
}

impl Harness {
    pub async fn new(probe: FakeProbe) -> Self {
        Self::with_health_config(probe, HealthConfig::default()).await
    }

    pub async fn with_health_config(probe: FakeProbe, config: HealthConfig) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let start = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid start time");
        let clock = Arc::new(ManualClock::new(start));
        let probe = Arc::new(probe);
        let health = Arc::new(HealthMonitor::new(probe.clone(), clock.clone(), config));
        let queue = Arc::new(
            DurableQueue::open_with_clock(dir.path().join("storage"), clock.clone())
                .await
                .expect("open queue"),
        );

        Self {
            dir,
            clock,
            probe,
            health,
            queue,
        }
    }

    /// Move past the health freshness window so the next check re-probes
    pub fn expire_health_cache(&self) {
        self.clock.advance(chrono::Duration::seconds(6));
    }
}
