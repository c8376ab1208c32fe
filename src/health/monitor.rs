//! # Health Monitor
//!
//! Cached reachability of the primary store.
//!
//! A probe result is trusted for the configured freshness window; once the
//! window has elapsed the next call always probes again. A failed probe triggers
//! a self-repair attempt, throttled to one per repair interval. The cache and the
//! throttle are fields of the monitor, so each process (each monitor instance)
//! keeps its own window and its own throttle.
//!
//! Nothing here returns an error: every failure collapses to `false` plus a log
//! line.

use super::probe::{DatastoreProbe, ProbeError};
use crate::clock::Clock;
use crate::config::HealthConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of the most recent probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub available: bool,
    pub checked_at: DateTime<Utc>,
}

pub struct HealthMonitor {
    probe: Arc<dyn DatastoreProbe>,
    clock: Arc<dyn Clock>,
    config: HealthConfig,
    status: Mutex<Option<HealthStatus>>,
    last_repair_attempt: Mutex<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("probe", &self.probe.name())
            .field("config", &self.config)
            .field("status", &*self.status.lock())
            .finish()
    }
}

impl HealthMonitor {
    pub fn new(probe: Arc<dyn DatastoreProbe>, clock: Arc<dyn Clock>, config: HealthConfig) -> Self {
        Self {
            probe,
            clock,
            config,
            status: Mutex::new(None),
            last_repair_attempt: Mutex::new(None),
        }
    }

    /// Whether the primary store is reachable, served from cache while fresh
    pub async fn is_available(&self) -> bool {
        if let Some(status) = self.fresh_status() {
            debug!(available = status.available, "Using cached datastore health");
            return status.available;
        }
        self.probe_and_cache().await
    }

    /// Ignore the cache and probe now. The previous status stays visible until
    /// the new probe replaces it.
    pub async fn check_fresh(&self) -> bool {
        self.probe_and_cache().await
    }

    /// Cached availability without probing; `None` before the first probe
    pub fn last_status(&self) -> Option<bool> {
        (*self.status.lock()).map(|s| s.available)
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        (*self.status.lock()).map(|s| s.checked_at)
    }

    pub fn snapshot(&self) -> Option<HealthStatus> {
        *self.status.lock()
    }

    fn fresh_status(&self) -> Option<HealthStatus> {
        let status = (*self.status.lock())?;
        // A clock that moved backwards yields a negative age and forces a probe.
        let age = (self.clock.now() - status.checked_at).to_std().ok()?;
        (age < self.config.freshness_window()).then_some(status)
    }

    async fn probe_and_cache(&self) -> bool {
        let timeout = self.config.probe_timeout();
        let outcome = match tokio::time::timeout(timeout, self.probe.ping()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(timeout)),
        };

        let available = outcome.is_ok();
        let previous = self.last_status();
        *self.status.lock() = Some(HealthStatus {
            available,
            checked_at: self.clock.now(),
        });

        match outcome {
            Ok(()) => {
                if previous != Some(true) {
                    info!(probe = %self.probe.name(), "🟢 Primary datastore available");
                }
            }
            Err(err) => {
                warn!(
                    probe = %self.probe.name(),
                    error = %err,
                    "🔴 Primary datastore unavailable"
                );
                self.attempt_repair().await;
            }
        }

        available
    }

    async fn attempt_repair(&self) {
        let now = self.clock.now();
        {
            let mut last = self.last_repair_attempt.lock();
            if let Some(previous) = *last {
                let since = (now - previous).to_std().unwrap_or_default();
                if since < self.config.repair_interval() {
                    debug!(
                        seconds_since_last = since.as_secs(),
                        "Skipping datastore repair (throttled)"
                    );
                    return;
                }
            }
            *last = Some(now);
        }

        match self.probe.repair().await {
            Ok(()) => info!(probe = %self.probe.name(), "🛠️ Datastore repair attempt completed"),
            Err(err) => warn!(
                probe = %self.probe.name(),
                error = %err,
                "🛠️ Datastore repair attempt failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedProbe {
        up: AtomicBool,
        pings: AtomicUsize,
        repairs: AtomicUsize,
    }

    #[async_trait]
    impl DatastoreProbe for ScriptedProbe {
        async fn ping(&self) -> Result<(), ProbeError> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(ProbeError::Unreachable("connection refused".to_string()))
            }
        }

        async fn repair(&self) -> Result<(), ProbeError> {
            self.repairs.fetch_add(1, Ordering::SeqCst);
            Err(ProbeError::Unreachable("still down".to_string()))
        }
    }

    fn monitor(probe: Arc<ScriptedProbe>, clock: Arc<ManualClock>) -> HealthMonitor {
        HealthMonitor::new(probe, clock, HealthConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_before_first_probe() {
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(probe.clone(), Arc::new(ManualClock::default()));
        assert_eq!(monitor.last_status(), None);
        assert_eq!(probe.pings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_expires_exactly_at_window() {
        let probe = Arc::new(ScriptedProbe::default());
        probe.up.store(true, Ordering::SeqCst);
        let clock = Arc::new(ManualClock::default());
        let monitor = monitor(probe.clone(), clock.clone());

        assert!(monitor.is_available().await);
        clock.advance(Duration::milliseconds(4_999));
        assert!(monitor.is_available().await);
        assert_eq!(probe.pings.load(Ordering::SeqCst), 1);

        clock.advance(Duration::milliseconds(1));
        assert!(monitor.is_available().await);
        assert_eq!(probe.pings.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_repair_failure_is_swallowed() {
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(probe.clone(), Arc::new(ManualClock::default()));

        assert!(!monitor.check_fresh().await);
        assert_eq!(probe.repairs.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.last_status(), Some(false));
    }
}
