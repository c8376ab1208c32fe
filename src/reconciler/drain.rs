//! # Reconciler
//!
//! Drains unsynced queue records into the primary store.
//!
//! A pass is gated on [`HealthMonitor::is_available`]: against a store known to
//! be down nothing is attempted. Otherwise each registered record type is
//! processed in registration order, oldest record first, up to the per-type
//! batch bound. A failing record is logged and left unsynced; it never stops
//! the rest of the batch.
//!
//! Delivery is at-least-once. A record that keeps failing is retried on every
//! pass until it succeeds or is removed from the queue out of band.

use super::replay::{ReplayError, ReplayHandler, ReplayOutcome};
use crate::health::HealthMonitor;
use crate::logging::log_error;
use crate::queue::{DurableQueue, RecordHandle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-type outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDrainResult {
    /// Records replayed (or found already present) and marked synced
    pub synced_count: usize,
    /// Records left unsynced this pass
    pub failed_count: usize,
    /// Subset of `synced_count` whose natural key was already present
    pub already_present_count: usize,
    /// Subset of `failed_count` reported as permanent by the replay handler
    pub permanent_failure_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Health verdict the pass was gated on
    pub database_available: bool,
    pub per_type: BTreeMap<String, TypeDrainResult>,
}

impl DrainReport {
    pub fn get(&self, record_type: &str) -> TypeDrainResult {
        self.per_type.get(record_type).copied().unwrap_or_default()
    }

    pub fn total_synced(&self) -> usize {
        self.per_type.values().map(|r| r.synced_count).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.per_type.values().map(|r| r.failed_count).sum()
    }
}

/// Read-only snapshot for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerStats {
    /// Unsynced record count per registered type
    pub per_type: BTreeMap<String, usize>,
    pub database_available: bool,
}

pub struct Reconciler {
    health: Arc<HealthMonitor>,
    queue: Arc<DurableQueue>,
    handlers: Vec<(String, Arc<dyn ReplayHandler>)>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("queue_dir", &self.queue.queue_dir())
            .field("record_types", &self.registered_types())
            .finish()
    }
}

impl Reconciler {
    pub fn new(health: Arc<HealthMonitor>, queue: Arc<DurableQueue>) -> Self {
        Self {
            health,
            queue,
            handlers: Vec::new(),
        }
    }

    /// Register the replay function for `record_type`.
    ///
    /// Types drain in registration order. Re-registering a type replaces its
    /// handler and keeps its position.
    pub fn register(
        mut self,
        record_type: impl Into<String>,
        handler: Arc<dyn ReplayHandler>,
    ) -> Self {
        let record_type = record_type.into();
        match self.handlers.iter_mut().find(|(t, _)| *t == record_type) {
            Some(slot) => {
                warn!(record_type = %record_type, "Replacing replay handler");
                slot.1 = handler;
            }
            None => {
                debug!(record_type = %record_type, "Registered replay handler");
                self.handlers.push((record_type, handler));
            }
        }
        self
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.handlers.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn queue(&self) -> &Arc<DurableQueue> {
        &self.queue
    }

    /// Replay up to `max_per_type` unsynced records of every registered type
    pub async fn drain(&self, max_per_type: usize) -> DrainReport {
        let mut report = DrainReport {
            database_available: false,
            per_type: self
                .handlers
                .iter()
                .map(|(t, _)| (t.clone(), TypeDrainResult::default()))
                .collect(),
        };

        if !self.health.is_available().await {
            info!("⏸️ Primary datastore unavailable, skipping drain pass");
            return report;
        }
        report.database_available = true;

        for (record_type, handler) in &self.handlers {
            let result = self
                .drain_type(record_type, handler.as_ref(), max_per_type)
                .await;
            report.per_type.insert(record_type.clone(), result);
        }

        if report.total_synced() > 0 || report.total_failed() > 0 {
            info!(
                synced = report.total_synced(),
                failed = report.total_failed(),
                "🔄 Drain pass completed"
            );
        }
        report
    }

    async fn drain_type(
        &self,
        record_type: &str,
        handler: &dyn ReplayHandler,
        max_per_type: usize,
    ) -> TypeDrainResult {
        let mut result = TypeDrainResult::default();

        let handles = match self.queue.list_unsynced(record_type).await {
            Ok(handles) => handles,
            Err(err) => {
                log_error("reconciler", "list_unsynced", &err.to_string(), Some(record_type));
                return result;
            }
        };

        for handle in handles.into_iter().take(max_per_type) {
            let Some(record) = self.queue.read(&handle).await else {
                error!(
                    record_type = %record_type,
                    handle = %handle,
                    "❌ Queued record vanished or became unreadable before replay"
                );
                result.failed_count += 1;
                continue;
            };
            if record.is_synced() {
                // Another reconciler got here first.
                continue;
            }

            match handler.replay(&record.payload).await {
                Ok(outcome) => {
                    if self.mark_synced(record_type, &handle).await {
                        result.synced_count += 1;
                        if outcome == ReplayOutcome::AlreadyExists {
                            result.already_present_count += 1;
                        }
                    } else {
                        result.failed_count += 1;
                    }
                }
                Err(err) => {
                    result.failed_count += 1;
                    if !err.is_transient() {
                        result.permanent_failure_count += 1;
                    }
                    log_replay_failure(record_type, &handle, &err);
                }
            }
        }

        debug!(
            record_type = %record_type,
            synced = result.synced_count,
            failed = result.failed_count,
            "Drained record type"
        );
        result
    }

    /// Sync-mark after a successful replay. A failure here leaves the record
    /// queued; the next pass replays it again and sees `AlreadyExists`.
    async fn mark_synced(&self, record_type: &str, handle: &RecordHandle) -> bool {
        match self.queue.mark_synced(handle).await {
            Ok(true) => true,
            Ok(false) => {
                error!(
                    record_type = %record_type,
                    handle = %handle,
                    "❌ Replayed record could not be marked synced (missing or unreadable)"
                );
                false
            }
            Err(err) => {
                error!(
                    record_type = %record_type,
                    handle = %handle,
                    error = %err,
                    "❌ Failed to mark replayed record as synced"
                );
                false
            }
        }
    }

    /// Unsynced counts per registered type plus datastore availability
    pub async fn stats(&self) -> ReconcilerStats {
        let mut per_type = BTreeMap::new();
        for (record_type, _) in &self.handlers {
            match self.queue.unsynced_count(record_type).await {
                Ok(count) => {
                    per_type.insert(record_type.clone(), count);
                }
                Err(err) => {
                    log_error("reconciler", "unsynced_count", &err.to_string(), Some(record_type));
                }
            }
        }

        ReconcilerStats {
            per_type,
            database_available: self.health.is_available().await,
        }
    }
}

fn log_replay_failure(record_type: &str, handle: &RecordHandle, err: &ReplayError) {
    match err {
        ReplayError::Transient(cause) => warn!(
            record_type = %record_type,
            handle = %handle,
            cause = %cause,
            "⚠️ Replay failed, will retry next pass"
        ),
        ReplayError::Permanent(cause) => error!(
            record_type = %record_type,
            handle = %handle,
            cause = %cause,
            "❌ Replay failed permanently, record stays queued"
        ),
    }
}
