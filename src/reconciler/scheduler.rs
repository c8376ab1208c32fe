//! # Drain Loop
//!
//! Runs [`Reconciler::drain`] on a fixed interval. One pass is in flight at a
//! time; shutdown waits for the current pass to finish.

use super::drain::Reconciler;
use crate::config::DrainConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Queue depth and loop settings, as reported to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainStatus {
    pub pending_per_type: BTreeMap<String, usize>,
    pub pending_total: usize,
    pub batch_size: usize,
    pub interval_seconds: u64,
    pub database_available: bool,
}

impl DrainStatus {
    pub async fn collect(reconciler: &Reconciler, config: &DrainConfig) -> Self {
        let stats = reconciler.stats().await;
        Self {
            pending_total: stats.per_type.values().sum(),
            pending_per_type: stats.per_type,
            batch_size: config.batch_size,
            interval_seconds: config.interval_seconds,
            database_available: stats.database_available,
        }
    }
}

pub struct DrainScheduler;

impl DrainScheduler {
    /// Start draining every `config.interval()`; the first pass runs immediately
    pub fn spawn(reconciler: Arc<Reconciler>, config: DrainConfig) -> DrainSchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let passes = Arc::new(AtomicU64::new(0));

        let task = {
            let reconciler = reconciler.clone();
            let config = config.clone();
            let passes = passes.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(config.interval());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info!(
                    batch_size = config.batch_size,
                    interval_seconds = config.interval_seconds,
                    "🚀 Drain loop started"
                );

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let report = reconciler.drain(config.batch_size).await;
                            let pass = passes.fetch_add(1, Ordering::SeqCst) + 1;
                            debug!(
                                pass = pass,
                                database_available = report.database_available,
                                synced = report.total_synced(),
                                failed = report.total_failed(),
                                "Drain pass finished"
                            );
                        }
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }

                info!("🛑 Drain loop stopped");
            })
        };

        DrainSchedulerHandle {
            shutdown: shutdown_tx,
            task,
            passes,
            reconciler,
            config,
        }
    }
}

pub struct DrainSchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    passes: Arc<AtomicU64>,
    reconciler: Arc<Reconciler>,
    config: DrainConfig,
}

impl DrainSchedulerHandle {
    pub fn passes_completed(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> DrainStatus {
        DrainStatus::collect(&self.reconciler, &self.config).await
    }

    /// Stop the loop after the in-flight pass, if any, completes
    pub async fn shutdown(self) {
        // The receiver is gone only if the task already exited.
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            error!(error = %err, "Drain loop task ended abnormally");
        }
    }
}
