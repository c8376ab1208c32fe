//! # Reconciliation
//!
//! Moves queued writes into the primary store once it is reachable.
//!
//! - [`Reconciler`] - health-gated, batch-bounded drain of unsynced records
//! - [`ReplayHandler`] - per-type, idempotent replay supplied by write paths
//! - [`DrainScheduler`] - optional fixed-interval drain loop

pub mod drain;
pub mod replay;
pub mod scheduler;

pub use drain::{DrainReport, Reconciler, ReconcilerStats, TypeDrainResult};
pub use replay::{classify_insert, ReplayError, ReplayHandler, ReplayOutcome};
pub use scheduler::{DrainScheduler, DrainSchedulerHandle, DrainStatus};
