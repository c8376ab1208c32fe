#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Sentinel Outbox
//!
//! Store-and-forward durability layer for the chat platform.
//!
//! ## Overview
//!
//! When the primary datastore cannot take a write (chat message, direct
//! message, escrow request, migration record), the write path persists it to a
//! crash-safe local queue instead. A reconciler later replays queued records
//! into the datastore once it is reachable again, without losing or
//! duplicating any of them.
//!
//! ## Architecture
//!
//! ```text
//! write path ──enqueue──▶ DurableQueue ◀──list/read/mark── Reconciler ──replay──▶ primary store
//!                                                              │
//!                                                              └──is_available──▶ HealthMonitor
//! ```
//!
//! ## Module Organization
//!
//! - [`health`] - cached datastore reachability with throttled self-repair
//! - [`queue`] - file-backed write-ahead log with atomic writes
//! - [`reconciler`] - health-gated, idempotent replay and the drain loop
//! - [`database`] - PostgreSQL connections and SQLSTATE classification
//! - [`config`] - layered configuration
//! - [`clock`] - injectable time source
//! - [`logging`] - structured logging setup
//! - [`error`] - crate-level error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentinel_outbox::clock::SystemClock;
//! use sentinel_outbox::config::ConfigManager;
//! use sentinel_outbox::database::DatabaseConnection;
//! use sentinel_outbox::health::{HealthMonitor, PostgresProbe};
//! use sentinel_outbox::queue::DurableQueue;
//! use sentinel_outbox::reconciler::{DrainScheduler, Reconciler};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let probe = PostgresProbe::new(DatabaseConnection::new(config.database.clone()));
//! let health = Arc::new(HealthMonitor::new(
//!     Arc::new(probe),
//!     Arc::new(SystemClock),
//!     config.health.clone(),
//! ));
//! let queue = Arc::new(DurableQueue::open(&config.storage.root_dir).await?);
//!
//! // Write paths register one idempotent replay handler per record type:
//! // let reconciler = Reconciler::new(health, queue).register("message", message_replay);
//! let reconciler = Arc::new(Reconciler::new(health, queue));
//! let drain_loop = DrainScheduler::spawn(reconciler, config.drain.clone());
//! drain_loop.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod health;
pub mod logging;
pub mod queue;
pub mod reconciler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigManager, OutboxConfig};
pub use constants::record_types;
pub use error::{OutboxError, OutboxResult};
pub use health::{DatastoreProbe, HealthMonitor, HealthStatus, PostgresProbe, ProbeError};
pub use queue::{DurableQueue, QueueError, QueueRecord, RecordHandle, RecordMetadata};
pub use reconciler::{
    classify_insert, DrainReport, DrainScheduler, DrainStatus, Reconciler, ReconcilerStats,
    ReplayError, ReplayHandler, ReplayOutcome, TypeDrainResult,
};
