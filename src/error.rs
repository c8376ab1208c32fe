//! Error types for the outbox.
//!
//! Each component owns a focused error enum; [`OutboxError`] is the crate-level
//! umbrella that callers can bubble up with `?`.

use crate::config::ConfigurationError;
use crate::health::ProbeError;
use crate::queue::QueueError;
use crate::reconciler::ReplayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Datastore probe error: {0}")]
    Probe(#[from] ProbeError),
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for OutboxError {
    fn from(err: sqlx::Error) -> Self {
        OutboxError::Database(err.to_string())
    }
}

pub type OutboxResult<T> = std::result::Result<T, OutboxError>;
