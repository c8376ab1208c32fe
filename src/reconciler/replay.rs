//! # Replay Contract
//!
//! Write paths that defer to the queue also supply, per record type, the
//! function that re-applies a stored payload to the primary store. Replays must
//! be idempotent: a record whose natural key is already present reports
//! [`ReplayOutcome::AlreadyExists`] and is treated as delivered.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use sentinel_outbox::reconciler::{classify_insert, ReplayError, ReplayHandler, ReplayOutcome};
//! use serde_json::{Map, Value};
//! use sqlx::PgPool;
//!
//! struct MessageReplay {
//!     pool: PgPool,
//! }
//!
//! #[async_trait]
//! impl ReplayHandler for MessageReplay {
//!     async fn replay(&self, payload: &Map<String, Value>) -> Result<ReplayOutcome, ReplayError> {
//!         let message_id = payload
//!             .get("message_id")
//!             .and_then(Value::as_str)
//!             .ok_or_else(|| ReplayError::Permanent("payload has no message_id".to_string()))?;
//!         let result = sqlx::query("INSERT INTO messages (message_id, body) VALUES ($1, $2)")
//!             .bind(message_id)
//!             .bind(payload.get("body").and_then(Value::as_str))
//!             .execute(&self.pool)
//!             .await;
//!         classify_insert(result)
//!     }
//! }
//! ```

use crate::database::PgErrorCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Successful replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// The payload was written to the primary store
    Inserted,
    /// The natural key was already present; nothing was written
    AlreadyExists,
}

/// Failed replay. Either way the record stays queued and is retried on the
/// next drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// Expected to clear up by itself (connectivity, contention)
    #[error("transient replay failure: {0}")]
    Transient(String),

    /// Will keep failing as-is (constraint, malformed payload)
    #[error("permanent replay failure: {0}")]
    Permanent(String),
}

impl ReplayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ReplayError::Transient(_))
    }
}

impl From<sqlx::Error> for ReplayError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::Database(db_err) => db_err
                .code()
                .is_some_and(|code| PgErrorCode::is_transient(&code)),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            _ => false,
        };

        if transient {
            ReplayError::Transient(err.to_string())
        } else {
            ReplayError::Permanent(err.to_string())
        }
    }
}

/// Map the result of an insert keyed by a natural key onto the replay contract.
///
/// A unique violation means an earlier replay (or the original write) already
/// landed, which counts as success.
pub fn classify_insert<T>(result: Result<T, sqlx::Error>) -> Result<ReplayOutcome, ReplayError> {
    match result {
        Ok(_) => Ok(ReplayOutcome::Inserted),
        Err(err) => {
            let duplicate = err
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .is_some_and(|code| PgErrorCode::is_unique_violation(&code));
            if duplicate {
                Ok(ReplayOutcome::AlreadyExists)
            } else {
                Err(ReplayError::from(err))
            }
        }
    }
}

/// Re-applies stored payloads of one record type to the primary store
#[async_trait]
pub trait ReplayHandler: Send + Sync {
    async fn replay(&self, payload: &Map<String, Value>) -> Result<ReplayOutcome, ReplayError>;
}
