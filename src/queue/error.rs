use std::path::PathBuf;
use thiserror::Error;

/// Queue failures.
///
/// Write-side variants are fatal for the caller: the queue is the last
/// durability layer and there is nothing below it to fall back to.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to prepare queue storage at {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write queue record {handle}: {source}")]
    Write {
        handle: String,
        source: std::io::Error,
    },

    #[error("Failed to read queue record {handle}: {source}")]
    Read {
        handle: String,
        source: std::io::Error,
    },

    #[error("Failed to scan queue directory {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to delete queue record {handle}: {source}")]
    Delete {
        handle: String,
        source: std::io::Error,
    },

    #[error("Failed to encode queue record {handle}: {source}")]
    Encode {
        handle: String,
        source: serde_json::Error,
    },

    #[error("Corrupt queue record {handle}: {reason}")]
    Corrupt { handle: String, reason: String },

    #[error("Invalid record type '{0}': expected ASCII alphanumerics and '_'")]
    InvalidRecordType(String),

    #[error("Invalid payload for record type '{record_type}': {reason}")]
    InvalidPayload { record_type: String, reason: String },

    #[error("Invalid record handle '{0}'")]
    InvalidHandle(String),
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;
