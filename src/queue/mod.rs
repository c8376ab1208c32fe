//! # Durable Queue
//!
//! Crash-safe, file-backed store for writes deferred from the primary store.
//!
//! ## Layout
//!
//! ```text
//! <root>/            deny-all marker, owner-only permissions
//! <root>/queue/      {type}_{YYYYMMDDHHMMSS}_{micros}.json, pending and synced
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sentinel_outbox::queue::DurableQueue;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = DurableQueue::open("storage").await?;
//! let handle = queue
//!     .enqueue("message", json!({"room_id": "lobby", "cipher_blob": "..."}))
//!     .await?;
//!
//! for pending in queue.list_unsynced("message").await? {
//!     if let Some(record) = queue.read(&pending).await {
//!         println!("{} queued at {}", record.handle, record.metadata.queued_at);
//!     }
//! }
//! # let _ = handle;
//! # Ok(())
//! # }
//! ```

pub mod durable_queue;
pub mod error;
pub mod record;
pub mod stamp;

pub use durable_queue::DurableQueue;
pub use error::{QueueError, QueueResult};
pub use record::{QueueRecord, RecordHandle, RecordMetadata};
