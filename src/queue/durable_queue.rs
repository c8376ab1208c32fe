//! # Durable Queue
//!
//! File-backed write-ahead log for writes the primary store could not take.
//!
//! One JSON file per record under `<root>/queue`. Every mutation writes a
//! uniquely named temporary file in the same directory and flushes it. New
//! records are then hard-linked into place, which fails instead of replacing
//! a file another writer already published under the same name. Updates are
//! renamed over the target, so a reader sees either the old record or the new
//! one, never a torn write. No other locking is used.

use super::error::{QueueError, QueueResult};
use super::record::{QueueRecord, RecordHandle, RecordMetadata};
use super::stamp::{epoch_seconds, record_file_name, TimestampStamper};
use crate::clock::{Clock, SystemClock};
use crate::constants::{is_valid_record_type, layout};
use crate::logging::log_queue_operation;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Upper bound on name re-stamps when another process holds the chosen name
const MAX_NAME_ATTEMPTS: usize = 256;

#[derive(Debug)]
pub struct DurableQueue {
    root_dir: PathBuf,
    queue_dir: PathBuf,
    clock: Arc<dyn Clock>,
    stamper: TimestampStamper,
}

impl DurableQueue {
    /// Open (creating if needed) the queue under `root_dir` using the system clock
    pub async fn open(root_dir: impl Into<PathBuf>) -> QueueResult<Self> {
        Self::open_with_clock(root_dir, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        root_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> QueueResult<Self> {
        let root_dir = root_dir.into();
        let queue_dir = root_dir.join(layout::QUEUE_DIR);

        tokio::fs::create_dir_all(&queue_dir)
            .await
            .map_err(|source| QueueError::Storage {
                path: queue_dir.clone(),
                source,
            })?;
        Self::deny_access(&root_dir).await?;

        debug!(queue_dir = %queue_dir.display(), "📂 Durable queue opened");

        Ok(Self {
            root_dir,
            queue_dir,
            stamper: TimestampStamper::new(clock.clone()),
            clock,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    /// Persist a write for later replay.
    ///
    /// Returns only after the record is durably in place. Any I/O failure is
    /// returned to the caller, which owns escalation.
    pub async fn enqueue(&self, record_type: &str, payload: Value) -> QueueResult<RecordHandle> {
        Self::validate_record_type(record_type)?;
        let payload = match payload {
            Value::Object(map) => map,
            other => {
                return Err(QueueError::InvalidPayload {
                    record_type: record_type.to_string(),
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                })
            }
        };
        if payload.contains_key(layout::METADATA_KEY) {
            return Err(QueueError::InvalidPayload {
                record_type: record_type.to_string(),
                reason: format!("'{}' is a reserved key", layout::METADATA_KEY),
            });
        }

        for _ in 0..MAX_NAME_ATTEMPTS {
            let stamp = self.stamper.next();
            let handle = RecordHandle::new(record_file_name(record_type, &stamp))?;
            let record = QueueRecord {
                payload: payload.clone(),
                metadata: RecordMetadata {
                    record_type: record_type.to_string(),
                    queued_at: stamp.format(layout::DISPLAY_TIME_FORMAT).to_string(),
                    queued_timestamp: epoch_seconds(&stamp),
                    synced: false,
                    synced_at: None,
                    filepath: self.path_for(&handle).display().to_string(),
                },
                handle,
            };

            if self.publish_new(&record).await? {
                log_queue_operation("enqueue", record_type, Some(record.handle.as_str()), "queued", None);
                return Ok(record.handle);
            }
            debug!(handle = %record.handle, "Queue file name taken, re-stamping");
        }

        Err(QueueError::Write {
            handle: format!("{record_type}_*"),
            source: std::io::Error::new(
                ErrorKind::AlreadyExists,
                "could not find a free queue file name",
            ),
        })
    }

    /// Unsynced records of `record_type`, oldest first.
    ///
    /// Unparseable files are logged and skipped. Ordering uses the
    /// high-resolution `queued_timestamp`, falling back to the file name.
    pub async fn list_unsynced(&self, record_type: &str) -> QueueResult<Vec<RecordHandle>> {
        Self::validate_record_type(record_type)?;
        let prefix = format!("{record_type}_");
        let suffix = format!(".{}", layout::RECORD_EXTENSION);

        let scan_error = |source| QueueError::Scan {
            path: self.queue_dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.queue_dir)
            .await
            .map_err(scan_error)?;

        let mut pending: Vec<(f64, RecordHandle)> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(&prefix) || !name.ends_with(&suffix) {
                continue;
            }
            let Ok(handle) = RecordHandle::new(name) else {
                continue;
            };

            match self.load(&handle).await {
                Ok(Some(record)) => {
                    // `message_x_*` files also match the `message_` prefix.
                    if record.metadata.record_type != record_type || record.metadata.synced {
                        continue;
                    }
                    pending.push((record.metadata.queued_timestamp, handle));
                }
                // Removed between scan and read.
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        record_type = %record_type,
                        handle = %handle,
                        error = %err,
                        "⚠️ Skipping unreadable queue record"
                    );
                }
            }
        }

        pending.sort_by(|(a_ts, a), (b_ts, b)| a_ts.total_cmp(b_ts).then_with(|| a.cmp(b)));
        Ok(pending.into_iter().map(|(_, handle)| handle).collect())
    }

    /// Full record, or `None` when missing or unparseable
    pub async fn read(&self, handle: &RecordHandle) -> Option<QueueRecord> {
        match self.load(handle).await {
            Ok(record) => {
                if record.is_none() {
                    debug!(handle = %handle, "Queue record not found");
                }
                record
            }
            Err(err) => {
                warn!(handle = %handle, error = %err, "⚠️ Unreadable queue record");
                None
            }
        }
    }

    /// Flag a record as replayed into the primary store.
    ///
    /// `Ok(true)` when the record is (now or already) synced, `Ok(false)` when
    /// it is missing or unparseable. Only metadata changes; the payload is
    /// written back as read.
    pub async fn mark_synced(&self, handle: &RecordHandle) -> QueueResult<bool> {
        let mut record = match self.load(handle).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(handle = %handle, "⚠️ Cannot mark missing queue record as synced");
                return Ok(false);
            }
            Err(err) => {
                warn!(handle = %handle, error = %err, "⚠️ Cannot mark unreadable queue record as synced");
                return Ok(false);
            }
        };

        if record.metadata.synced {
            debug!(handle = %handle, "Queue record already synced");
            return Ok(true);
        }

        record.metadata.synced = true;
        record.metadata.synced_at = Some(
            self.clock
                .now()
                .format(layout::DISPLAY_TIME_FORMAT)
                .to_string(),
        );
        self.write_atomically(&record).await?;

        log_queue_operation(
            "mark_synced",
            record.record_type(),
            Some(handle.as_str()),
            "synced",
            None,
        );
        Ok(true)
    }

    /// Remove a record file; an already-absent record counts as success
    pub async fn delete(&self, handle: &RecordHandle) -> QueueResult<()> {
        match tokio::fs::remove_file(self.path_for(handle)).await {
            Ok(()) => {
                debug!(handle = %handle, "🗑️ Queue record deleted");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(QueueError::Delete {
                handle: handle.to_string(),
                source,
            }),
        }
    }

    pub async fn unsynced_count(&self, record_type: &str) -> QueueResult<usize> {
        Ok(self.list_unsynced(record_type).await?.len())
    }

    fn path_for(&self, handle: &RecordHandle) -> PathBuf {
        self.queue_dir.join(handle.as_str())
    }

    fn validate_record_type(record_type: &str) -> QueueResult<()> {
        if is_valid_record_type(record_type) {
            Ok(())
        } else {
            Err(QueueError::InvalidRecordType(record_type.to_string()))
        }
    }

    async fn load(&self, handle: &RecordHandle) -> QueueResult<Option<QueueRecord>> {
        let bytes = match tokio::fs::read(self.path_for(handle)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(QueueError::Read {
                    handle: handle.to_string(),
                    source,
                })
            }
        };
        QueueRecord::from_bytes(handle.clone(), &bytes).map(Some)
    }

    /// Write-to-temp, fsync, rename over the target.
    async fn write_atomically(&self, record: &QueueRecord) -> QueueResult<()> {
        let temp = self.write_temp(record).await?;
        if let Err(source) = tokio::fs::rename(&temp, self.path_for(&record.handle)).await {
            Self::discard_temp(&temp).await;
            return Err(QueueError::Write {
                handle: record.handle.to_string(),
                source,
            });
        }

        self.sync_queue_dir().await;
        Ok(())
    }

    /// Write-to-temp, fsync, then link into place without replacing anything.
    ///
    /// `Ok(false)` when the target name already exists; the existing file is
    /// left untouched.
    async fn publish_new(&self, record: &QueueRecord) -> QueueResult<bool> {
        let temp = self.write_temp(record).await?;
        let linked = tokio::fs::hard_link(&temp, self.path_for(&record.handle)).await;
        Self::discard_temp(&temp).await;

        match linked {
            Ok(()) => {
                self.sync_queue_dir().await;
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(source) => Err(QueueError::Write {
                handle: record.handle.to_string(),
                source,
            }),
        }
    }

    /// Uniquely named, fully flushed copy of `record` beside its target
    async fn write_temp(&self, record: &QueueRecord) -> QueueResult<PathBuf> {
        let bytes = record.to_bytes()?;
        let temp = self.queue_dir.join(format!(
            ".{}.{}.{}",
            record.handle,
            Uuid::new_v4().simple(),
            layout::TEMP_EXTENSION
        ));

        let written = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await
        }
        .await;

        match written {
            Ok(()) => Ok(temp),
            Err(source) => {
                Self::discard_temp(&temp).await;
                Err(QueueError::Write {
                    handle: record.handle.to_string(),
                    source,
                })
            }
        }
    }

    async fn discard_temp(temp: &Path) {
        if let Err(err) = tokio::fs::remove_file(temp).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(temp = %temp.display(), error = %err, "Failed to remove temp queue file");
            }
        }
    }

    /// Persist the rename itself. Best effort; not all platforms allow it.
    async fn sync_queue_dir(&self) {
        #[cfg(unix)]
        {
            let synced = async { tokio::fs::File::open(&self.queue_dir).await?.sync_all().await };
            if let Err(err) = synced.await {
                debug!(error = %err, "Queue directory fsync skipped");
            }
        }
    }

    /// Keep queued payloads out of reach of any web server rooted above us.
    async fn deny_access(root_dir: &Path) -> QueueResult<()> {
        let storage_error = |source| QueueError::Storage {
            path: root_dir.to_path_buf(),
            source,
        };

        let marker = root_dir.join(layout::ACCESS_DENY_FILE);
        if !tokio::fs::try_exists(&marker).await.map_err(storage_error)? {
            tokio::fs::write(&marker, layout::ACCESS_DENY_CONTENTS)
                .await
                .map_err(storage_error)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(err) =
                tokio::fs::set_permissions(root_dir, std::fs::Permissions::from_mode(0o700)).await
            {
                warn!(
                    root = %root_dir.display(),
                    error = %err,
                    "⚠️ Could not restrict storage root permissions"
                );
            }
        }

        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
