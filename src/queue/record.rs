//! # Queue Records
//!
//! On-disk shape of a queued write: the domain payload fields at the top level
//! of a JSON object, plus a reserved `_metadata` block owned by the queue.
//!
//! ```text
//! { ...domain fields..., "_metadata": {
//!     "type": "message", "queued_at": "2024-03-01 12:00:00",
//!     "queued_timestamp": 1709294400.000123,
//!     "synced": false, "synced_at": null, "filepath": "/srv/storage/queue/..." } }
//! ```

use super::error::{QueueError, QueueResult};
use crate::constants::layout;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Storage identifier of a queue record: its file name inside the queue directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordHandle(String);

impl RecordHandle {
    /// Accepts bare record file names only (no directories, no temp files).
    pub fn new(name: impl Into<String>) -> QueueResult<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && name.ends_with(&format!(".{}", layout::RECORD_EXTENSION));
        if valid {
            Ok(Self(name))
        } else {
            Err(QueueError::InvalidHandle(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordHandle {
    type Error = QueueError;

    fn try_from(name: String) -> QueueResult<Self> {
        Self::new(name)
    }
}

impl From<RecordHandle> for String {
    fn from(handle: RecordHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Queue-owned bookkeeping stored under `_metadata`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(rename = "type")]
    pub record_type: String,
    /// Wall-clock enqueue time, `YYYY-MM-DD HH:MM:SS`
    pub queued_at: String,
    /// Enqueue time as epoch seconds with microsecond precision
    pub queued_timestamp: f64,
    pub synced: bool,
    #[serde(default)]
    pub synced_at: Option<String>,
    pub filepath: String,
}

/// A queued write as read back from disk
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRecord {
    pub handle: RecordHandle,
    pub payload: Map<String, Value>,
    pub metadata: RecordMetadata,
}

impl QueueRecord {
    pub fn record_type(&self) -> &str {
        &self.metadata.record_type
    }

    pub fn is_synced(&self) -> bool {
        self.metadata.synced
    }

    pub(crate) fn to_bytes(&self) -> QueueResult<Vec<u8>> {
        let encode = |source| QueueError::Encode {
            handle: self.handle.to_string(),
            source,
        };
        let mut document = self.payload.clone();
        document.insert(
            layout::METADATA_KEY.to_string(),
            serde_json::to_value(&self.metadata).map_err(encode)?,
        );
        serde_json::to_vec_pretty(&Value::Object(document)).map_err(encode)
    }

    pub(crate) fn from_bytes(handle: RecordHandle, bytes: &[u8]) -> QueueResult<Self> {
        let corrupt = |reason: String| QueueError::Corrupt {
            handle: handle.to_string(),
            reason,
        };

        let mut payload: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        let metadata = payload
            .remove(layout::METADATA_KEY)
            .ok_or_else(|| corrupt(format!("missing {} block", layout::METADATA_KEY)))?;
        let metadata: RecordMetadata =
            serde_json::from_value(metadata).map_err(|e| corrupt(e.to_string()))?;

        Ok(Self {
            handle,
            payload,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> QueueRecord {
        let payload = json!({"room_id": "lobby", "sender_handle": "ana", "cipher_blob": "AAEC"});
        QueueRecord {
            handle: RecordHandle::new("message_20240301120000_000123.json").unwrap(),
            payload: payload.as_object().cloned().unwrap(),
            metadata: RecordMetadata {
                record_type: "message".to_string(),
                queued_at: "2024-03-01 12:00:00".to_string(),
                queued_timestamp: 1_709_294_400.000_123,
                synced: false,
                synced_at: None,
                filepath: "/tmp/queue/message_20240301120000_000123.json".to_string(),
            },
        }
    }

    #[test]
    fn test_metadata_sits_beside_domain_fields() {
        let bytes = sample().to_bytes().unwrap();
        let document: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(document["room_id"], "lobby");
        assert_eq!(document["_metadata"]["type"], "message");
        assert_eq!(document["_metadata"]["synced"], false);
        assert!(document["_metadata"]["synced_at"].is_null());
    }

    #[test]
    fn test_missing_metadata_is_corrupt() {
        let handle = RecordHandle::new("message_20240301120000_000001.json").unwrap();
        let err = QueueRecord::from_bytes(handle, br#"{"room_id": "lobby"}"#).unwrap_err();
        assert!(matches!(err, QueueError::Corrupt { .. }));
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let handle = RecordHandle::new("message_20240301120000_000001.json").unwrap();
        let err = QueueRecord::from_bytes(handle, br#"{"room_id": "lob"#).unwrap_err();
        assert!(matches!(err, QueueError::Corrupt { .. }));
    }

    #[test]
    fn test_handle_rejects_paths_and_temp_files() {
        assert!(RecordHandle::new("../secrets.json").is_err());
        assert!(RecordHandle::new(".message_1.json.abc.tmp").is_err());
        assert!(RecordHandle::new("message_20240301120000_000001").is_err());
        assert!(RecordHandle::new("message_20240301120000_000001.json").is_ok());
    }

    #[test]
    fn test_deserialized_handles_are_validated() {
        let handle: RecordHandle =
            serde_json::from_value(json!("message_20240301120000_000001.json")).unwrap();
        assert_eq!(serde_json::to_value(&handle).unwrap(), json!(handle.as_str()));

        assert!(serde_json::from_value::<RecordHandle>(json!("../x.json")).is_err());
        assert!(serde_json::from_value::<RecordHandle>(json!(".hidden.json")).is_err());
    }
}
