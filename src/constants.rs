//! # Outbox Constants
//!
//! Well-known record type tags, file layout names and default tuning values
//! shared by the queue, the health monitor and the reconciler.

/// Record type tags produced by the platform's write paths.
///
/// Tags are embedded in queue file names, so they are restricted to ASCII
/// alphanumerics and `_`.
pub mod record_types {
    pub const MESSAGE: &str = "message";
    pub const DIRECT_MESSAGE: &str = "direct_message";
    pub const ESCROW_REQUEST: &str = "escrow_request";
    pub const MIGRATION: &str = "migration";

    /// All well-known tags in their canonical drain order.
    pub const ALL: [&str; 4] = [MESSAGE, DIRECT_MESSAGE, ESCROW_REQUEST, MIGRATION];
}

/// On-disk layout of the storage root.
pub mod layout {
    /// Subdirectory of the storage root holding queue records.
    pub const QUEUE_DIR: &str = "queue";
    /// Reserved payload key carrying record metadata.
    pub const METADATA_KEY: &str = "_metadata";
    /// Extension of committed queue records.
    pub const RECORD_EXTENSION: &str = "json";
    /// Extension of in-flight temporary files.
    pub const TEMP_EXTENSION: &str = "tmp";
    /// Web-server deny marker written into the storage root.
    pub const ACCESS_DENY_FILE: &str = ".htaccess";
    pub const ACCESS_DENY_CONTENTS: &str = "Require all denied\nDeny from all\n";
    /// `chrono` format of the whole-second component of file names.
    pub const FILENAME_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
    /// `chrono` format of `queued_at` / `synced_at`.
    pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}

/// Default tuning values.
pub mod defaults {
    pub const FRESHNESS_WINDOW_MS: u64 = 5_000;
    pub const PROBE_TIMEOUT_MS: u64 = 2_000;
    pub const REPAIR_INTERVAL_MS: u64 = 60_000;
    pub const DRAIN_BATCH_SIZE: usize = 100;
    pub const DRAIN_INTERVAL_SECONDS: u64 = 5;
    pub const STORAGE_ROOT: &str = "storage";
    pub const MAINTENANCE_DATABASE: &str = "postgres";
}

/// Returns true when `tag` can be used as a record type.
pub fn is_valid_record_type(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
