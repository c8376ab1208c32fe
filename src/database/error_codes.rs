//! PostgreSQL Error Codes
//!
//! SQLSTATE codes the outbox branches on when classifying probe and replay
//! failures.
//!
//! ## SQLSTATE Format
//!
//! - 5-character codes representing error classes and conditions
//! - First 2 characters: error class
//! - Last 3 characters: specific condition
//!
//! ## Reference
//!
//! Full list: <https://www.postgresql.org/docs/current/errcodes-appendix.html>

/// PostgreSQL SQLSTATE error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PgErrorCode;

impl PgErrorCode {
    // =========================================================================
    // Class 08 - Connection Exception
    // =========================================================================

    /// Prefix shared by every connection exception
    pub const CONNECTION_EXCEPTION_CLASS: &'static str = "08";

    // =========================================================================
    // Class 23 - Integrity Constraint Violation
    // =========================================================================

    /// Unique violation (duplicate key) - Code 23505
    ///
    /// During replay this means the record's natural key is already present in
    /// the primary store, i.e. an earlier pass (or another process) inserted it.
    pub const UNIQUE_VIOLATION: &'static str = "23505";

    // =========================================================================
    // Class 3D - Invalid Catalog Name
    // =========================================================================

    /// Invalid catalog name - Code 3D000
    ///
    /// Raised on connect when the target database does not exist. This is the
    /// structural failure self-repair addresses.
    pub const INVALID_CATALOG_NAME: &'static str = "3D000";

    /// Duplicate database - Code 42P04
    pub const DUPLICATE_DATABASE: &'static str = "42P04";

    // =========================================================================
    // Class 40 - Transaction Rollback
    // =========================================================================

    /// Serialization failure - Code 40001
    pub const SERIALIZATION_FAILURE: &'static str = "40001";

    /// Deadlock detected - Code 40P01
    pub const DEADLOCK_DETECTED: &'static str = "40P01";

    // =========================================================================
    // Class 53 / 57 - Resources and Operator Intervention
    // =========================================================================

    /// Too many connections - Code 53300
    pub const TOO_MANY_CONNECTIONS: &'static str = "53300";

    /// Query canceled - Code 57014
    pub const QUERY_CANCELED: &'static str = "57014";

    /// Admin shutdown - Code 57P01
    pub const ADMIN_SHUTDOWN: &'static str = "57P01";

    /// Cannot connect now (server starting up) - Code 57P03
    pub const CANNOT_CONNECT_NOW: &'static str = "57P03";

    // =========================================================================
    // Helper Methods
    // =========================================================================

    #[inline]
    pub fn is_unique_violation(code: &str) -> bool {
        code == Self::UNIQUE_VIOLATION
    }

    #[inline]
    pub fn is_missing_database(code: &str) -> bool {
        code == Self::INVALID_CATALOG_NAME
    }

    #[inline]
    pub fn is_duplicate_database(code: &str) -> bool {
        code == Self::DUPLICATE_DATABASE
    }

    /// Errors that are expected to clear up on their own
    #[inline]
    pub fn is_transient(code: &str) -> bool {
        code.starts_with(Self::CONNECTION_EXCEPTION_CLASS)
            || matches!(
                code,
                Self::SERIALIZATION_FAILURE
                    | Self::DEADLOCK_DETECTED
                    | Self::TOO_MANY_CONNECTIONS
                    | Self::QUERY_CANCELED
                    | Self::ADMIN_SHUTDOWN
                    | Self::CANNOT_CONNECT_NOW
            )
    }
}
