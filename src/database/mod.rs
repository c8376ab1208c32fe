//! # Database Operations
//!
//! Primary-store plumbing shared by the health probe and by collaborator
//! replay functions:
//!
//! - [`connection`] - per-call connections, `SELECT 1` health check and
//!   database self-repair
//! - [`error_codes`] - SQLSTATE constants used to classify failures

pub mod connection;
pub mod error_codes;

pub use connection::DatabaseConnection;
pub use error_codes::PgErrorCode;
