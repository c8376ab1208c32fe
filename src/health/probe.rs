//! # Datastore Probes
//!
//! The seam between [`HealthMonitor`](super::HealthMonitor) and the primary
//! store. A probe answers two questions: can the store be reached right now,
//! and can missing top-level schema objects be recreated.

use crate::database::{DatabaseConnection, PgErrorCode};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Why a probe or repair attempt failed
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The store did not answer at all (network, refused, shut down)
    #[error("datastore unreachable: {0}")]
    Unreachable(String),

    /// The store answered but a top-level schema object is missing
    #[error("datastore schema object missing: {0}")]
    MissingSchema(String),

    /// The round trip exceeded the probe timeout
    #[error("datastore probe timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered with something other than the expected result
    #[error("unexpected datastore response: {0}")]
    UnexpectedResponse(String),
}

impl From<sqlx::Error> for ProbeError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err
                .code()
                .is_some_and(|code| PgErrorCode::is_missing_database(&code))
            {
                return ProbeError::MissingSchema(db_err.message().to_string());
            }
        }
        ProbeError::Unreachable(err.to_string())
    }
}

#[async_trait]
pub trait DatastoreProbe: Send + Sync {
    /// Minimal round trip against the primary store
    async fn ping(&self) -> Result<(), ProbeError>;

    /// Best-effort creation of missing top-level schema objects
    async fn repair(&self) -> Result<(), ProbeError>;

    /// Name used in log lines
    fn name(&self) -> &str {
        "datastore"
    }
}

/// Probe against the configured PostgreSQL database
#[derive(Debug, Clone)]
pub struct PostgresProbe {
    connection: DatabaseConnection,
}

impl PostgresProbe {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl DatastoreProbe for PostgresProbe {
    async fn ping(&self) -> Result<(), ProbeError> {
        match self.connection.health_check().await? {
            true => Ok(()),
            false => Err(ProbeError::UnexpectedResponse(
                "SELECT 1 did not return 1".to_string(),
            )),
        }
    }

    async fn repair(&self) -> Result<(), ProbeError> {
        let timeout = self.connection.config().connect_timeout();
        let created = tokio::time::timeout(timeout, self.connection.ensure_database_exists())
            .await
            .map_err(|_| ProbeError::Timeout(timeout))?
            .or_else(|err| {
                let lost_race = err
                    .as_database_error()
                    .and_then(|e| e.code())
                    .is_some_and(|code| PgErrorCode::is_duplicate_database(&code));
                // Another process created it between our check and CREATE DATABASE.
                if lost_race {
                    Ok(false)
                } else {
                    Err(ProbeError::from(err))
                }
            })?;

        if created {
            tracing::warn!(
                database = %self.connection.config().database,
                "🛠️ Recreated missing primary database"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
