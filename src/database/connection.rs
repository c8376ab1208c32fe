use crate::config::DatabaseConfig;
use crate::constants::defaults;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Row};

/// Single-use connections to the primary store.
///
/// The outbox never holds a pool: every probe, repair and helper opens its own
/// connection and closes it before returning.
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    config: DatabaseConfig,
}

impl DatabaseConnection {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Options targeting the configured platform database
    pub fn connect_options(&self) -> PgConnectOptions {
        self.base_options().database(&self.config.database)
    }

    /// Options targeting the maintenance database, used to create the platform database
    pub fn maintenance_options(&self) -> PgConnectOptions {
        self.base_options().database(defaults::MAINTENANCE_DATABASE)
    }

    fn base_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.username)
            .password(&self.config.password)
            .application_name("sentinel-outbox")
    }

    pub async fn connect(&self) -> Result<PgConnection, sqlx::Error> {
        self.connect_options().connect().await
    }

    /// Minimal round trip against the platform database
    pub async fn health_check(&self) -> Result<bool, sqlx::Error> {
        let mut conn = self.connect().await?;
        let row = sqlx::query("SELECT 1 AS health").fetch_one(&mut conn).await;
        // Close even when the query failed; the query error wins.
        let closed = conn.close().await;
        let health: i32 = row?.try_get("health")?;
        closed?;
        Ok(health == 1)
    }

    /// Create the platform database when it does not exist.
    ///
    /// Returns `true` when the database was created, `false` when it was already
    /// present.
    pub async fn ensure_database_exists(&self) -> Result<bool, sqlx::Error> {
        let mut conn = self.maintenance_options().connect().await?;
        let result = Self::create_if_missing(&mut conn, &self.config.database).await;
        let closed = conn.close().await;
        let created = result?;
        closed?;
        Ok(created)
    }

    async fn create_if_missing(conn: &mut PgConnection, name: &str) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(name)
                .fetch_one(&mut *conn)
                .await?;
        if exists {
            return Ok(false);
        }

        // Identifiers cannot be bound; the name is validated to [A-Za-z0-9_] at config load.
        let statement = format!("CREATE DATABASE \"{}\"", name.replace('"', "\"\""));
        sqlx::query(&statement).execute(&mut *conn).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_target_configured_database() {
        let conn = DatabaseConnection::new(DatabaseConfig::default());
        assert_eq!(conn.connect_options().get_database(), Some("sentinel"));
        assert_eq!(conn.maintenance_options().get_database(), Some("postgres"));
        assert_eq!(conn.connect_options().get_port(), 5432);
    }
}
