use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection pool construction and SQL identifier hygiene
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool against the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let connection_string = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        // Parse up front so a typo is reported as such rather than as a connect failure
        url::Url::parse(connection_string).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(connection_string)
            .await?;

        info!("Created database pool (max_connections={})", config.max_connections);
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Quote SQL identifier to prevent injection
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Validate table names before they are spliced into DDL/DML. Accepts
    /// `[A-Za-z_][A-Za-z0-9_]*` up to 63 bytes (the PostgreSQL identifier limit).
    pub fn is_valid_table_name(name: &str) -> bool {
        let mut chars = name.chars();
        let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        first_ok
            && name.len() <= 63
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn checked_table_name(name: &str) -> Result<String, DatabaseError> {
        if Self::is_valid_table_name(name) {
            Ok(name.to_string())
        } else {
            Err(DatabaseError::InvalidTableName(name.to_string()))
        }
    }
}
