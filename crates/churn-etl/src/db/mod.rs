//! Connection pool lifecycle and datastore errors

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Embedded schema could not be applied
    #[error("Database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check DB_* / DATABASE_URL settings.")]
    Config(String),

    /// Write refused by the store (constraint violation or injected fault)
    #[error("{0}")]
    Rejected(String),
}

impl DbError {
    /// Create a rejection error with resource context
    pub fn rejected(resource_type: &str, identifier: &str, reason: &str) -> Self {
        Self::Rejected(format!("{} '{}' rejected: {}", resource_type, identifier, reason))
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Open the connection pool; fails fast when the datastore is unreachable
pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    if config.max_connections == 0 {
        return Err(DbError::config("max_connections must be greater than 0"));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.connection_url())
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        target = %config.redacted_url(),
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

/// Apply the embedded staging/reporting/audit schema
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("Database schema is up to date");
    Ok(())
}
