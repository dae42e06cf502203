//! Database layer for agora.
//!
//! Entities and migrations for users, posts, comments and the vote ledger,
//! plus the repositories the core services are built on.

pub mod entities;
pub mod migrations;
pub mod repositories;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use agora_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::log::LevelFilter;

fn connect_options(config: &Config) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    opt
}

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::StorageUnavailable(e.to_string()))
}

/// Initialize the database connection, retrying while the server is not ready.
///
/// Gives up after `database.connect_retries` failed attempts and returns the
/// last error.
pub async fn init_with_retry(config: &Config) -> Result<DatabaseConnection, AppError> {
    let delay = Duration::from_secs(config.database.retry_delay_secs);
    let mut attempt = 0;

    loop {
        match init(config).await {
            Ok(db) => return Ok(db),
            Err(e) if attempt < config.database.connect_retries => {
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = config.database.connect_retries,
                    "Database not ready, retrying in {}s",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.to_string()))
}
