//! Database connection management

use cloudenv_config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection as SeaConnection};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::migrations::Migrator;

/// Database connection wrapper with configuration
#[derive(Clone)]
pub struct DatabaseConnection {
    connection: SeaConnection,
    config: DatabaseConfig,
}

impl DatabaseConnection {
    /// Create a new database connection with configuration
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        info!("Connecting to state store: {}", config.url);

        Self::ensure_sqlite_parent_exists(&config.url)?;

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(config.connection_timeout)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);

        let connection = Database::connect(opts).await?;

        debug!(
            "State store connection established with {} max connections",
            config.max_connections
        );

        Ok(Self { connection, config })
    }

    /// Create the parent directory of a file-backed SQLite database
    fn ensure_sqlite_parent_exists(database_url: &str) -> StorageResult<()> {
        if database_url.contains(":memory:") {
            debug!("Using in-memory SQLite database");
            return Ok(());
        }

        let without_scheme = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .ok_or_else(|| {
                StorageError::ConfigError(format!("Invalid SQLite URL format: {}", database_url))
            })?;
        let file_path = without_scheme.split('?').next().unwrap_or(without_scheme);
        if file_path.is_empty() {
            return Err(StorageError::ConfigError(format!(
                "SQLite URL has no file path: {}",
                database_url
            )));
        }

        if let Some(parent_dir) = Path::new(file_path).parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                info!("Creating database directory: {:?}", parent_dir);
                std::fs::create_dir_all(parent_dir)?;
            }
        }
        Ok(())
    }

    /// Apply all pending migrations
    pub async fn migrate(&self) -> StorageResult<()> {
        info!("Running state store migrations");
        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        info!("State store migrations completed");
        Ok(())
    }

    /// Get the underlying SeaORM connection
    pub fn get_connection(&self) -> &SeaConnection {
        &self.connection
    }

    /// Get the database configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Check that the database answers
    pub async fn ping(&self) -> StorageResult<()> {
        self.connection.ping().await?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(self) -> StorageResult<()> {
        info!("Closing state store connection");
        self.connection.close().await?;
        Ok(())
    }
}
