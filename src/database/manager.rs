use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Centralized connection pool manager for the application database and the
/// administrative (provisioning) connection.
pub struct DatabaseManager {
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager {
            pools: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Maintenance database used for CREATE DATABASE and catalog listings.
    const ADMIN_DB_NAME: &'static str = "postgres";

    /// Get the application database pool (database named by DATABASE_URL)
    pub async fn main_pool() -> Result<PgPool, DatabaseError> {
        let name = Self::main_db_name()?;
        Self::instance().get_pool(&name).await
    }

    /// Get the administrative pool for provisioning operations
    pub async fn admin_pool() -> Result<PgPool, DatabaseError> {
        Self::instance().get_pool(Self::ADMIN_DB_NAME).await
    }

    /// Get existing pool or create a new one lazily
    async fn get_pool(&self, database_name: &str) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(database_name) {
                return Ok(pool.clone());
            }
        }

        let connection_string = Self::build_connection_string(database_name)?;

        let db_config = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(Duration::from_secs(db_config.connection_timeout))
            .connect(&connection_string)
            .await?;

        {
            let mut pools = self.pools.write().await;
            pools.insert(database_name.to_string(), pool.clone());
        }

        info!("Created database pool for: {}", database_name);
        Ok(pool)
    }

    fn main_db_name() -> Result<String, DatabaseError> {
        let base = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let url = url::Url::parse(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        let name = url.path().trim_start_matches('/');
        if name.is_empty() {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        Ok(name.to_string())
    }

    /// Build a connection string by swapping the database name into DATABASE_URL
    fn build_connection_string(database_name: &str) -> Result<String, DatabaseError> {
        let base = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let mut url = url::Url::parse(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_path(&format!("/{}", database_name));
        Ok(url.into())
    }

    /// Pings the main pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::main_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// List non-template databases visible from the admin connection
    pub async fn list_databases() -> Result<Vec<String>, DatabaseError> {
        let pool = Self::admin_pool().await?;
        let rows = sqlx::query(
            "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname",
        )
        .fetch_all(&pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("datname"))
            .collect())
    }

    /// Provision a new empty database with a validated name
    pub async fn create_database(name: &str) -> Result<(), DatabaseError> {
        if !Self::is_valid_identifier(name) {
            return Err(DatabaseError::InvalidIdentifier(name.to_string()));
        }

        let pool = Self::admin_pool().await?;
        // CREATE DATABASE cannot take bind parameters; the identifier is
        // validated and quoted instead.
        let query = format!("CREATE DATABASE {}", Self::quote_identifier(name));
        sqlx::query(&query).execute(&pool).await?;

        info!("Provisioned database: {}", name);
        Ok(())
    }

    /// Conservative identifier check: lowercase alphanumerics plus underscore,
    /// not leading with a digit, within the Postgres length limit.
    pub fn is_valid_identifier(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 63
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit())
    }

    fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(DatabaseManager::is_valid_identifier("linehaul_ops"));
        assert!(DatabaseManager::is_valid_identifier("audit2"));
        assert!(!DatabaseManager::is_valid_identifier(""));
        assert!(!DatabaseManager::is_valid_identifier("2fast"));
        assert!(!DatabaseManager::is_valid_identifier("drop table"));
        assert!(!DatabaseManager::is_valid_identifier("Linehaul"));
        assert!(!DatabaseManager::is_valid_identifier("a\"; DROP DATABASE x;--"));
    }
}
