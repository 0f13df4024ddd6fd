use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;

use crate::config::LedgerConfig;
use crate::storage::schema;

/// DbConnection owns the SQLite pool every repository works through
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if needed) the database at `url` and bring its schema
    /// up to date
    pub async fn new(url: &str, max_connections: u32, default_monthly_fee: i64) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!(url, "Creating database");
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;

        schema::initialize(&pool, default_monthly_fee).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Open the database described by the configuration
    pub async fn init(config: &LedgerConfig) -> Result<Self> {
        Self::new(
            &config.database_url,
            config.max_connections,
            config.default_monthly_fee,
        )
        .await
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name for tests
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url, 1, crate::config::DEFAULT_MONTHLY_FEE).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
