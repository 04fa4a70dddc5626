// SQLite Connection Pool Setup

use crate::config::SqliteConfig;
use crate::error::map_sqlx_error;
use jobstate_core::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Create SQLite connection pool with default settings for `database_url`
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    create_pool_with(&SqliteConfig::new(database_url)).await
}

/// Create SQLite connection pool with WAL mode and optimizations
pub async fn create_pool_with(config: &SqliteConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(map_sqlx_error)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.busy_timeout)
        .create_if_missing(true);

    // An in-memory database lives exactly as long as its one connection
    let pool_options = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    debug!(
        database_url = %config.database_url,
        in_memory = config.is_in_memory(),
        "SQLite pool created"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_pool_shares_one_database() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE probe (id INTEGER)")
            .execute(&pool)
            .await
            .unwrap();

        // A second query must see the table created by the first
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM probe")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
