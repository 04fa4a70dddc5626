// SQLite KeyValueStore Implementation

use crate::error::map_sqlx_error;
use crate::transaction::{SqliteBatchTransaction, DELETE_SQL, UPSERT_SQL};
use async_trait::async_trait;
use jobstate_core::error::Result;
use jobstate_core::port::{KeyValueStore, KvEntry, Namespace, WriteBatch};
use sqlx::SqlitePool;
use tracing::debug;

/// Ordered key-value substrate on a single `kv_entries` table
///
/// BLOB keys compare with memcmp, so `ORDER BY key` is unsigned
/// lexicographic order.
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, ns: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM kv_entries WHERE namespace = ? AND key = ?")
            .bind(ns.id())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn exists(&self, ns: Namespace, key: &[u8]) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM kv_entries WHERE namespace = ? AND key = ?")
                .bind(ns.id())
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(found.is_some())
    }

    async fn put(&self, ns: Namespace, key: &[u8], value: &[u8]) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(ns.id())
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, ns: Namespace, key: &[u8]) -> Result<()> {
        sqlx::query(DELETE_SQL)
            .bind(ns.id())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut tx = SqliteBatchTransaction::begin(&self.pool).await?;
        for op in batch.ops() {
            // Early return drops `tx`, which rolls back
            tx.apply(op).await?;
        }
        let applied = tx.commit().await?;

        debug!(ops = applied, "Write batch committed");
        Ok(())
    }

    async fn scan(&self, ns: Namespace, from: &[u8], limit: usize) -> Result<Vec<KvEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(Vec<u8>, Vec<u8>)> = sqlx::query_as(
            r#"
            SELECT key, value FROM kv_entries
            WHERE namespace = ? AND key >= ?
            ORDER BY key ASC
            LIMIT ?
            "#,
        )
        .bind(ns.id())
        .bind(from)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(key, value)| KvEntry { key, value })
            .collect())
    }
}
