// SQLite Write Batch Transaction

use crate::error::map_sqlx_error;
use jobstate_core::error::Result;
use jobstate_core::port::{BatchOp, Namespace};
use sqlx::{Sqlite, SqlitePool, Transaction as SqlxTransaction};

pub(crate) const UPSERT_SQL: &str = r#"
    INSERT INTO kv_entries (namespace, key, value) VALUES (?, ?, ?)
    ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value
"#;

pub(crate) const DELETE_SQL: &str = "DELETE FROM kv_entries WHERE namespace = ? AND key = ?";

/// One `WriteBatch` applied inside one SQLite transaction
///
/// Dropping without `commit` rolls every applied op back.
pub struct SqliteBatchTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    applied: usize,
}

impl SqliteBatchTransaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let tx = pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Self { tx, applied: 0 })
    }

    pub async fn apply(&mut self, op: &BatchOp) -> Result<()> {
        match op {
            BatchOp::Put { ns, key, value } => self.put(*ns, key, value).await?,
            BatchOp::Delete { ns, key } => self.delete(*ns, key).await?,
        }
        self.applied += 1;
        Ok(())
    }

    async fn put(&mut self, ns: Namespace, key: &[u8], value: &[u8]) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(ns.id())
            .bind(key)
            .bind(value)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&mut self, ns: Namespace, key: &[u8]) -> Result<()> {
        sqlx::query(DELETE_SQL)
            .bind(ns.id())
            .bind(key)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Commit the transaction, returning how many ops it carried
    pub async fn commit(self) -> Result<usize> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(self.applied)
    }

    /// Rollback the transaction
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
