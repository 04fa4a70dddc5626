// Jobstate Infrastructure - SQLite Adapter
// Implements: KeyValueStore (ordered, namespaced, atomic batches)

mod config;
mod connection;
mod error;
mod kv_store;
mod migration;
mod transaction;

pub use config::{SqliteConfig, ENV_DB_BUSY_TIMEOUT_MS, ENV_DB_MAX_CONNECTIONS, ENV_DB_URL};
pub use connection::{create_pool, create_pool_with};
pub use kv_store::SqliteKvStore;
pub use migration::{current_version, run_migrations, SCHEMA_VERSION};
pub use transaction::SqliteBatchTransaction;

// Note: sqlx::Error conversion is handled by `error::map_sqlx_error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
