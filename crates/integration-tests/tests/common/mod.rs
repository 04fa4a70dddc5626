//! Shared setup for the SQLite-backed store tests

#![allow(dead_code)]

use jobstate_core::domain::{JobPayload, JobRecord, JobType};
use jobstate_core::port::JsonRecordCodec;
use jobstate_core::{JobStateStore, ScanControl};
use jobstate_infra_sqlite::{create_pool, run_migrations, SqliteKvStore};
use std::sync::Arc;

/// Install a test subscriber once; RUST_LOG controls verbosity
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Store over a fresh database at `database_url`
pub async fn open_store(database_url: &str) -> (Arc<SqliteKvStore>, JobStateStore) {
    init_tracing();
    let pool = create_pool(database_url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let kv = Arc::new(SqliteKvStore::new(pool));
    let store = JobStateStore::new(kv.clone(), Arc::new(JsonRecordCodec));
    (kv, store)
}

pub async fn memory_store() -> (Arc<SqliteKvStore>, JobStateStore) {
    open_store("sqlite::memory:").await
}

/// Unique on-disk database path for one test
pub fn temp_db_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("jobstate_{}_{}.db", name, std::process::id()))
}

pub fn remove_db(path: &std::path::Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

pub fn job(job_type: &str, deadline: i64, retries: i32) -> JobRecord {
    let mut record = JobRecord::new(
        JobType::new(job_type),
        retries,
        JobPayload::new(serde_json::json!({"source": "integration"})),
    );
    record.deadline = deadline;
    record
}

pub async fn activatable(store: &JobStateStore, job_type: &str) -> Vec<u64> {
    let mut seen = Vec::new();
    store
        .for_each_activatable_job(&JobType::new(job_type), |key, _| {
            seen.push(key);
            ScanControl::Continue
        })
        .await
        .unwrap();
    seen
}

pub async fn timed_out(store: &JobStateStore, upper_bound: i64) -> Vec<u64> {
    let mut seen = Vec::new();
    store
        .for_each_timed_out_job(upper_bound, |key, _| {
            seen.push(key);
            ScanControl::Continue
        })
        .await
        .unwrap();
    seen
}

pub async fn assert_consistent(store: &JobStateStore) {
    let report = store.verify_consistency().await.unwrap();
    assert!(
        report.is_consistent(),
        "invariants broken: {:?}",
        report.violations
    );
}
