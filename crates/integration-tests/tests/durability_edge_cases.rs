//! Durability and Edge Case Tests
//!
//! Restart persistence, index corruption, precondition failures,
//! concurrent readers and scans, and configuration against the SQLite substrate.

mod common;

use common::{
    activatable, assert_consistent, job, memory_store, open_store, remove_db, temp_db_path,
    timed_out,
};
use jobstate_core::domain::{keys, DomainError, JobState, JobType};
use jobstate_core::port::{JsonRecordCodec, KeyValueStore, Namespace};
use jobstate_core::{AppError, JobStateStore, ScanControl};
use jobstate_infra_sqlite::{
    create_pool_with, current_version, run_migrations, SqliteConfig, SqliteKvStore, ENV_DB_URL,
    SCHEMA_VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

async fn row_count(kv: &SqliteKvStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM kv_entries")
        .fetch_one(kv.pool())
        .await
        .unwrap()
}

/// Jobs, states and both indices survive a restart
#[tokio::test]
async fn test_state_survives_restart() {
    let path = temp_db_path("restart");
    remove_db(&path);
    let url = path.display().to_string();

    {
        let (_kv, store) = open_store(&url).await;
        store.create(1, &job("t", 0, 1)).await.unwrap();
        store.create(2, &job("t", 0, 1)).await.unwrap();
        store.create(3, &job("t", 0, 0)).await.unwrap();
        store.activate(2, &job("t", 1500, 1)).await.unwrap();
        store.activate(3, &job("t", 1600, 0)).await.unwrap();
        store.fail(3, &job("t", 1600, 0)).await.unwrap();
        // Simulate shutdown (pool dropped)
    }

    {
        // Migrations are idempotent on an existing database
        let (_kv, store) = open_store(&url).await;

        assert!(store.is_in_state(1, JobState::Activatable).await.unwrap());
        assert!(store.is_in_state(2, JobState::Activated).await.unwrap());
        assert!(store.is_in_state(3, JobState::Failed).await.unwrap());
        assert_eq!(activatable(&store, "t").await, vec![1]);
        assert_eq!(timed_out(&store, 2000).await, vec![2]);
        assert_consistent(&store).await;
    }

    remove_db(&path);
}

/// An index entry without a primary record aborts the scan
#[tokio::test]
async fn test_orphaned_type_entry_is_fatal() {
    let (kv, store) = memory_store().await;
    store.create(1, &job("t", 0, 1)).await.unwrap();
    store.create(2, &job("t", 0, 1)).await.unwrap();

    // Corrupt: drop job 2's primary record behind the store's back
    kv.delete(Namespace::Jobs, &keys::job_key(2)).await.unwrap();

    let mut seen = Vec::new();
    let err = store
        .for_each_activatable_job(&JobType::new("t"), |key, _| {
            seen.push(key);
            ScanControl::Continue
        })
        .await
        .unwrap_err();

    assert_eq!(seen, vec![1]);
    assert!(err.is_fatal());
    assert!(matches!(err, AppError::IndexCorruption { job_key: 2, .. }));
}

/// Same rule for the deadline index
#[tokio::test]
async fn test_orphaned_deadline_entry_is_fatal() {
    let (kv, store) = memory_store().await;
    kv.put(
        Namespace::Deadlines,
        &keys::deadline_key(10, 99).unwrap(),
        b"",
    )
    .await
    .unwrap();

    let err = store
        .for_each_timed_out_job(100, |_, _| ScanControl::Continue)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::IndexCorruption { job_key: 99, .. }));

    // Past the bound the entry is never reached
    assert!(timed_out(&store, 10).await.is_empty());
}

/// Precondition violations fail before anything is written
#[tokio::test]
async fn test_precondition_failures_write_nothing() {
    let (kv, store) = memory_store().await;

    let err = store.create(1, &job("", 0, 1)).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::EmptyJobType)));
    assert_eq!(row_count(&kv).await, 0);

    store.create(1, &job("t", 0, 1)).await.unwrap();
    let before = row_count(&kv).await;

    for deadline in [0, -1] {
        let err = store.activate(1, &job("t", deadline, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::NonPositiveDeadline(_))
        ));
    }
    let err = store.timeout(1, &job("", 10, 1)).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::EmptyJobType)));

    assert_eq!(row_count(&kv).await, before);
    assert!(store.is_in_state(1, JobState::Activatable).await.unwrap());
    assert_consistent(&store).await;
}

/// Retry updates rewrite only the primary record
#[tokio::test]
async fn test_update_retries_is_single_key() {
    let (kv, store) = memory_store().await;
    store.create(1, &job("t", 0, 0)).await.unwrap();
    store.activate(1, &job("t", 300, 0)).await.unwrap();
    let before = row_count(&kv).await;

    let updated = store.update_retries(1, 4).await.unwrap().unwrap();

    assert_eq!(updated.retries, 4);
    assert_eq!(row_count(&kv).await, before);
    assert!(store.is_in_state(1, JobState::Activated).await.unwrap());
    assert_eq!(timed_out(&store, 301).await, vec![1]);
    assert_eq!(store.update_retries(2, 4).await.unwrap(), None);
}

/// Readers running beside the single writer never see a partial batch
#[tokio::test]
async fn test_concurrent_readers_see_whole_batches() {
    let path = temp_db_path("readers");
    remove_db(&path);
    let (_kv, store) = open_store(&path.display().to_string()).await;
    let store = Arc::new(store);

    for key in 1..=20 {
        store.create(key, &job("t", 0, 1)).await.unwrap();
    }

    let mut readers = JoinSet::new();
    for _ in 0..4 {
        let store = store.clone();
        readers.spawn(async move {
            for _ in 0..20 {
                for key in 1..=20u64 {
                    let state = store.get_state(key).await.unwrap();
                    assert!(state.is_some());
                    assert!(store.exists(key).await.unwrap());
                }
            }
        });
    }

    // Single writer flips every job to Activated and back
    for key in 1..=20u64 {
        store.activate(key, &job("t", 100 + key as i64, 1)).await.unwrap();
    }
    for key in 1..=20u64 {
        store.timeout(key, &job("t", 100 + key as i64, 1)).await.unwrap();
    }

    while let Some(result) = readers.join_next().await {
        result.unwrap();
    }

    assert_eq!(activatable(&store, "t").await.len(), 20);
    assert_consistent(&store).await;
    remove_db(&path);
}

/// Explicit pool settings reach the store through `create_pool_with`
#[tokio::test]
async fn test_store_over_configured_pool() {
    let path = temp_db_path("configured");
    remove_db(&path);

    let config = SqliteConfig {
        max_connections: 2,
        busy_timeout: Duration::from_millis(200),
        ..SqliteConfig::new(path.display().to_string())
    };
    let pool = create_pool_with(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    assert_eq!(current_version(&pool).await.unwrap(), SCHEMA_VERSION);

    let store = JobStateStore::new(Arc::new(SqliteKvStore::new(pool)), Arc::new(JsonRecordCodec));
    store.create(7, &job("t", 0, 1)).await.unwrap();
    assert_eq!(activatable(&store, "t").await, vec![7]);

    remove_db(&path);
}

/// Scans running beside a deleting writer skip removed jobs instead of failing
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scans_beside_deleting_writer_never_report_corruption() {
    let path = temp_db_path("scan_vs_delete");
    remove_db(&path);
    let (_kv, store) = open_store(&path.display().to_string()).await;
    let store = Arc::new(store.with_page_size(4).unwrap());

    for key in 1..=200u64 {
        store.create(key, &job("t", 0, 1)).await.unwrap();
        if key % 2 == 0 {
            store.activate(key, &job("t", key as i64, 1)).await.unwrap();
        }
    }

    let mut scanners = JoinSet::new();
    for _ in 0..4 {
        let store = store.clone();
        scanners.spawn(async move {
            for _ in 0..10 {
                store
                    .for_each_activatable_job(&JobType::new("t"), |_, record| {
                        assert_eq!(record.job_type.as_str(), "t");
                        ScanControl::Continue
                    })
                    .await
                    .unwrap();
                store
                    .for_each_timed_out_job(i64::MAX, |_, _| ScanControl::Continue)
                    .await
                    .unwrap();
            }
        });
    }

    for key in 1..=200u64 {
        let record = store.get_job(key).await.unwrap().unwrap();
        store.delete(key, &record).await.unwrap();
        tokio::task::yield_now().await;
    }

    while let Some(result) = scanners.join_next().await {
        result.unwrap();
    }

    assert!(activatable(&store, "t").await.is_empty());
    assert!(timed_out(&store, i64::MAX).await.is_empty());
    assert_consistent(&store).await;
    remove_db(&path);
}

/// `JOBSTATE_DB_URL` selects the database the store opens
#[tokio::test]
async fn test_store_from_env_config() {
    let path = temp_db_path("from_env");
    remove_db(&path);
    std::env::set_var(ENV_DB_URL, path.display().to_string());

    let config = SqliteConfig::from_env().unwrap();
    assert_eq!(config.database_url, path.display().to_string());
    assert!(!config.is_in_memory());

    let pool = create_pool_with(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let store = JobStateStore::new(Arc::new(SqliteKvStore::new(pool)), Arc::new(JsonRecordCodec));
    store.create(9, &job("t", 0, 1)).await.unwrap();

    assert!(path.exists());
    assert_eq!(activatable(&store, "t").await, vec![9]);
    std::env::remove_var(ENV_DB_URL);
    remove_db(&path);
}
