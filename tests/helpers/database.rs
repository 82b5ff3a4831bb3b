use std::path::Path;

use motif_reducer::adapters::sqlite::{create_migrated_test_pool, initialize_database, SqliteMotifStore};
use motif_reducer::domain::models::MotifRecord;
use motif_reducer::domain::ports::MotifStore;
use sqlx::SqlitePool;

/// Create an in-memory SQLite database for testing
///
/// Each call creates a completely isolated database instance with
/// migrations applied.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// Open (or create) an on-disk database inside `dir`
pub async fn open_file_db(dir: &Path) -> SqlitePool {
    let url = format!("sqlite:{}", dir.join("motifs.db").display());
    initialize_database(&url, None)
        .await
        .expect("failed to open file database")
}

/// Insert `values` at positions `0..values.len()`
pub async fn seed_motifs(pool: &SqlitePool, values: &[i64]) -> SqliteMotifStore {
    let store = SqliteMotifStore::new(pool.clone());
    let records: Vec<MotifRecord> = values
        .iter()
        .enumerate()
        .map(|(position, value)| MotifRecord::new(position as i64, *value))
        .collect();
    store
        .insert_batch(&records)
        .await
        .expect("failed to seed motifs");
    store
}

/// Motif values ordered by position
pub async fn motif_values(pool: &SqlitePool) -> Vec<i64> {
    sqlx::query_scalar("SELECT value FROM motifs ORDER BY position")
        .fetch_all(pool)
        .await
        .expect("failed to read motifs")
}

/// Teardown test database
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}
