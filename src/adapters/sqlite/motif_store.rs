//! SQLite implementation of the MotifStore.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DuplicateStats, MotifRecord};
use crate::domain::ports::MotifStore;

/// Aggregates every value group of size two or more in a single scan.
const MEASURE_DUPLICATES_SQL: &str = r#"
    SELECT COUNT(*) AS unique_repeating_count,
           COALESCE(SUM(occurrences), 0) AS all_repeating_count,
           COALESCE(MAX(occurrences), 0) AS max_occurrences
    FROM (
        SELECT COUNT(*) AS occurrences
        FROM motifs
        GROUP BY value
        HAVING COUNT(*) > 1
    )"#;

/// The subquery is uncorrelated, so SQLite materializes the repeated values
/// once before any row is updated.
const REWRITE_DUPLICATES_SQL: &str = r#"
    UPDATE motifs
    SET value = value + position
    WHERE value IN (
        SELECT value
        FROM motifs
        GROUP BY value
        HAVING COUNT(*) > 1
    )"#;

#[derive(Clone)]
pub struct SqliteMotifStore {
    pool: SqlitePool,
}

impl SqliteMotifStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every record in position order.
    pub async fn list(&self) -> DomainResult<Vec<MotifRecord>> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT position, value FROM motifs ORDER BY position")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(position, value)| MotifRecord::new(position, value))
            .collect())
    }
}

#[async_trait]
impl MotifStore for SqliteMotifStore {
    async fn count_total(&self) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM motifs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn measure_duplicates(&self, cancel: &CancellationToken) -> DomainResult<DuplicateStats> {
        let query = sqlx::query_as::<_, (i64, i64, i64)>(MEASURE_DUPLICATES_SQL).fetch_one(&self.pool);

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DomainError::QueryTimeout(
                "duplicate measurement abandoned on cancellation".to_string(),
            )),
            row = query => {
                let (unique_repeating_count, all_repeating_count, max_occurrences) = row?;
                Ok(DuplicateStats {
                    unique_repeating_count,
                    all_repeating_count,
                    max_occurrences,
                })
            }
        }
    }

    async fn rewrite_duplicates(&self, cancel: &CancellationToken) -> DomainResult<u64> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let result = sqlx::query(REWRITE_DUPLICATES_SQL).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn insert_batch(&self, records: &[MotifRecord]) -> DomainResult<u64> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query("INSERT INTO motifs (position, value) VALUES (?, ?)")
                .bind(record.position)
                .bind(record.value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(records.len() as u64)
    }

    async fn clear(&self) -> DomainResult<()> {
        sqlx::query("DELETE FROM motifs").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_store(values: &[i64]) -> SqliteMotifStore {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = SqliteMotifStore::new(pool);
        let records: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| MotifRecord::new(i as i64, *v))
            .collect();
        store.insert_batch(&records).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_count_total() {
        let store = setup_test_store(&[10, 20, 30]).await;
        assert_eq!(store.count_total().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_measure_duplicates_single_group() {
        // A, B, A, C, A
        let store = setup_test_store(&[1000, 2000, 1000, 3000, 1000]).await;
        let stats = store.measure_duplicates(&CancellationToken::new()).await.unwrap();

        assert_eq!(stats.unique_repeating_count, 1);
        assert_eq!(stats.all_repeating_count, 3);
        assert_eq!(stats.max_occurrences, 3);
    }

    #[tokio::test]
    async fn test_measure_duplicates_on_empty_store() {
        let store = setup_test_store(&[]).await;
        let stats = store.measure_duplicates(&CancellationToken::new()).await.unwrap();
        assert_eq!(stats, DuplicateStats::default());
    }

    #[tokio::test]
    async fn test_measure_duplicates_several_groups() {
        let store = setup_test_store(&[5, 5, 7, 7, 7, 9, 11, 11]).await;
        let stats = store.measure_duplicates(&CancellationToken::new()).await.unwrap();

        assert_eq!(stats.unique_repeating_count, 3);
        assert_eq!(stats.all_repeating_count, 7);
        assert_eq!(stats.max_occurrences, 3);
    }

    #[tokio::test]
    async fn test_rewrite_perturbs_only_duplicates() {
        let store = setup_test_store(&[1000, 2000, 1000, 3000, 1000]).await;
        let affected = store.rewrite_duplicates(&CancellationToken::new()).await.unwrap();
        assert_eq!(affected, 3);

        let values: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1000, 2000, 1002, 3000, 1004]);

        let stats = store.measure_duplicates(&CancellationToken::new()).await.unwrap();
        assert!(stats.is_converged());
    }

    #[tokio::test]
    async fn test_rewrite_without_duplicates_touches_nothing() {
        let store = setup_test_store(&[1, 2, 3]).await;
        let affected = store.rewrite_duplicates(&CancellationToken::new()).await.unwrap();
        assert_eq!(affected, 0);
        let values: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_measure_with_cancelled_token_is_interrupted() {
        let store = setup_test_store(&[1, 1]).await;
        let token = CancellationToken::new();
        token.cancel();

        let result = store.measure_duplicates(&token).await;
        assert!(matches!(result, Err(DomainError::QueryTimeout(_))));
    }

    #[tokio::test]
    async fn test_rewrite_with_cancelled_token_does_not_start() {
        let store = setup_test_store(&[1, 1]).await;
        let token = CancellationToken::new();
        token.cancel();

        let result = store.rewrite_duplicates(&token).await;
        assert!(matches!(result, Err(DomainError::Cancelled)));
        let values: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_store_unavailable() {
        let store = setup_test_store(&[1, 2]).await;
        store.pool.close().await;

        let result = store.count_total().await;
        assert!(matches!(result, Err(DomainError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_clear_removes_every_record() {
        let store = setup_test_store(&[1, 2, 3]).await;
        store.clear().await.unwrap();
        assert_eq!(store.count_total().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_position_is_rejected() {
        let store = setup_test_store(&[1]).await;
        let result = store.insert_batch(&[MotifRecord::new(0, 9)]).await;
        assert!(result.is_err());
        let records = store.list().await.unwrap();
        assert_eq!(records, vec![MotifRecord::new(0, 1)]);
    }
}
