//! SQLite implementation of the IterationLedger.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::adapters::sqlite::parse_datetime;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{IterationRecord, RoundPhase};
use crate::domain::ports::IterationLedger;

#[derive(Clone)]
pub struct SqliteIterationLedger {
    pool: SqlitePool,
}

impl SqliteIterationLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IterationRow {
    round_index: i64,
    phase: String,
    unique_repeating_count: Option<i64>,
    all_repeating_count: Option<i64>,
    max_occurrences: Option<i64>,
    remaining_rate: Option<f64>,
    repeating_rate: Option<f64>,
    elapsed_counting_ms: Option<i64>,
    elapsed_adding_ms: Option<i64>,
    started_at: String,
}

fn millis_to_duration(ms: Option<i64>) -> DomainResult<Option<Duration>> {
    ms.map(|ms| {
        u64::try_from(ms)
            .map(Duration::from_millis)
            .map_err(|_| DomainError::SerializationError(format!("Negative elapsed time: {ms}")))
    })
    .transpose()
}

fn duration_to_millis(duration: Option<Duration>) -> Option<i64> {
    duration.map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

fn row_to_record(row: IterationRow) -> DomainResult<IterationRecord> {
    Ok(IterationRecord {
        round_index: row.round_index,
        phase: row.phase.parse::<RoundPhase>()?,
        unique_repeating_count: row.unique_repeating_count,
        all_repeating_count: row.all_repeating_count,
        max_occurrences: row.max_occurrences,
        remaining_rate: row.remaining_rate,
        repeating_rate: row.repeating_rate,
        elapsed_counting: millis_to_duration(row.elapsed_counting_ms)?,
        elapsed_adding: millis_to_duration(row.elapsed_adding_ms)?,
        started_at: parse_datetime(&row.started_at)?,
    })
}

#[async_trait]
impl IterationLedger for SqliteIterationLedger {
    async fn last_record(&self) -> DomainResult<Option<IterationRecord>> {
        let row: Option<IterationRow> =
            sqlx::query_as("SELECT * FROM iterations ORDER BY round_index DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_record).transpose()
    }

    async fn get(&self, round_index: i64) -> DomainResult<Option<IterationRecord>> {
        let row: Option<IterationRow> =
            sqlx::query_as("SELECT * FROM iterations WHERE round_index = ?")
                .bind(round_index)
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_record).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<IterationRecord>> {
        let rows: Vec<IterationRow> =
            sqlx::query_as("SELECT * FROM iterations ORDER BY round_index")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn append(&self, round_index: i64) -> DomainResult<IterationRecord> {
        let record = IterationRecord::new(round_index);

        sqlx::query("INSERT INTO iterations (round_index, phase, started_at) VALUES (?, ?, ?)")
            .bind(record.round_index)
            .bind(record.phase.as_str())
            .bind(record.started_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(record)
    }

    async fn update(&self, record: &IterationRecord) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE iterations SET
               phase = ?,
               unique_repeating_count = ?, all_repeating_count = ?, max_occurrences = ?,
               remaining_rate = ?, repeating_rate = ?,
               elapsed_counting_ms = ?, elapsed_adding_ms = ?
               WHERE round_index = ?"#,
        )
        .bind(record.phase.as_str())
        .bind(record.unique_repeating_count)
        .bind(record.all_repeating_count)
        .bind(record.max_occurrences)
        .bind(record.remaining_rate)
        .bind(record.repeating_rate)
        .bind(duration_to_millis(record.elapsed_counting))
        .bind(duration_to_millis(record.elapsed_adding))
        .bind(record.round_index)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DatabaseError(format!(
                "No ledger record for round {}",
                record.round_index
            )));
        }
        Ok(())
    }

    async fn reset(&self) -> DomainResult<()> {
        sqlx::query("DELETE FROM iterations").execute(&self.pool).await?;
        Ok(())
    }
}
