//! Implementation of the `motif-reducer status` command.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::time::Duration;

use crate::adapters::sqlite::{SqliteIterationLedger, SqliteMotifStore};
use crate::cli::commands::open_database;
use crate::cli::output::table::{list_table, numeric_cell, render_list};
use crate::cli::output::{format_elapsed, format_rate, output, CommandOutput};
use crate::domain::models::{Config, IterationRecord, RoundPhase};
use crate::domain::ports::{IterationLedger, MotifStore};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show only the most recent N rounds
    #[arg(long)]
    pub last: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RoundRow {
    pub round_index: i64,
    pub phase: RoundPhase,
    pub unique_repeating_count: Option<i64>,
    pub all_repeating_count: Option<i64>,
    pub max_occurrences: Option<i64>,
    pub remaining_rate: Option<f64>,
    pub repeating_rate: Option<f64>,
    pub elapsed_counting_ms: Option<u64>,
    pub elapsed_adding_ms: Option<u64>,
    pub started_at: DateTime<Utc>,
}

impl From<IterationRecord> for RoundRow {
    fn from(record: IterationRecord) -> Self {
        Self {
            round_index: record.round_index,
            phase: record.phase,
            unique_repeating_count: record.unique_repeating_count,
            all_repeating_count: record.all_repeating_count,
            max_occurrences: record.max_occurrences,
            remaining_rate: record.remaining_rate,
            repeating_rate: record.repeating_rate,
            elapsed_counting_ms: record.elapsed_counting.map(|d| d.as_millis() as u64),
            elapsed_adding_ms: record.elapsed_adding.map(|d| d.as_millis() as u64),
            started_at: record.started_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub total_motifs: u64,
    pub converged: bool,
    pub rounds: Vec<RoundRow>,
}

fn count_cell(count: Option<i64>) -> comfy_table::Cell {
    numeric_cell(count.map_or_else(|| "-".to_string(), |c| c.to_string()))
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&[
            "round", "phase", "unique", "all", "max", "remaining", "repeating", "counting", "adding",
        ]);
        for row in &self.rounds {
            table.add_row(vec![
                numeric_cell(row.round_index),
                comfy_table::Cell::new(row.phase),
                count_cell(row.unique_repeating_count),
                count_cell(row.all_repeating_count),
                count_cell(row.max_occurrences),
                numeric_cell(format_rate(row.remaining_rate)),
                numeric_cell(format_rate(row.repeating_rate)),
                numeric_cell(format_elapsed(row.elapsed_counting_ms.map(Duration::from_millis))),
                numeric_cell(format_elapsed(row.elapsed_adding_ms.map(Duration::from_millis))),
            ]);
        }

        let state = if self.converged {
            "converged"
        } else {
            "not converged"
        };
        format!(
            "{} motifs, {state}\n{}",
            self.total_motifs,
            render_list("round", &table, self.rounds.len())
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: StatusArgs, config: &Config, json_mode: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let store = SqliteMotifStore::new(pool.clone());
    let ledger = SqliteIterationLedger::new(pool);

    let total_motifs = store.count_total().await?;
    let mut records = ledger.list().await?;
    let converged = records.last().is_some_and(IterationRecord::is_fixed_point);
    if let Some(last) = args.last {
        let skip = records.len().saturating_sub(last);
        records.drain(..skip);
    }

    output(
        &StatusOutput {
            total_motifs,
            converged,
            rounds: records.into_iter().map(RoundRow::from).collect(),
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CountingMode, DuplicateStats};

    #[test]
    fn test_status_lists_measured_and_pending_rounds() {
        let mut measured = IterationRecord::new(0);
        measured.apply_measurement(
            &DuplicateStats {
                unique_repeating_count: 1,
                all_repeating_count: 3,
                max_occurrences: 3,
            },
            CountingMode::Unique,
            0,
            5,
            Duration::from_millis(40),
        );
        measured.complete_rewrite(Duration::from_millis(15));
        let pending = IterationRecord::new(1);

        let status = StatusOutput {
            total_motifs: 5,
            converged: false,
            rounds: vec![measured.into(), pending.into()],
        };

        let human = status.to_human();
        assert!(human.contains("5 motifs, not converged"));
        assert!(human.contains("60.00%"));
        assert!(human.contains("measuring"));

        let json = status.to_json();
        assert_eq!(json["rounds"][0]["elapsed_counting_ms"], 40);
        assert_eq!(json["rounds"][1]["unique_repeating_count"], serde_json::Value::Null);
        assert_eq!(json["rounds"][0]["phase"], "complete");
    }
}
