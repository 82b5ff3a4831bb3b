//! Terminal observer for `motif-reducer run`.

use async_trait::async_trait;
use console::{style, Term};
use indicatif::ProgressBar;
use std::time::Duration;
use tracing::warn;

use crate::cli::output::format_elapsed;
use crate::cli::output::progress::{create_spinner_with_message, ProgressBarExt};
use crate::domain::errors::DomainError;
use crate::domain::models::{ProgressUpdate, RoundPhase, TerminalStatus};
use crate::domain::ports::RunObserver;

/// Reports progress on a spinner and asks growth confirmations on the terminal.
pub struct ConsoleObserver {
    spinner: ProgressBar,
    assume_yes: bool,
}

impl ConsoleObserver {
    pub fn new(assume_yes: bool, json_mode: bool) -> Self {
        Self {
            spinner: create_spinner_with_message("starting run", json_mode),
            assume_yes,
        }
    }

    pub fn spinner(&self) -> &ProgressBar {
        &self.spinner
    }
}

fn phase_label(phase: RoundPhase) -> &'static str {
    match phase {
        RoundPhase::Measuring => "measured",
        RoundPhase::Rewriting | RoundPhase::Complete => "rewrote",
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl RunObserver for ConsoleObserver {
    async fn on_progress(&self, update: ProgressUpdate) {
        self.spinner.set_message(format!(
            "round {}: {} {} duplicates in {}",
            update.round_index,
            phase_label(update.phase),
            update.duplicate_count,
            format_elapsed(Some(update.elapsed)),
        ));
    }

    async fn on_confirmation_required(&self, round_index: i64, previous: i64, current: i64) -> bool {
        if self.assume_yes {
            return true;
        }
        if !console::user_attended_stderr() {
            warn!(round_index, "duplicates grew and no terminal is attached; stopping");
            return false;
        }

        let prompt = format!(
            "{} round {round_index} found {current} duplicates, up from {previous}. Continue? [y/N] ",
            style("?").yellow().bold()
        );
        let spinner = self.spinner.clone();
        let answer = tokio::task::spawn_blocking(move || {
            spinner.suspend(|| {
                let term = Term::stderr();
                term.write_str(&prompt)?;
                term.read_line()
            })
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(err)) => {
                warn!(error = %err, "failed to read confirmation");
                false
            }
            Err(err) => {
                warn!(error = %err, "confirmation prompt task failed");
                false
            }
        }
    }

    async fn on_terminal(&self, status: TerminalStatus, message: Option<String>) {
        let text = message.unwrap_or_else(|| status.to_string());
        match status {
            TerminalStatus::Finished => self.spinner.finish_success(text),
            TerminalStatus::Canceled => self.spinner.finish_warning(text),
            TerminalStatus::Error => self.spinner.finish_error(text),
        }
    }

    async fn on_sample_counted(&self, total: u64, elapsed: Duration) {
        self.spinner.set_message(format!(
            "counted {total} motifs in {}",
            format_elapsed(Some(elapsed))
        ));
    }

    async fn on_warning(&self, warning: &DomainError) {
        let line = format!("{} {warning}", style("warning:").yellow().bold());
        self.spinner.suspend(|| eprintln!("{line}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_assume_yes_skips_prompt() {
        let observer = ConsoleObserver::new(true, true);
        assert!(observer.on_confirmation_required(3, 10, 12).await);
    }

    #[tokio::test]
    async fn test_terminal_finishes_spinner() {
        let observer = ConsoleObserver::new(false, true);
        observer
            .on_terminal(TerminalStatus::Canceled, Some("Run cancelled".to_string()))
            .await;
        assert!(observer.spinner().is_finished());
    }
}
