//! Per-run cooperative cancellation and pause signalling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{DomainError, DomainResult};

/// Control object shared between a running engine and whoever drives it.
///
/// Cancellation is carried by a token that store operations can await; pause
/// is a flag polled at checkpoints. Neither preempts a store statement that
/// is already executing, except that read-only scans abandon on the token.
#[derive(Debug, Clone)]
pub struct RunControl {
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl RunControl {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            paused: Arc::new(AtomicBool::new(false)),
            poll_interval,
        }
    }

    /// Request the run to stop at its next checkpoint.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Flip the pause flag, returning whether the run is now paused.
    pub fn request_pause_toggle(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Token handed to store operations.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with `Cancelled` if cancellation was requested.
    pub fn ensure_active(&self) -> DomainResult<()> {
        if self.is_cancelled() {
            Err(DomainError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Suspension point: wait out a pause, then fail if cancelled.
    pub async fn checkpoint(&self) -> DomainResult<()> {
        self.ensure_active()?;

        if self.is_paused() {
            tracing::info!("run paused");
            while self.is_paused() && !self.is_cancelled() {
                tokio::select! {
                    () = tokio::time::sleep(self.poll_interval) => {}
                    () = self.cancel.cancelled() => {}
                }
            }
            tracing::info!(cancelled = self.is_cancelled(), "run resumed");
        }

        self.ensure_active()
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_checkpoint_passes_when_idle() {
        let control = RunControl::default();
        assert!(control.checkpoint().await.is_ok());
    }

    #[tokio::test]
    async fn test_checkpoint_fails_after_cancel() {
        let control = RunControl::default();
        control.request_cancel();
        assert!(matches!(control.checkpoint().await, Err(DomainError::Cancelled)));
        assert!(control.token().is_cancelled());
    }

    #[test]
    fn test_pause_toggle_reports_new_state() {
        let control = RunControl::default();
        assert!(control.request_pause_toggle());
        assert!(control.is_paused());
        assert!(!control.request_pause_toggle());
        assert!(!control.is_paused());
    }

    #[tokio::test]
    async fn test_checkpoint_waits_while_paused() {
        let control = RunControl::new(Duration::from_millis(5));
        control.request_pause_toggle();

        let waiter = control.clone();
        let handle = tokio::spawn(async move { waiter.checkpoint().await });

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!handle.is_finished());

        control.request_pause_toggle();
        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("checkpoint should return once unpaused")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_releases_paused_checkpoint() {
        let control = RunControl::new(Duration::from_secs(60));
        control.request_pause_toggle();

        let waiter = control.clone();
        let handle = tokio::spawn(async move { waiter.checkpoint().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        control.request_cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("cancel should wake the paused checkpoint")
            .unwrap();
        assert!(matches!(result, Err(DomainError::Cancelled)));
    }
}
