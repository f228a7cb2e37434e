//! Interrupt handling.
//!
//! [`Interrupt`] listens for SIGTERM and SIGINT (Ctrl+C on Windows) in a
//! background task and cancels a [`CancellationToken`] when one arrives. The
//! flow hands that token to the payment watcher, so an interrupted wait ends
//! with [`solpay::WatchError::Cancelled`] instead of killing the process
//! mid-poll.

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Cancels a token on the first shutdown signal.
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct Interrupt {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl Interrupt {
    /// Registers the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    #[allow(clippy::unnecessary_wraps)] // Result needed on Unix for signal registration
    pub fn try_new() -> Result<Self, std::io::Error> {
        let inner = CancellationToken::new();
        let outer = inner.clone();
        let task_tracker = TaskTracker::new();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            task_tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                    () = inner.cancelled() => return,
                }
                tracing::warn!("Interrupted, abandoning payment watch");
                inner.cancel();
            });
        }

        #[cfg(windows)]
        {
            task_tracker.spawn(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    () = inner.cancelled() => return,
                }
                tracing::warn!("Interrupted, abandoning payment watch");
                inner.cancel();
            });
        }

        task_tracker.close();
        Ok(Self {
            task_tracker,
            cancellation_token: outer,
        })
    }

    /// Token cancelled when a shutdown signal arrives.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Stops listening and waits for the handler task to finish.
    pub async fn close(self) {
        self.cancellation_token.cancel();
        self.task_tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_releases_handler() {
        let interrupt = Interrupt::try_new().unwrap();
        let token = interrupt.cancellation_token();
        assert!(!token.is_cancelled());
        interrupt.close().await;
        assert!(token.is_cancelled());
    }
}
