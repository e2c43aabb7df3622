//! Run control: cooperative cancellation shared by every worker.
//!
//! A [`RunControl`] wraps a cancellation token. Timed waits race against it
//! so an interrupt ends any pacing or retry sleep immediately.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Error returned when a run is stopped before finishing its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Cloneable handle; all clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    token: CancellationToken,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            return Err(Cancelled);
        }
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.token.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Cancel on the first Ctrl-C. The listener task lives as long as the runtime.
    pub fn cancel_on_ctrl_c(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    match res {
                        Ok(()) => {
                            tracing::warn!("interrupt received, flushing checkpoints and stopping");
                            token.cancel();
                        }
                        Err(e) => tracing::warn!("could not listen for interrupt: {}", e),
                    }
                }
                _ = token.cancelled() => {}
            }
        });
    }
}
