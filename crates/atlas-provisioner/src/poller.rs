//! Convergence polling.
//!
//! Remote objects move through provisioning states after every write. The
//! poller re-reads an object on a fixed interval until its state classifies
//! as ready or failed, the deadline passes, or the caller cancels.

use std::future::Future;
use std::time::Duration;

use atlas_client::AtlasConfig;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ProvisionError, ProvisionResult};

/// Classification of a remote object's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// Present but still transitioning.
    Converging,
    /// Present and usable.
    Ready,
    /// Unrecoverable; carries the remote state name.
    Failed { state: String },
}

/// Timing for a convergence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Sleep between reads.
    pub interval: Duration,
    /// Give up after this long; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(atlas_client::config::DEFAULT_POLL_INTERVAL_SECS),
            timeout: Some(Duration::from_secs(
                atlas_client::config::DEFAULT_CONVERGENCE_TIMEOUT_SECS,
            )),
        }
    }
}

impl PollSettings {
    #[must_use]
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    #[must_use]
    pub fn from_config(config: &AtlasConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.convergence_timeout(),
        }
    }
}

/// Drives reads until an object settles.
#[derive(Debug, Clone)]
pub struct ConvergencePoller {
    settings: PollSettings,
    cancel: CancellationToken,
}

impl ConvergencePoller {
    #[must_use]
    pub fn new(settings: PollSettings) -> Self {
        Self {
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to abort in-flight waits.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Token that cancels every wait driven by this poller and its clones.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Read until `classify` reports ready or failed.
    ///
    /// Returns `Ok(Some(record))` once ready and `Ok(None)` if the object
    /// disappears while waiting. A failed classification, an expired
    /// deadline or cancellation end the wait with an error. Read errors are
    /// returned unchanged on the tick they occur.
    pub async fn wait_until_settled<T, F, Fut, C>(
        &self,
        kind: &'static str,
        name: &str,
        mut read: F,
        classify: C,
    ) -> ProvisionResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProvisionResult<Option<T>>>,
        C: Fn(&T) -> Convergence,
    {
        let started = Instant::now();
        let mut reads: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(kind, name));
            }

            let Some(record) = read().await? else {
                warn!(kind, name, reads, "Object disappeared while converging");
                return Ok(None);
            };
            reads += 1;

            match classify(&record) {
                Convergence::Ready => {
                    info!(
                        kind,
                        name,
                        reads,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Object settled"
                    );
                    return Ok(Some(record));
                }
                Convergence::Failed { state } => {
                    warn!(kind, name, state = %state, "Object entered failed state");
                    return Err(ProvisionError::FailedState {
                        kind,
                        name: name.to_string(),
                        state,
                    });
                }
                Convergence::Converging => {}
            }

            if let Some(timeout) = self.settings.timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    warn!(kind, name, reads, "Convergence deadline exceeded");
                    return Err(ProvisionError::ConvergenceTimeout {
                        kind,
                        name: name.to_string(),
                        waited_secs: waited.as_secs(),
                    });
                }
            }

            debug!(kind, name, reads, "Still converging");
            tokio::select! {
                () = self.cancel.cancelled() => return Err(self.cancelled(kind, name)),
                () = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }

    fn cancelled(&self, kind: &'static str, name: &str) -> ProvisionError {
        info!(kind, name, "Convergence wait cancelled");
        ProvisionError::Cancelled {
            kind,
            name: name.to_string(),
        }
    }
}
