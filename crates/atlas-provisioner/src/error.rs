//! Provisioner error types.

use atlas_client::{AtlasClientError, ConfigError};
use thiserror::Error;

/// Error returned by a reconciliation call.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A request to the control plane failed (transport, status, decode).
    #[error(transparent)]
    Client(#[from] AtlasClientError),

    /// A related object the operation depends on does not exist.
    #[error("{kind}: {what} not found")]
    DependencyNotFound { kind: &'static str, what: String },

    /// A polled object reached an unrecoverable state.
    #[error("{kind} {name}: in failed state {state}")]
    FailedState {
        kind: &'static str,
        name: String,
        state: String,
    },

    /// Convergence did not finish before the configured deadline.
    #[error("{kind} {name}: not settled after {waited_secs}s")]
    ConvergenceTimeout {
        kind: &'static str,
        name: String,
        waited_secs: u64,
    },

    /// The convergence wait was cancelled by the caller.
    #[error("{kind} {name}: convergence wait cancelled")]
    Cancelled { kind: &'static str, name: String },

    /// The object disappeared while an operation that needs it was running.
    #[error("{kind} {name}: disappeared during {operation}")]
    Vanished {
        kind: &'static str,
        name: String,
        operation: &'static str,
    },

    /// The cluster connection string could not be combined with user credentials.
    #[error("invalid connection URI: {0}")]
    InvalidConnectionUri(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for provisioner operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

impl ProvisionError {
    /// Whether the error ended a convergence wait rather than a request.
    #[must_use]
    pub fn is_convergence(&self) -> bool {
        matches!(
            self,
            Self::FailedState { .. }
                | Self::ConvergenceTimeout { .. }
                | Self::Cancelled { .. }
                | Self::Vanished { .. }
        )
    }

    /// HTTP status of an underlying request error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client(e) => e.status(),
            _ => None,
        }
    }
}
