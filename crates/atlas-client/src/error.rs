//! Atlas client error types.
//!
//! Every variant carries a short context string naming the operation that
//! failed, so callers can surface the error unchanged.

use thiserror::Error;

/// Error that can occur while talking to the Atlas control-plane API.
#[derive(Debug, Error)]
pub enum AtlasClientError {
    /// Network-level failure: the request never produced a response.
    #[error("{context}: transport failure: {message}")]
    Transport {
        context: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server answered with a status code the operation does not accept.
    /// The body is kept verbatim for diagnostics.
    #[error("{context}: bad status {status} {body}")]
    Request {
        context: String,
        status: u16,
        body: String,
    },

    /// A response body or derived value could not be decoded.
    #[error("{context}: {message}")]
    Parse { context: String, message: String },

    /// The secure random source could not produce a usable token.
    #[error("random token generation failed: {0}")]
    Generation(String),

    /// Client construction was given unusable settings.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for Atlas client operations.
pub type AtlasClientResult<T> = Result<T, AtlasClientError>;

impl AtlasClientError {
    /// Create a transport error without an underlying source.
    pub fn transport(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping the underlying cause.
    pub fn transport_with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Prefix the error's context with the name of an enclosing operation.
    #[must_use]
    pub fn context(self, outer: &str) -> Self {
        match self {
            Self::Transport {
                context,
                message,
                source,
            } => Self::Transport {
                context: format!("{outer}: {context}"),
                message,
                source,
            },
            Self::Request {
                context,
                status,
                body,
            } => Self::Request {
                context: format!("{outer}: {context}"),
                status,
                body,
            },
            Self::Parse { context, message } => Self::Parse {
                context: format!("{outer}: {context}"),
                message,
            },
            other => other,
        }
    }

    /// HTTP status carried by a [`AtlasClientError::Request`], if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a network-level failure.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
