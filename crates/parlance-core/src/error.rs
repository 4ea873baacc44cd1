//! Error types for the Parlance conversation controller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole workspace.
///
/// Provides typed, structured variants with automatic conversion from common
/// error types via the `From` trait. The conversation state machine relies on
/// the distinction between the variants: `Network` failures are queueable and
/// retryable, `Auth` and `ServerRejected` are terminal for the triggering
/// action, and `Validation` never leaves the machine at all.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ParlanceError {
    /// Entity not found, with type information.
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Transient transport failure. Queueable and retryable.
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication or authorization failure. Terminal for the action;
    /// re-authentication happens outside this core.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The backend understood the request and refused it.
    #[error("Server rejected request: {0}")]
    ServerRejected(String),

    /// Local write failed. Non-fatal, logged by callers.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid input, rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// File system error.
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ParlanceError {
    /// Creates a NotFound error.
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for failures that may succeed on a later attempt and therefore
    /// feed the offline queue.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for ParlanceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ParlanceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ParlanceError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ParlanceError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ParlanceError {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level failures (connect, timeout, body) are transient.
        // Status-code classification happens at the gateway, which inspects
        // the response before this conversion can apply.
        Self::Network(err.to_string())
    }
}

/// Conversion from anyhow::Error at layer boundaries.
impl From<anyhow::Error> for ParlanceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ParlanceError>`.
pub type Result<T> = std::result::Result<T, ParlanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_is_the_only_retryable_kind() {
        assert!(ParlanceError::network("timed out").is_retryable());
        assert!(!ParlanceError::Auth("expired token".into()).is_retryable());
        assert!(!ParlanceError::ServerRejected("bad request".into()).is_retryable());
        assert!(!ParlanceError::not_found("Session", "s-1").is_retryable());
        assert!(!ParlanceError::validation("empty input").is_retryable());
    }

    #[test]
    fn io_errors_convert_with_kind() {
        let err: ParlanceError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, ParlanceError::Io { .. }));
        assert!(err.to_string().contains("NotFound"));
    }
}
