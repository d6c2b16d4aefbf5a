//! Error types for wsrpc client operations

use thiserror::Error;
use wsrpc_protocol::{ErrorEnvelope, RequestId};

/// Result type for wsrpc client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Comprehensive error type for wsrpc client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No open connection to send through
    #[error("Not connected")]
    NotConnected,

    /// The peer answered a call with an error envelope
    #[error("Remote error: {0}")]
    Remote(ErrorEnvelope),

    /// JSON (de)serialization of typed params or results
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call did not complete within its deadline
    #[error("Request {id} timed out")]
    Timeout { id: RequestId },

    /// Generic error with context
    #[error("Error: {message}")]
    Generic { message: String },
}

/// Transport-specific errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// The peer was reached but the WebSocket handshake failed
    #[error("WebSocket transport error: {0}")]
    WebSocket(String),

    #[error("Memory transport error: {0}")]
    Memory(String),

    #[error("Unsupported transport: {0}")]
    Unsupported(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection attempt timed out")]
    ConnectTimeout,

    #[error("Transport closed unexpectedly")]
    Closed,
}

impl ClientError {
    /// Create a generic error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if the error is worth retrying after reopening the connection
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::Timeout { .. }
                | Self::Transport(TransportError::ConnectionFailed(_))
                | Self::Transport(TransportError::ConnectTimeout)
                | Self::Transport(TransportError::Closed)
        )
    }

    /// Check if the peer rejected the call
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The error envelope sent by the peer, if any
    pub fn remote_error(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Remote(error) => Some(error),
            _ => None,
        }
    }
}

/// Convenience macro for creating generic errors
#[macro_export]
macro_rules! client_error {
    ($($arg:tt)*) => {
        $crate::error::ClientError::generic(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ClientError::NotConnected.is_retryable());
        assert!(ClientError::from(TransportError::Closed).is_retryable());
        assert!(!ClientError::config("bad").is_retryable());

        let remote = ClientError::Remote(ErrorEnvelope::for_request(
            RequestId::new("1"),
            "Denied",
            "no",
        ));
        assert!(remote.is_remote());
        assert!(!remote.is_retryable());
        assert_eq!(remote.remote_error().map(|e| e.eid.as_str()), Some("Denied"));
    }

    #[test]
    fn test_client_error_macro() {
        let err = client_error!("call {} failed", 3);
        assert_eq!(err.to_string(), "Error: call 3 failed");
    }
}
