use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::request::RequestId;

/// A failed reply.
///
/// `id` is present only when the error answers a specific request;
/// connection-level errors carry no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub eid: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(id: Option<RequestId>, eid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            eid: eid.into(),
            message: message.into(),
        }
    }

    /// Error answering a specific request
    pub fn for_request(id: RequestId, eid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Some(id), eid, message)
    }

    /// Connection-level error, not tied to any request
    pub fn without_id(eid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(None, eid, message)
    }

    pub fn incorrect_input(message: impl Into<String>) -> Self {
        Self::without_id(crate::error_ids::INCORRECT_INPUT, message)
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::for_request(
            id,
            crate::error_ids::METHOD_NOT_FOUND,
            format!("Method '{}' not found", method),
        )
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} (request {}): {}", self.eid, id, self.message),
            None => write!(f, "{}: {}", self.eid, self.message),
        }
    }
}

impl std::error::Error for ErrorEnvelope {}

/// Why an inbound payload could not be turned into an [`Envelope`](crate::Envelope)
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not well-formed JSON
    #[error("Malformed payload: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    /// Well-formed JSON that is not a recognizable envelope
    #[error("Incorrect message: {reason}")]
    Incorrect { value: Value, reason: String },
}

impl DecodeError {
    pub fn incorrect(value: Value, reason: impl Into<String>) -> Self {
        Self::Incorrect {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}
