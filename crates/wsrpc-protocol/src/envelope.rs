//! The closed set of frames exchanged over a connection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorEnvelope;
use crate::notification::NotificationEnvelope;
use crate::request::{RequestEnvelope, RequestId};
use crate::response::ResponseEnvelope;

/// One frame on the wire, tagged by its `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    #[serde(rename = "req")]
    Request(RequestEnvelope),

    #[serde(rename = "not")]
    Notification(NotificationEnvelope),

    #[serde(rename = "res")]
    Response(ResponseEnvelope),

    #[serde(rename = "err")]
    Error(ErrorEnvelope),
}

/// Envelope discriminant, mirrors the wire `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Request,
    Notification,
    Response,
    Error,
}

impl EnvelopeKind {
    /// Wire tag for this kind
    pub fn tag(&self) -> &'static str {
        match self {
            EnvelopeKind::Request => "req",
            EnvelopeKind::Notification => "not",
            EnvelopeKind::Response => "res",
            EnvelopeKind::Error => "err",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "req" => Some(EnvelopeKind::Request),
            "not" => Some(EnvelopeKind::Notification),
            "res" => Some(EnvelopeKind::Response),
            "err" => Some(EnvelopeKind::Error),
            _ => None,
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::Request(_) => EnvelopeKind::Request,
            Envelope::Notification(_) => EnvelopeKind::Notification,
            Envelope::Response(_) => EnvelopeKind::Response,
            Envelope::Error(_) => EnvelopeKind::Error,
        }
    }

    /// Correlation id, if this kind carries one
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Envelope::Request(request) => Some(&request.id),
            Envelope::Response(response) => Some(&response.id),
            Envelope::Error(error) => error.id.as_ref(),
            Envelope::Notification(_) => None,
        }
    }

    /// Method name for requests and notifications
    pub fn method(&self) -> Option<&str> {
        match self {
            Envelope::Request(request) => Some(&request.method),
            Envelope::Notification(notification) => Some(&notification.method),
            Envelope::Response(_) | Envelope::Error(_) => None,
        }
    }

    /// Whether this envelope answers an earlier request
    pub fn is_reply(&self) -> bool {
        matches!(self, Envelope::Response(_) | Envelope::Error(_))
    }
}

impl From<RequestEnvelope> for Envelope {
    fn from(request: RequestEnvelope) -> Self {
        Self::Request(request)
    }
}

impl From<NotificationEnvelope> for Envelope {
    fn from(notification: NotificationEnvelope) -> Self {
        Self::Notification(notification)
    }
}

impl From<ResponseEnvelope> for Envelope {
    fn from(response: ResponseEnvelope) -> Self {
        Self::Response(response)
    }
}

impl From<ErrorEnvelope> for Envelope {
    fn from(error: ErrorEnvelope) -> Self {
        Self::Error(error)
    }
}
