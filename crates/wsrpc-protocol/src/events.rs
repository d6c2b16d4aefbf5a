//! System event names.
//!
//! These are the message classes raised by the connection itself rather than
//! by the remote peer. Consumers subscribe to them by [`SystemEvent`]; the
//! string names are the stable contract surface.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEvent {
    /// The transport finished its handshake
    ConnectionOpened,
    /// The connection closed, locally or remotely
    ConnectionClosed,
    /// The transport reported an error
    ConnectionError,
    /// Inbound request with no registered handler for its method
    UnhandledRequest,
    /// Inbound notification with no registered handler for its method
    UnhandledNotification,
    /// Inbound response whose id matches no pending call
    UnhandledResponse,
    /// Inbound error with no id, or whose id matches no pending call
    UnhandledError,
    /// Well-formed payload that is not a known envelope
    IncorrectMessage,
    /// Payload that could not be parsed at all
    MalformedEnvelope,
}

impl SystemEvent {
    pub const ALL: [SystemEvent; 9] = [
        SystemEvent::ConnectionOpened,
        SystemEvent::ConnectionClosed,
        SystemEvent::ConnectionError,
        SystemEvent::UnhandledRequest,
        SystemEvent::UnhandledNotification,
        SystemEvent::UnhandledResponse,
        SystemEvent::UnhandledError,
        SystemEvent::IncorrectMessage,
        SystemEvent::MalformedEnvelope,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SystemEvent::ConnectionOpened => "connection-opened",
            SystemEvent::ConnectionClosed => "connection-closed",
            SystemEvent::ConnectionError => "connection-error",
            SystemEvent::UnhandledRequest => "unhandled-request",
            SystemEvent::UnhandledNotification => "unhandled-notification",
            SystemEvent::UnhandledResponse => "unhandled-response",
            SystemEvent::UnhandledError => "unhandled-error",
            SystemEvent::IncorrectMessage => "incorrect-message",
            SystemEvent::MalformedEnvelope => "malformed-envelope",
        }
    }
}

impl fmt::Display for SystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SystemEvent::ALL
            .into_iter()
            .find(|event| event.name() == s)
            .ok_or_else(|| format!("Unknown system event: {}", s))
    }
}
