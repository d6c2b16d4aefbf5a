//! Transport layer for the wsrpc client

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{ClientResult, TransportError};

pub mod memory;

#[cfg(feature = "websocket")]
pub mod websocket;

// Re-export transport implementations
pub use memory::{MemoryListener, MemoryPeer, MemoryTransport};

#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

/// Transport type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// WebSocket text frames (`ws`, `wss`)
    WebSocket,
    /// In-process channels
    Memory,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::WebSocket => write!(f, "WebSocket"),
            TransportType::Memory => write!(f, "Memory"),
        }
    }
}

/// Why and how a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close code from the peer, if it sent one
    pub code: Option<u16>,
    /// Human readable reason
    pub reason: String,
    /// True when the close was requested locally
    pub local: bool,
}

impl CloseInfo {
    /// Close requested by this side via `close()`
    pub fn manual() -> Self {
        Self {
            code: None,
            reason: "manual".to_string(),
            local: true,
        }
    }

    /// Close initiated by the peer or by a transport failure
    pub fn remote(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            local: false,
        }
    }
}

/// Event produced by a live transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One inbound text frame
    Message(String),
    /// Non-fatal error report
    Error(String),
    /// The connection is gone; no further events follow
    Closed(CloseInfo),
}

/// The two halves of an established connection.
///
/// Dropping `outbound` asks the transport to close gracefully.
#[derive(Debug)]
pub struct TransportChannel {
    /// Text frames to send, in order
    pub outbound: mpsc::UnboundedSender<String>,
    /// Events from the peer, in wire order
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Transport trait defining the interface for all transport implementations
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get transport type
    fn transport_type(&self) -> TransportType;

    /// Perform the handshake and hand back the connection channels
    async fn connect(&self, endpoint: &Url) -> ClientResult<TransportChannel>;
}

/// Type alias for a boxed transport
pub type BoxedTransport = Box<dyn Transport>;

/// Helper function to detect transport type from URL
pub fn detect_transport_type(url_str: &str) -> ClientResult<TransportType> {
    let url = Url::parse(url_str)
        .map_err(|e| TransportError::ConnectionFailed(format!("Invalid URL: {}", e)))?;

    match url.scheme() {
        "ws" | "wss" => Ok(TransportType::WebSocket),
        "memory" => Ok(TransportType::Memory),
        scheme => Err(TransportError::Unsupported(format!("Unknown scheme: {}", scheme)).into()),
    }
}

/// Transport factory for creating transport instances
pub struct TransportFactory;

impl TransportFactory {
    /// Create a transport from URL string
    pub fn from_url(url: &str) -> ClientResult<BoxedTransport> {
        Self::create(detect_transport_type(url)?)
    }

    /// Create a specific transport type
    pub fn create(transport_type: TransportType) -> ClientResult<BoxedTransport> {
        match transport_type {
            #[cfg(feature = "websocket")]
            TransportType::WebSocket => Ok(Box::new(WebSocketTransport::new())),
            #[cfg(not(feature = "websocket"))]
            TransportType::WebSocket => Err(TransportError::Unsupported(
                "WebSocket support is disabled".to_string(),
            )
            .into()),
            // A memory transport is only useful together with its listener
            TransportType::Memory => Err(TransportError::Unsupported(
                "Memory transports are created with MemoryTransport::new".to_string(),
            )
            .into()),
        }
    }

    /// List transport types the factory can create
    pub fn available_transports() -> Vec<TransportType> {
        let mut transports = Vec::new();
        if cfg!(feature = "websocket") {
            transports.push(TransportType::WebSocket);
        }
        transports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_type_detection() {
        assert_eq!(
            detect_transport_type("ws://localhost:21012/ws").unwrap(),
            TransportType::WebSocket
        );
        assert_eq!(
            detect_transport_type("wss://example.com/ws").unwrap(),
            TransportType::WebSocket
        );
        assert_eq!(
            detect_transport_type("memory://peer").unwrap(),
            TransportType::Memory
        );

        assert!(detect_transport_type("http://localhost:8080").is_err());
        assert!(detect_transport_type("not a url").is_err());
    }

    #[cfg(feature = "websocket")]
    #[test]
    fn test_transport_factory() {
        let transport = TransportFactory::from_url("ws://localhost:21012/ws").unwrap();
        assert_eq!(transport.transport_type(), TransportType::WebSocket);

        assert!(TransportFactory::from_url("memory://peer").is_err());
        assert!(TransportFactory::available_transports().contains(&TransportType::WebSocket));
    }

    #[test]
    fn test_close_info() {
        let manual = CloseInfo::manual();
        assert!(manual.local);
        assert_eq!(manual.reason, "manual");

        let remote = CloseInfo::remote(Some(1000), "bye");
        assert!(!remote.local);
        assert_eq!(remote.code, Some(1000));
    }
}
