//! In-process transport.
//!
//! Each successful [`MemoryTransport::connect`] hands a [`MemoryPeer`] to the
//! paired [`MemoryListener`]. The peer plays the remote side: it reads what
//! the client sends and injects frames, errors and closes.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;
use wsrpc_protocol::{DecodeError, Envelope, decode, encode};

use super::{CloseInfo, Transport, TransportChannel, TransportEvent, TransportType};
use crate::error::{ClientResult, TransportError};

/// Client half of an in-process connection
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    acceptor: mpsc::UnboundedSender<MemoryPeer>,
}

/// Receives one [`MemoryPeer`] per accepted connection.
///
/// Dropping the listener makes every later `connect` fail.
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Remote end of one in-process connection
#[derive(Debug)]
pub struct MemoryPeer {
    endpoint: Url,
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryListener) {
        let (acceptor, peers) = mpsc::unbounded_channel();
        (Self { acceptor }, MemoryListener { peers })
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Memory
    }

    async fn connect(&self, endpoint: &Url) -> ClientResult<TransportChannel> {
        let (outbound, from_client) = mpsc::unbounded_channel();
        let (to_client, inbound) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            endpoint: endpoint.clone(),
            to_client,
            from_client,
        };
        self.acceptor
            .send(peer)
            .map_err(|_| TransportError::Memory(format!("Nobody listening on {}", endpoint)))?;

        debug!(endpoint = %endpoint, "Memory connection established");
        Ok(TransportChannel { outbound, inbound })
    }
}

impl MemoryListener {
    /// Wait for the next connection
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// Take a connection that was already made, without waiting
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

impl MemoryPeer {
    /// URL the client connected to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Deliver a raw text frame to the client
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client
            .send(TransportEvent::Message(text.into()))
            .is_ok()
    }

    /// Deliver an envelope to the client
    pub fn send(&self, envelope: impl Into<Envelope>) -> bool {
        self.send_text(encode(&envelope.into()))
    }

    /// Report a transport error to the client
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.to_client
            .send(TransportEvent::Error(message.into()))
            .is_ok()
    }

    /// Close the connection from this side
    pub fn close(self, code: Option<u16>, reason: impl Into<String>) {
        let _ = self
            .to_client
            .send(TransportEvent::Closed(CloseInfo::remote(code, reason)));
    }

    /// Next frame sent by the client. `None` once the client released the
    /// connection.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next frame sent by the client, decoded
    pub async fn recv_envelope(&mut self) -> Option<Result<Envelope, DecodeError>> {
        self.recv().await.map(|text| decode(&text))
    }

    /// A frame the client already sent, without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// True once the client dropped its sending half
    pub fn is_released(&self) -> bool {
        self.to_client.is_closed() || self.from_client.is_closed()
    }
}
