//! Connection slot and lifecycle state

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::transport::TransportType;

/// Lifecycle state of the single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection. Absent and closed are the same thing.
    #[default]
    Closed,
    /// Transport handshake in progress
    Connecting,
    /// Ready to send and receive
    Open,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
        }
    }
}

/// The live connection owned by the client
#[derive(Debug)]
pub(crate) struct Connection {
    generation: u64,
    endpoint: Url,
    outbound: mpsc::UnboundedSender<String>,
    driver: Option<JoinHandle<()>>,
    log_frames: bool,
}

impl Connection {
    pub(crate) fn new(
        generation: u64,
        endpoint: Url,
        outbound: mpsc::UnboundedSender<String>,
        log_frames: bool,
    ) -> Self {
        Self {
            generation,
            endpoint,
            outbound,
            driver: None,
            log_frames,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn attach_driver(&mut self, driver: JoinHandle<()>) {
        self.driver = Some(driver);
    }

    /// Queue one text frame
    pub(crate) fn send(&self, frame: String) -> ClientResult<()> {
        if self.log_frames {
            trace!(generation = self.generation, frame = %frame, "Outbound frame");
        }
        self.outbound
            .send(frame)
            .map_err(|_| ClientError::NotConnected)
    }

    /// Let go of the transport: the outbound channel closes and the inbound
    /// driver stops.
    pub(crate) fn release(self) {
        debug!(generation = self.generation, endpoint = %self.endpoint, "Releasing transport");
        if let Some(driver) = self.driver {
            driver.abort();
        }
    }
}

/// Snapshot of the client's connection
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    /// Current lifecycle state
    pub state: ConnectionState,
    /// Transport in use
    pub transport_type: TransportType,
    /// Endpoint of the live connection
    pub endpoint: Option<String>,
    /// Calls waiting for a reply
    pub pending_calls: usize,
    /// Number of connections attempted so far
    pub generation: u64,
}

impl ConnectionStatus {
    /// Check if the connection can carry traffic
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Get a human-readable status summary
    pub fn summary(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!(
                "{} via {} transport to {} ({} pending)",
                self.state, self.transport_type, endpoint, self.pending_calls
            ),
            None => format!("{} ({} transport)", self.state, self.transport_type),
        }
    }
}
