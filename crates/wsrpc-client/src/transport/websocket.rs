//! WebSocket transport over `tokio-tungstenite`.
//!
//! One task owns the socket: it forwards outbound text frames and turns
//! inbound frames into [`TransportEvent`]s. Dropping the outbound sender
//! makes the task send a Close frame and exit.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use super::{CloseInfo, Transport, TransportChannel, TransportEvent, TransportType};
use crate::error::{ClientResult, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    log_frames: bool,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace every frame in both directions
    pub fn with_frame_logging(mut self, enabled: bool) -> Self {
        self.log_frames = enabled;
        self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    async fn connect(&self, endpoint: &Url) -> ClientResult<TransportChannel> {
        debug!(endpoint = %endpoint, "Opening WebSocket");

        let (ws, _response) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| connect_error(endpoint, e))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(socket_loop(ws, outbound_rx, inbound_tx, self.log_frames));

        Ok(TransportChannel {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Socket-level failures mean the peer was never reached; anything else
/// happened during the handshake
fn connect_error(endpoint: &Url, error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::Io(e) => TransportError::ConnectionFailed(format!("{}: {}", endpoint, e)),
        other => TransportError::WebSocket(format!("{}: {}", endpoint, other)),
    }
}

/// Inbound side of the channel. The driver may go away at any time.
struct Inbound {
    tx: mpsc::UnboundedSender<TransportEvent>,
    detached: bool,
}

impl Inbound {
    fn push(&mut self, event: TransportEvent) {
        if self.tx.send(event).is_err() && !self.detached {
            trace!("Inbound receiver dropped, discarding transport events");
            self.detached = true;
        }
    }
}

async fn socket_loop(
    ws: WsStream,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
    log_frames: bool,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut inbound = Inbound {
        tx: inbound,
        detached: false,
    };

    let close = loop {
        tokio::select! {
            text = outbound.recv() => {
                let Some(text) = text else {
                    // Local close: the receiver side is already gone
                    if let Err(e) = ws_tx.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    return;
                };
                if log_frames {
                    trace!(frame = %text, "WebSocket send");
                }
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    inbound.push(TransportEvent::Error(e.to_string()));
                    break CloseInfo::remote(None, e.to_string());
                }
            }
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if log_frames {
                            trace!(frame = %text.as_str(), "WebSocket receive");
                        }
                        inbound.push(TransportEvent::Message(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        // Text protocol only; binary payloads are passed on if they are UTF-8
                        match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => {
                                inbound.push(TransportEvent::Message(text));
                            }
                            Err(_) => {
                                warn!(len = bytes.len(), "Dropping non UTF-8 binary frame");
                                inbound.push(TransportEvent::Error(
                                    "binary frame is not valid UTF-8".to_string(),
                                ));
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => CloseInfo::remote(
                                Some(u16::from(frame.code)),
                                frame.reason.as_str(),
                            ),
                            None => CloseInfo::remote(None, ""),
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        inbound.push(TransportEvent::Error(e.to_string()));
                        break CloseInfo::remote(None, e.to_string());
                    }
                    None => break CloseInfo::remote(None, "stream ended"),
                }
            }
        }
    };

    debug!(code = ?close.code, reason = %close.reason, "WebSocket closed");
    inbound.push(TransportEvent::Closed(close));
}
