//! Remote peer for wsrpc end-to-end tests
//!
//! [`TestPeer`] listens on an ephemeral localhost port and speaks the server
//! half of the protocol:
//!
//! - `ping` is answered with `"pong"`, `echo` with its text, `shutdown` with
//!   `"ok"` before the peer stops
//! - an `askMe` notification makes the peer send an `echo` request back
//! - undecodable frames and unknown methods are answered with an `err`
//!   envelope without id and eid `IncorrectInput`
//! - only one client at a time; a second handshake is refused
//!
//! Replies the client sends to peer-issued requests are collected and can be
//! awaited with [`TestPeer::next_answer`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, info, trace, warn};
use wsrpc_protocol::{
    Envelope, ErrorEnvelope, NotificationEnvelope, RequestEnvelope, RequestId, ResponseEnvelope,
    decode, encode,
};

/// Body of the refusal sent to a second concurrent client
pub const CONNECTION_ALREADY_IN_USE: &str = "CONNECTION_ALREADY_IN_USE";

struct Shared {
    client: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    answers: mpsc::UnboundedSender<Envelope>,
    shutdown: watch::Sender<bool>,
    request_counter: AtomicU64,
    connections: AtomicUsize,
}

impl Shared {
    fn send(&self, message: Message) -> bool {
        match self.client.lock().as_ref() {
            Some(client) => client.send(message).is_ok(),
            None => false,
        }
    }

    fn send_envelope(&self, envelope: Envelope) -> bool {
        let frame = encode(&envelope);
        trace!(frame = %frame, "Peer send");
        self.send(Message::Text(frame.into()))
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::new(format!(
            "peer-{}",
            self.request_counter.fetch_add(1, Ordering::Relaxed)
        ))
    }
}

/// WebSocket server playing the remote side of a wsrpc connection
pub struct TestPeer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    answers: tokio::sync::Mutex<mpsc::UnboundedReceiver<Envelope>>,
    task: JoinHandle<()>,
}

impl TestPeer {
    /// Bind `127.0.0.1:0` and start accepting clients
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (answers_tx, answers_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            client: Mutex::new(None),
            answers: answers_tx,
            shutdown,
            request_counter: AtomicU64::new(0),
            connections: AtomicUsize::new(0),
        });

        let task = tokio::spawn(accept_loop(listener, Arc::clone(&shared)));
        info!(addr = %addr, "Test peer listening");

        Ok(Self {
            addr,
            shared,
            answers: tokio::sync::Mutex::new(answers_rx),
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `host:port` as passed to `WsRpcClient::open`
    pub fn target(&self) -> String {
        self.addr.to_string()
    }

    /// Whether a client is currently connected
    pub fn has_client(&self) -> bool {
        self.shared.client.lock().is_some()
    }

    /// Number of clients accepted so far
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Push an envelope to the connected client
    pub fn send(&self, envelope: impl Into<Envelope>) -> bool {
        self.shared.send_envelope(envelope.into())
    }

    /// Push a raw text frame to the connected client
    pub fn send_text(&self, text: &str) -> bool {
        self.shared.send(Message::Text(text.to_string().into()))
    }

    /// Issue a request to the client. Its reply shows up in
    /// [`next_answer`](Self::next_answer).
    pub fn request(&self, method: &str, params: Value) -> Option<RequestId> {
        let id = self.shared.next_request_id();
        self.send(RequestEnvelope::new(id.clone(), method, params))
            .then_some(id)
    }

    /// Close the client's connection from the server side
    pub fn disconnect_client(&self) -> bool {
        self.shared.send(Message::Close(None))
    }

    /// Next `res`/`err` the client sent for a peer-issued request
    pub async fn next_answer(&self, within: Duration) -> Option<Envelope> {
        let mut answers = self.answers.lock().await;
        tokio::time::timeout(within, answers.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting and drop the current client
    pub fn shutdown(&self) {
        self.shared.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shared.shutdown.borrow()
    }
}

impl Drop for TestPeer {
    fn drop(&mut self) {
        self.shutdown();
        self.task.abort();
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    let mut shutdown = shared.shutdown.subscribe();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, origin)) => {
                    tokio::spawn(serve(stream, origin, Arc::clone(&shared)));
                }
                Err(e) => warn!(error = %e, "Accept failed"),
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!("Test peer stopped accepting");
}

async fn serve(stream: TcpStream, origin: SocketAddr, shared: Arc<Shared>) {
    let busy = shared.client.lock().is_some();
    let handshake = accept_hdr_async(stream, |_request: &Request, response: Response| {
        if busy {
            let mut refusal = ErrorResponse::new(Some(CONNECTION_ALREADY_IN_USE.to_string()));
            *refusal.status_mut() = StatusCode::BAD_REQUEST;
            Err(refusal)
        } else {
            Ok(response)
        }
    })
    .await;

    let ws = match handshake {
        Ok(ws) => ws,
        Err(e) => {
            debug!(origin = %origin, error = %e, "Handshake rejected");
            return;
        }
    };

    let (mut sink, mut source) = ws.split();
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<Message>();
    *shared.client.lock() = Some(client_tx);
    shared.connections.fetch_add(1, Ordering::SeqCst);

    tokio::spawn(async move {
        while let Some(message) = client_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = sink.send(message).await {
                debug!(error = %e, "Peer write failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    info!(origin = %origin, "Client connected");
    let mut shutdown = shared.shutdown.subscribe();

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(&shared, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Error while receiving ws message");
                    break;
                }
            },
            _ = shutdown.changed() => {
                shared.send(Message::Close(None));
                break;
            }
        }
    }

    *shared.client.lock() = None;
    info!(origin = %origin, "Client disconnected");
}

fn handle_frame(shared: &Shared, frame: &str) {
    trace!(frame = %frame, "Peer receive");

    let envelope = match decode(frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Error while parsing message");
            shared.send_envelope(ErrorEnvelope::incorrect_input(e.to_string()).into());
            return;
        }
    };

    match envelope {
        Envelope::Request(request) => handle_request(shared, request),
        Envelope::Notification(notification) => handle_notification(shared, notification),
        Envelope::Response(_) | Envelope::Error(_) => {
            let _ = shared.answers.send(envelope);
        }
    }
}

fn handle_request(shared: &Shared, request: RequestEnvelope) {
    let reply: Envelope = match (request.method.as_str(), &request.params) {
        ("ping", _) => ResponseEnvelope::new(request.id, json!("pong")).into(),
        ("echo", Value::String(text)) => ResponseEnvelope::new(request.id, json!(text)).into(),
        ("shutdown", _) => {
            shared.send_envelope(ResponseEnvelope::new(request.id, json!("ok")).into());
            info!("Shutting down");
            shared.shutdown.send_replace(true);
            return;
        }
        (method, params) => ErrorEnvelope::incorrect_input(format!(
            "unknown request {} with params {}",
            method, params
        ))
        .into(),
    };
    shared.send_envelope(reply);
}

fn handle_notification(shared: &Shared, notification: NotificationEnvelope) {
    match (notification.method.as_str(), &notification.params) {
        ("askMe", Value::String(text)) => {
            let id = shared.next_request_id();
            shared.send_envelope(RequestEnvelope::new(id, "echo", json!(text)).into());
        }
        (method, params) => {
            warn!(method = %method, params = %params, "Ignoring notification");
            shared.send_envelope(
                ErrorEnvelope::incorrect_input(format!("unknown notification {}", method)).into(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    async fn next_envelope<S>(source: &mut S) -> Envelope
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            match tokio::time::timeout(Duration::from_secs(2), source.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => return decode(text.as_str()).unwrap(),
                Ok(Some(Ok(_))) => continue,
                other => panic!("Expected text frame, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_ping_and_bad_input() {
        let _ = tracing_subscriber::fmt::try_init();
        let peer = TestPeer::start().await.unwrap();

        let url = format!("ws://{}/ws", peer.target());
        let (ws, _) = connect_async(url.as_str()).await.unwrap();
        let (mut sink, mut source) = ws.split();

        sink.send(Message::Text(
            r#"{"type":"req","id":"0","method":"ping","params":null}"#.into(),
        ))
        .await
        .unwrap();
        match next_envelope(&mut source).await {
            Envelope::Response(response) => {
                assert_eq!(response.id.as_str(), "0");
                assert_eq!(response.result, json!("pong"));
            }
            other => panic!("Expected response, got {:?}", other),
        }

        sink.send(Message::Text("garbage".into())).await.unwrap();
        match next_envelope(&mut source).await {
            Envelope::Error(error) => {
                assert!(error.id.is_none());
                assert_eq!(error.eid, wsrpc_protocol::error_ids::INCORRECT_INPUT);
            }
            other => panic!("Expected error, got {:?}", other),
        }
        assert_eq!(peer.connections(), 1);
    }

    #[tokio::test]
    async fn test_second_client_refused() {
        let peer = TestPeer::start().await.unwrap();
        let url = format!("ws://{}/ws", peer.target());

        let (_first, _) = connect_async(url.as_str()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(peer.has_client());
        assert!(connect_async(url.as_str()).await.is_err());
    }
}
