//! Main wsrpc client implementation

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use url::Url;
use wsrpc_protocol::{
    DecodeError, Envelope, ErrorEnvelope, NotificationEnvelope, NotificationMethod,
    RequestEnvelope, RequestId, RequestMethod, ResponseEnvelope, SystemEvent, decode, encode,
};

use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionState, ConnectionStatus};
use crate::correlator::{Correlator, Lookup, PendingCall};
use crate::dispatcher::{EventDispatcher, HandlerId, Route, SystemEventData, deliver};
use crate::error::{ClientError, ClientResult, TransportError};
use crate::scope::{ScopeId, ScopeRegistry};
use crate::transport::{BoxedTransport, CloseInfo, TransportChannel, TransportEvent};

/// Everything guarded by the client lock
#[derive(Debug, Default)]
struct ClientState {
    scopes: ScopeRegistry,
    dispatcher: EventDispatcher,
    correlator: Correlator,
    status: ConnectionState,
    connection: Option<Connection>,
    /// Bumped on every open attempt and on `clear`
    generation: u64,
}

struct Inner {
    transport: BoxedTransport,
    config: ClientConfig,
    state: Mutex<ClientState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(connection) = self.state.get_mut().connection.take() {
            debug!("Client dropped with a live connection");
            connection.release();
        }
    }
}

/// Bidirectional request/notification client over one persistent connection.
///
/// Cloning is cheap and every clone drives the same connection, scopes and
/// handler tables. Callbacks run on the connection's driver task without the
/// client lock held, so they may call back into the client.
#[derive(Clone)]
pub struct WsRpcClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WsRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("WsRpcClient")
            .field("transport", &self.inner.transport.transport_type())
            .field("status", &state.status)
            .field("generation", &state.generation)
            .finish()
    }
}

impl WsRpcClient {
    /// Create a new client with the given transport
    pub fn new(transport: BoxedTransport, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: Mutex::new(ClientState::default()),
            }),
        }
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ----- connection lifecycle -----

    /// Connect to `target` (`host:port`).
    ///
    /// An existing connection is closed first, with its close event. On
    /// failure `connection-error` and then `connection-closed` fire and the
    /// transport error is returned.
    pub async fn open(&self, target: &str) -> ClientResult<()> {
        let endpoint = self.inner.config.endpoint.url_for(target)?;

        self.close();

        let generation = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.status = ConnectionState::Connecting;
            state.correlator.reset();
            state.generation
        };

        info!(endpoint = %endpoint, generation, "Opening connection");

        let connect = timeout(
            self.inner.config.timeouts.connect,
            self.inner.transport.connect(&endpoint),
        )
        .await
        .unwrap_or_else(|_| Err(TransportError::ConnectTimeout.into()));

        match connect {
            Ok(channel) => self.establish(generation, endpoint, channel),
            Err(e) => {
                self.fail_open(generation, &e);
                Err(e)
            }
        }
    }

    fn establish(
        &self,
        generation: u64,
        endpoint: Url,
        channel: TransportChannel,
    ) -> ClientResult<()> {
        let TransportChannel { outbound, inbound } = channel;

        {
            let mut state = self.inner.state.lock();
            if state.generation != generation || state.status != ConnectionState::Connecting {
                debug!(generation, "Connection attempt superseded");
                return Err(TransportError::Closed.into());
            }
            state.connection = Some(Connection::new(
                generation,
                endpoint.clone(),
                outbound,
                self.inner.config.logging.log_messages,
            ));
            state.status = ConnectionState::Open;
        }

        info!(endpoint = %endpoint, generation, "Connection open");
        self.emit(SystemEventData::Opened {
            endpoint: endpoint.to_string(),
        });

        // Armed only after the open event so it is observed first
        let driver = tokio::spawn(drive(Arc::downgrade(&self.inner), generation, inbound));
        let mut state = self.inner.state.lock();
        match state.connection.as_mut() {
            Some(connection) if connection.generation() == generation => {
                connection.attach_driver(driver);
            }
            _ => driver.abort(),
        }
        Ok(())
    }

    fn fail_open(&self, generation: u64, error: &ClientError) {
        {
            let mut state = self.inner.state.lock();
            if state.generation != generation || state.status != ConnectionState::Connecting {
                return;
            }
            state.status = ConnectionState::Closed;
        }

        warn!(error = %error, generation, "Failed to open connection");
        self.emit(SystemEventData::TransportError(error.to_string()));
        self.emit(SystemEventData::Closed(CloseInfo::remote(None, error.to_string())));

        let mut state = self.inner.state.lock();
        if state.generation == generation {
            state.dispatcher.clear();
            state.correlator.reset();
        }
    }

    /// Close the connection as if the transport had closed it.
    ///
    /// `connection-closed` fires with [`CloseInfo::manual`], then every
    /// handler table and pending call is wiped. Scopes survive. No-op when
    /// already closed.
    pub fn close(&self) {
        let generation = {
            let state = self.inner.state.lock();
            if state.status == ConnectionState::Closed {
                return;
            }
            state.generation
        };
        info!(generation, "Closing connection");
        self.teardown(generation, CloseInfo::manual());
    }

    /// Full teardown without a close event. Also revokes every scope.
    pub fn clear(&self) {
        let connection = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.status = ConnectionState::Closed;
            state.dispatcher.clear();
            state.correlator.reset();
            state.scopes.clear();
            state.connection.take()
        };
        debug!("Client state cleared");
        if let Some(connection) = connection {
            connection.release();
        }
    }

    /// Close sequence shared by local and remote closes: detach, notify,
    /// wipe, release. Runs at most once per generation.
    fn teardown(&self, generation: u64, info: CloseInfo) {
        let connection = {
            let mut state = self.inner.state.lock();
            if state.generation != generation || state.status == ConnectionState::Closed {
                return;
            }
            state.status = ConnectionState::Closed;
            state.connection.take()
        };

        debug!(generation, local = info.local, reason = %info.reason, "Connection closed");
        self.emit(SystemEventData::Closed(info));

        {
            let mut state = self.inner.state.lock();
            if state.generation == generation {
                state.dispatcher.clear();
                state.correlator.reset();
            }
        }

        if let Some(connection) = connection {
            connection.release();
        }
    }

    /// Check if the connection is open
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().status
    }

    /// Get client connection status
    pub fn connection_status(&self) -> ConnectionStatus {
        let state = self.inner.state.lock();
        ConnectionStatus {
            state: state.status,
            transport_type: self.inner.transport.transport_type(),
            endpoint: state
                .connection
                .as_ref()
                .map(|connection| connection.endpoint().to_string()),
            pending_calls: state.correlator.len(),
            generation: state.generation,
        }
    }

    // ----- scopes -----

    /// Issue a fresh active scope `prefix-N`
    pub fn new_scope(&self, prefix: &str) -> ScopeId {
        self.inner.state.lock().scopes.new_scope(prefix)
    }

    /// Silence every handler and pending call registered under `scope`
    pub fn revoke_scope(&self, scope: &ScopeId) {
        self.inner.state.lock().scopes.revoke(scope);
    }

    pub fn is_scope_active(&self, scope: Option<&ScopeId>) -> bool {
        self.inner.state.lock().scopes.is_active(scope)
    }

    // ----- subscriptions -----

    /// Subscribe to a system event
    pub fn subscribe<F>(&self, event: SystemEvent, scope: Option<&ScopeId>, callback: F) -> HandlerId
    where
        F: Fn(&SystemEventData) + Send + Sync + 'static,
    {
        self.inner
            .state
            .lock()
            .dispatcher
            .subscribe(event, scope.cloned(), Arc::new(callback))
    }

    /// Handle inbound requests for `method`. Reply with [`reply_to`](Self::reply_to).
    pub fn subscribe_request<F>(&self, method: &str, scope: Option<&ScopeId>, callback: F) -> HandlerId
    where
        F: Fn(&RequestEnvelope) + Send + Sync + 'static,
    {
        self.inner
            .state
            .lock()
            .dispatcher
            .subscribe_request(method, scope.cloned(), Arc::new(callback))
    }

    /// Handle inbound notifications for `method`
    pub fn subscribe_notification<F>(
        &self,
        method: &str,
        scope: Option<&ScopeId>,
        callback: F,
    ) -> HandlerId
    where
        F: Fn(&NotificationEnvelope) + Send + Sync + 'static,
    {
        self.inner
            .state
            .lock()
            .dispatcher
            .subscribe_notification(method, scope.cloned(), Arc::new(callback))
    }

    /// Remove one registration
    pub fn unsubscribe(&self, handler: HandlerId) -> bool {
        self.inner.state.lock().dispatcher.unsubscribe(handler)
    }

    // ----- outbound -----

    /// Send a request and return a future for its reply.
    ///
    /// If the connection closes before the reply arrives the future never
    /// resolves; see [`call_with_timeout`](Self::call_with_timeout).
    pub fn call(
        &self,
        method: &str,
        params: Value,
        scope: Option<&ScopeId>,
    ) -> ClientResult<PendingCall> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let Some(connection) = state.connection.as_ref() else {
            return Err(ClientError::NotConnected);
        };

        let id = state.correlator.next_id();
        let frame = encode(&Envelope::Request(RequestEnvelope::new(
            id.clone(),
            method,
            params,
        )));
        let pending =
            state
                .correlator
                .register(id.clone(), method, scope.cloned(), connection.generation());

        if let Err(e) = connection.send(frame) {
            state.correlator.cancel(&id);
            return Err(e);
        }

        debug!(id = %id, method = %method, "Request sent");
        Ok(pending)
    }

    /// Send a request and wait at most `deadline` for the reply
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        scope: Option<&ScopeId>,
        deadline: Duration,
    ) -> ClientResult<Value> {
        let pending = self.call(method, params, scope)?;
        let id = pending.id().clone();
        let generation = pending.generation();

        match timeout(deadline, pending).await {
            Ok(outcome) => outcome,
            Err(_) => {
                {
                    let mut state = self.inner.state.lock();
                    if state.generation == generation {
                        state.correlator.cancel(&id);
                    }
                }
                warn!(id = %id, method = %method, "Request timed out");
                Err(ClientError::Timeout { id })
            }
        }
    }

    /// Forget a pending call. Its future never resolves afterwards.
    pub fn cancel(&self, id: &RequestId) -> bool {
        self.inner.state.lock().correlator.cancel(id)
    }

    /// Typed request. Applies `timeouts.request` when configured.
    pub async fn request<P, R>(
        &self,
        method: &RequestMethod<P, R>,
        params: &P,
        scope: Option<&ScopeId>,
    ) -> ClientResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let result = match self.inner.config.timeouts.request {
            Some(deadline) => {
                self.call_with_timeout(method.name(), params, scope, deadline)
                    .await?
            }
            None => self.call(method.name(), params, scope)?.await?,
        };
        Ok(serde_json::from_value(result)?)
    }

    /// Send a notification
    pub fn notify(&self, method: &str, params: Value) -> ClientResult<()> {
        self.send(Envelope::Notification(NotificationEnvelope::new(
            method, params,
        )))
    }

    /// Typed notification
    pub fn notify_method<P: Serialize>(
        &self,
        method: &NotificationMethod<P>,
        params: &P,
    ) -> ClientResult<()> {
        self.notify(method.name(), serde_json::to_value(params)?)
    }

    /// Answer an inbound request
    pub fn reply_to(&self, id: &RequestId, result: Value) -> ClientResult<()> {
        self.send(Envelope::Response(ResponseEnvelope::new(id.clone(), result)))
    }

    /// Reject an inbound request
    pub fn reply_error_to(
        &self,
        id: &RequestId,
        eid: impl Into<String>,
        message: impl Into<String>,
    ) -> ClientResult<()> {
        self.send(Envelope::Error(ErrorEnvelope::for_request(
            id.clone(),
            eid,
            message,
        )))
    }

    /// Typed answer to an inbound request
    pub fn respond<P, R: Serialize>(
        &self,
        _method: &RequestMethod<P, R>,
        id: &RequestId,
        result: &R,
    ) -> ClientResult<()> {
        self.reply_to(id, serde_json::to_value(result)?)
    }

    fn send(&self, envelope: Envelope) -> ClientResult<()> {
        let state = self.inner.state.lock();
        let connection = state.connection.as_ref().ok_or(ClientError::NotConnected)?;
        trace!(kind = %envelope.kind(), method = ?envelope.method(), "Sending");
        connection.send(encode(&envelope))
    }

    // ----- inbound -----

    fn is_current(&self, generation: u64) -> bool {
        let state = self.inner.state.lock();
        state.generation == generation && state.status == ConnectionState::Open
    }

    fn emit(&self, data: SystemEventData) {
        let handlers = {
            let state = self.inner.state.lock();
            state.dispatcher.system_handlers(data.event(), &state.scopes)
        };
        trace!(event = %data.event(), handlers = handlers.len(), "Dispatching system event");
        deliver(&handlers, &data);
    }

    fn handle_frame(&self, frame: &str) {
        if self.inner.config.logging.log_messages {
            trace!(frame = %frame, "Inbound frame");
        }

        match decode(frame) {
            Ok(envelope) => self.route(envelope),
            Err(DecodeError::Malformed { source }) => {
                warn!(error = %source, "Dropping malformed frame");
                self.emit(SystemEventData::MalformedEnvelope {
                    raw: frame.to_string(),
                    reason: source.to_string(),
                });
            }
            Err(DecodeError::Incorrect { value, reason }) => {
                warn!(reason = %reason, "Received incorrect message");
                self.emit(SystemEventData::IncorrectMessage { value, reason });
            }
        }
    }

    fn route(&self, envelope: Envelope) {
        match envelope {
            Envelope::Request(request) => {
                let route = {
                    let state = self.inner.state.lock();
                    state.dispatcher.route_request(&request.method, &state.scopes)
                };
                match route {
                    Route::Handlers(handlers) => {
                        for handler in handlers {
                            handler(&request);
                        }
                    }
                    Route::Unhandled => {
                        debug!(id = %request.id, method = %request.method, "Unhandled request");
                        self.emit(SystemEventData::UnhandledRequest(request));
                    }
                }
            }
            Envelope::Notification(notification) => {
                let route = {
                    let state = self.inner.state.lock();
                    state
                        .dispatcher
                        .route_notification(&notification.method, &state.scopes)
                };
                match route {
                    Route::Handlers(handlers) => {
                        for handler in handlers {
                            handler(&notification);
                        }
                    }
                    Route::Unhandled => {
                        debug!(method = %notification.method, "Unhandled notification");
                        self.emit(SystemEventData::UnhandledNotification(notification));
                    }
                }
            }
            Envelope::Response(response) => match self.take_pending(&response.id) {
                Lookup::Active(parked) => {
                    parked.resolve(Ok(response.result));
                }
                Lookup::Silenced => {}
                Lookup::Unknown => {
                    debug!(id = %response.id, "Response for unknown request");
                    self.emit(SystemEventData::UnhandledResponse(response));
                }
            },
            Envelope::Error(error) => {
                let lookup = match error.id.as_ref() {
                    Some(id) => self.take_pending(id),
                    None => Lookup::Unknown,
                };
                match lookup {
                    Lookup::Active(parked) => {
                        parked.resolve(Err(ClientError::Remote(error)));
                    }
                    Lookup::Silenced => {}
                    Lookup::Unknown => {
                        debug!(id = ?error.id, eid = %error.eid, "Unhandled error");
                        self.emit(SystemEventData::UnhandledError(error));
                    }
                }
            }
        }
    }

    fn take_pending(&self, id: &RequestId) -> Lookup {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.correlator.take(id, &state.scopes)
    }
}

/// Inbound driver: one per connection, processes transport events in order
async fn drive(
    inner: Weak<Inner>,
    generation: u64,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = inbound.recv().await {
        let Some(strong) = inner.upgrade() else {
            return;
        };
        let client = WsRpcClient { inner: strong };
        if !client.is_current(generation) {
            return;
        }

        match event {
            TransportEvent::Message(frame) => client.handle_frame(&frame),
            TransportEvent::Error(message) => {
                warn!(error = %message, generation, "Transport error");
                client.emit(SystemEventData::TransportError(message));
            }
            TransportEvent::Closed(info) => {
                client.teardown(generation, info);
                return;
            }
        }
    }

    if let Some(strong) = inner.upgrade() {
        WsRpcClient { inner: strong }.teardown(generation, CloseInfo::remote(None, "transport ended"));
    }
}

/// Builder for creating wsrpc clients
pub struct WsRpcClientBuilder {
    transport: Option<BoxedTransport>,
    config: Option<ClientConfig>,
}

impl WsRpcClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self {
            transport: None,
            config: None,
        }
    }

    /// Set transport
    pub fn with_transport(mut self, transport: BoxedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the endpoint path appended to the target
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.config.get_or_insert_with(ClientConfig::default).endpoint.path = path.into();
        self
    }

    /// Build the client. Defaults to the WebSocket transport.
    pub fn build(self) -> ClientResult<WsRpcClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let config = self.config.unwrap_or_default();

        Ok(WsRpcClient::new(transport, config))
    }
}

impl Default for WsRpcClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "websocket")]
fn default_transport() -> ClientResult<BoxedTransport> {
    Ok(Box::new(crate::transport::WebSocketTransport::new()))
}

#[cfg(not(feature = "websocket"))]
fn default_transport() -> ClientResult<BoxedTransport> {
    Err(ClientError::config(
        "No transport set and WebSocket support is disabled",
    ))
}
