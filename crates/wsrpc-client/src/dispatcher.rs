//! Event fan-out for system events, inbound requests and inbound notifications

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;
use wsrpc_protocol::{
    ErrorEnvelope, NotificationEnvelope, RequestEnvelope, ResponseEnvelope, SystemEvent,
};

use crate::scope::{ScopeId, ScopeRegistry};
use crate::transport::CloseInfo;

/// Callback for system events
pub type SystemCallback = Arc<dyn Fn(&SystemEventData) + Send + Sync>;

/// Callback for inbound requests of one method
pub type RequestCallback = Arc<dyn Fn(&RequestEnvelope) + Send + Sync>;

/// Callback for inbound notifications of one method
pub type NotificationCallback = Arc<dyn Fn(&NotificationEnvelope) + Send + Sync>;

/// Payload delivered with a system event
#[derive(Debug, Clone, PartialEq)]
pub enum SystemEventData {
    /// The transport handshake completed
    Opened { endpoint: String },
    /// The connection closed
    Closed(CloseInfo),
    /// The transport reported an error
    TransportError(String),
    /// Inbound request that no handler was registered for
    UnhandledRequest(RequestEnvelope),
    /// Inbound notification that no handler was registered for
    UnhandledNotification(NotificationEnvelope),
    /// Inbound response that matched no pending call
    UnhandledResponse(ResponseEnvelope),
    /// Inbound error without id, or matching no pending call
    UnhandledError(ErrorEnvelope),
    /// Valid JSON that is not a known envelope
    IncorrectMessage { value: Value, reason: String },
    /// Payload that is not JSON
    MalformedEnvelope { raw: String, reason: String },
}

impl SystemEventData {
    /// The event class this payload is delivered under
    pub fn event(&self) -> SystemEvent {
        match self {
            SystemEventData::Opened { .. } => SystemEvent::ConnectionOpened,
            SystemEventData::Closed(_) => SystemEvent::ConnectionClosed,
            SystemEventData::TransportError(_) => SystemEvent::ConnectionError,
            SystemEventData::UnhandledRequest(_) => SystemEvent::UnhandledRequest,
            SystemEventData::UnhandledNotification(_) => SystemEvent::UnhandledNotification,
            SystemEventData::UnhandledResponse(_) => SystemEvent::UnhandledResponse,
            SystemEventData::UnhandledError(_) => SystemEvent::UnhandledError,
            SystemEventData::IncorrectMessage { .. } => SystemEvent::IncorrectMessage,
            SystemEventData::MalformedEnvelope { .. } => SystemEvent::MalformedEnvelope,
        }
    }
}

/// Token identifying one registration, for fine-grained removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Where an inbound message should go
pub enum Route<C> {
    /// Registrations exist for the message class; these are the active ones
    Handlers(Vec<C>),
    /// Nothing was ever registered for the message class
    Unhandled,
}

struct Registration<C> {
    id: HandlerId,
    scope: Option<ScopeId>,
    callback: C,
}

/// Ordered registrations per message class
struct HandlerTable<K, C> {
    entries: HashMap<K, Vec<Registration<C>>>,
}

impl<K, C> HandlerTable<K, C>
where
    K: Eq + Hash,
    C: Clone,
{
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn push(&mut self, key: K, registration: Registration<C>) {
        self.entries.entry(key).or_default().push(registration);
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Callbacks for `key` whose scope is active, in registration order.
    /// Inactive registrations are skipped but stay in the table.
    fn active<Q>(&self, key: &Q, scopes: &ScopeRegistry) -> Vec<C>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries
            .get(key)
            .map(|registrations| {
                registrations
                    .iter()
                    .filter(|registration| scopes.is_active(registration.scope.as_ref()))
                    .map(|registration| registration.callback.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        for registrations in self.entries.values_mut() {
            if let Some(pos) = registrations.iter().position(|r| r.id == id) {
                registrations.remove(pos);
                return true;
            }
        }
        false
    }

    fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Handler tables for every fan-out message class.
///
/// The dispatcher never invokes callbacks while it is borrowed mutably:
/// lookups return cloned callbacks so the caller can release its lock first.
pub struct EventDispatcher {
    next_handler_id: u64,
    system: HandlerTable<SystemEvent, SystemCallback>,
    requests: HandlerTable<String, RequestCallback>,
    notifications: HandlerTable<String, NotificationCallback>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("system_handlers", &self.system.len())
            .field("request_handlers", &self.requests.len())
            .field("notification_handlers", &self.notifications.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            next_handler_id: 0,
            system: HandlerTable::new(),
            requests: HandlerTable::new(),
            notifications: HandlerTable::new(),
        }
    }

    fn next_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id += 1;
        id
    }

    /// Register a system event handler
    pub fn subscribe(
        &mut self,
        event: SystemEvent,
        scope: Option<ScopeId>,
        callback: SystemCallback,
    ) -> HandlerId {
        let id = self.next_id();
        trace!(event = %event, handler = id.0, "Subscribed to system event");
        self.system.push(event, Registration { id, scope, callback });
        id
    }

    /// Register a handler for inbound requests of `method`
    pub fn subscribe_request(
        &mut self,
        method: impl Into<String>,
        scope: Option<ScopeId>,
        callback: RequestCallback,
    ) -> HandlerId {
        let id = self.next_id();
        self.requests
            .push(method.into(), Registration { id, scope, callback });
        id
    }

    /// Register a handler for inbound notifications of `method`
    pub fn subscribe_notification(
        &mut self,
        method: impl Into<String>,
        scope: Option<ScopeId>,
        callback: NotificationCallback,
    ) -> HandlerId {
        let id = self.next_id();
        self.notifications
            .push(method.into(), Registration { id, scope, callback });
        id
    }

    /// Remove a single registration. Returns false if it is already gone.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        self.system.remove(id) || self.requests.remove(id) || self.notifications.remove(id)
    }

    /// Active handlers for a system event
    pub fn system_handlers(&self, event: SystemEvent, scopes: &ScopeRegistry) -> Vec<SystemCallback> {
        self.system.active(&event, scopes)
    }

    /// Route an inbound request by method name
    pub fn route_request(&self, method: &str, scopes: &ScopeRegistry) -> Route<RequestCallback> {
        if self.requests.contains_key(method) {
            Route::Handlers(self.requests.active(method, scopes))
        } else {
            Route::Unhandled
        }
    }

    /// Route an inbound notification by method name
    pub fn route_notification(
        &self,
        method: &str,
        scopes: &ScopeRegistry,
    ) -> Route<NotificationCallback> {
        if self.notifications.contains_key(method) {
            Route::Handlers(self.notifications.active(method, scopes))
        } else {
            Route::Unhandled
        }
    }

    /// Total number of registrations, including ones with revoked scopes
    pub fn handler_count(&self) -> usize {
        self.system.len() + self.requests.len() + self.notifications.len()
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.system.clear();
        self.requests.clear();
        self.notifications.clear();
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoke `handlers` in order with `data`. Callers collect the handlers with
/// [`EventDispatcher::system_handlers`] and release their lock first.
pub fn deliver(handlers: &[SystemCallback], data: &SystemEventData) -> usize {
    for handler in handlers {
        handler(data);
    }
    handlers.len()
}
