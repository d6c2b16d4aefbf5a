//! Request/response correlation.
//!
//! Every outbound request gets an id from a per-connection counter and parks
//! a continuation here until the matching `res` or `err` arrives. Each
//! continuation is resolved at most once; entries dropped by a connection
//! wipe leave their [`PendingCall`] pending forever.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::trace;
use wsrpc_protocol::RequestId;

use crate::error::ClientResult;
use crate::scope::{ScopeId, ScopeRegistry};

type Continuation = oneshot::Sender<ClientResult<Value>>;

/// A continuation waiting for its reply
#[derive(Debug)]
pub struct Parked {
    method: String,
    scope: Option<ScopeId>,
    reply: Continuation,
}

impl Parked {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    /// Complete the call. Returns false if the caller stopped waiting.
    pub fn resolve(self, outcome: ClientResult<Value>) -> bool {
        self.reply.send(outcome).is_ok()
    }
}

/// Result of matching an inbound reply against the pending table
#[derive(Debug)]
pub enum Lookup {
    /// Pending and in an active scope; the caller resolves it
    Active(Parked),
    /// Pending but its scope was revoked; the entry is gone
    Silenced,
    /// No call with that id is pending
    Unknown,
}

/// Pending call table for one connection
#[derive(Debug, Default)]
pub struct Correlator {
    counter: u64,
    pending: HashMap<RequestId, Parked>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next correlation id
    pub fn next_id(&mut self) -> RequestId {
        let id = RequestId::from_counter(self.counter);
        self.counter += 1;
        id
    }

    /// Park a continuation for `id`
    pub fn register(
        &mut self,
        id: RequestId,
        method: impl Into<String>,
        scope: Option<ScopeId>,
        generation: u64,
    ) -> PendingCall {
        let (reply, receiver) = oneshot::channel();
        let parked = Parked {
            method: method.into(),
            scope,
            reply,
        };
        self.pending.insert(id.clone(), parked);
        PendingCall {
            id,
            generation,
            receiver: Some(receiver),
        }
    }

    /// Remove the entry for `id` and report whether its owner should hear
    /// about the reply
    pub fn take(&mut self, id: &RequestId, scopes: &ScopeRegistry) -> Lookup {
        match self.pending.remove(id) {
            Some(parked) if scopes.is_active(parked.scope()) => Lookup::Active(parked),
            Some(parked) => {
                trace!(id = %id, method = %parked.method, "Reply for revoked scope dropped");
                Lookup::Silenced
            }
            None => Lookup::Unknown,
        }
    }

    /// Forget a pending call without resolving it
    pub fn cancel(&mut self, id: &RequestId) -> bool {
        self.pending.remove(id).is_some()
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of calls awaiting a reply
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Abandon every pending call and restart ids at `0`
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            trace!(abandoned = self.pending.len(), "Abandoning pending calls");
        }
        self.pending.clear();
        self.counter = 0;
    }
}

/// Future for the reply to one request.
///
/// Resolves with the `result` of a `res` envelope or with
/// [`ClientError::Remote`](crate::ClientError::Remote) for an `err`
/// envelope. If the entry is abandoned (connection closed, call cancelled)
/// the future stays pending; wrap it in a timeout when that matters.
#[derive(Debug)]
#[must_use = "a PendingCall does nothing unless awaited"]
pub struct PendingCall {
    id: RequestId,
    generation: u64,
    receiver: Option<oneshot::Receiver<ClientResult<Value>>>,
}

impl PendingCall {
    /// Correlation id sent on the wire
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Connection generation the request was sent on
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Future for PendingCall {
    type Output = ClientResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Pending;
        };

        match Pin::new(receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => {
                self.receiver = None;
                Poll::Ready(outcome)
            }
            Poll::Ready(Err(_)) => {
                // Continuation dropped without a reply: never resolves
                self.receiver = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
