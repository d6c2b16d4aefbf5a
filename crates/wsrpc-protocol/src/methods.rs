//! Typed method descriptors.
//!
//! A descriptor pairs a wire method name with the Rust types of its
//! parameters and result, so that call sites cannot mix up payload shapes.
//!
//! ```rust
//! use wsrpc_protocol::methods::{self, RequestMethod};
//!
//! const LIST_FILES: RequestMethod<String, Vec<String>> = RequestMethod::new("listFiles");
//! assert_eq!(LIST_FILES.name(), "listFiles");
//! assert_eq!(methods::PING.name(), "ping");
//! ```

use std::fmt;
use std::marker::PhantomData;

/// A request method taking `P` and answering with `R`
pub struct RequestMethod<P, R> {
    name: &'static str,
    _types: PhantomData<fn(P) -> R>,
}

impl<P, R> RequestMethod<P, R> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<P, R> Clone for RequestMethod<P, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, R> Copy for RequestMethod<P, R> {}

impl<P, R> fmt::Debug for RequestMethod<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestMethod").field(&self.name).finish()
    }
}

/// A notification method carrying `P`
pub struct NotificationMethod<P> {
    name: &'static str,
    _types: PhantomData<fn(P)>,
}

impl<P> NotificationMethod<P> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<P> Clone for NotificationMethod<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for NotificationMethod<P> {}

impl<P> fmt::Debug for NotificationMethod<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NotificationMethod").field(&self.name).finish()
    }
}

/// Liveness check, answered with `"pong"`
pub const PING: RequestMethod<(), String> = RequestMethod::new("ping");

/// Answered with the text that was sent
pub const ECHO: RequestMethod<String, String> = RequestMethod::new("echo");

/// Asks the peer to stop, answered with `"ok"` before it goes away
pub const SHUTDOWN: RequestMethod<(), String> = RequestMethod::new("shutdown");

/// Asks the peer to send an `echo` request carrying the text back to us
pub const ASK_ME: NotificationMethod<String> = NotificationMethod::new("askMe");
