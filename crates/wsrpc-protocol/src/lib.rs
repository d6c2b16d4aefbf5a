//! # wsrpc Protocol
//!
//! Transport-agnostic message types for the wsrpc protocol: a small,
//! bidirectional request/notification protocol carried as JSON text frames
//! over one persistent connection.
//!
//! ## Envelopes
//! Every frame is one of four envelope kinds, discriminated by the `type` field:
//!
//! | `type` | kind | fields |
//! |--------|------|--------|
//! | `req`  | [`RequestEnvelope`] | `id`, `method`, `params` |
//! | `not`  | [`NotificationEnvelope`] | `method`, `params` |
//! | `res`  | [`ResponseEnvelope`] | `id`, `result` |
//! | `err`  | [`ErrorEnvelope`] | `id?`, `eid`, `message` |
//!
//! ## Features
//! - Closed [`Envelope`] enum, matched exhaustively by consumers
//! - [`codec`] that separates malformed payloads from unknown envelope kinds
//! - Typed method descriptors ([`RequestMethod`], [`NotificationMethod`])
//! - The system event names consumers subscribe to ([`SystemEvent`])

pub mod codec;
pub mod envelope;
pub mod error;
pub mod events;
pub mod methods;
pub mod notification;
pub mod prelude;
pub mod request;
pub mod response;

// Re-export main types
pub use codec::{decode, encode};
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{DecodeError, ErrorEnvelope};
pub use events::SystemEvent;
pub use methods::{NotificationMethod, RequestMethod};
pub use notification::NotificationEnvelope;
pub use request::{RequestEnvelope, RequestId};
pub use response::ResponseEnvelope;

/// Well-known error identifiers carried in the `eid` field of error envelopes
pub mod error_ids {
    /// The peer could not decode the frame it received
    pub const INCORRECT_INPUT: &str = "IncorrectInput";
    /// The peer has no handler for the requested method
    pub const METHOD_NOT_FOUND: &str = "MethodNotFound";
    /// The handler failed while processing the request
    pub const INTERNAL_ERROR: &str = "InternalError";
}
