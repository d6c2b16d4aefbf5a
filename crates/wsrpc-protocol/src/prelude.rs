//! # wsrpc Protocol Prelude
//!
//! Convenient re-exports of the most commonly used protocol types.
//!
//! ```rust
//! use wsrpc_protocol::prelude::*;
//! ```

pub use crate::codec::{decode, encode};
pub use crate::envelope::{Envelope, EnvelopeKind};
pub use crate::error::{DecodeError, ErrorEnvelope};
pub use crate::events::SystemEvent;
pub use crate::methods::{NotificationMethod, RequestMethod};
pub use crate::notification::NotificationEnvelope;
pub use crate::request::{RequestEnvelope, RequestId};
pub use crate::response::ResponseEnvelope;

// Well-known error identifiers
pub use crate::error_ids::*;
