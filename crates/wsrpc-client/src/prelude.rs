//! # wsrpc Client Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! and traits from the wsrpc client library.
//!
//! ```rust
//! use wsrpc_client::prelude::*;
//! ```

// Core client types
pub use crate::client::{WsRpcClient, WsRpcClientBuilder};
pub use crate::config::{ClientConfig, TimeoutConfig};
pub use crate::connection::{ConnectionState, ConnectionStatus};
pub use crate::correlator::PendingCall;
pub use crate::dispatcher::{HandlerId, SystemEventData};
pub use crate::error::{ClientError, ClientResult};
pub use crate::scope::ScopeId;

// Transport types
pub use crate::transport::{CloseInfo, Transport, TransportType};

// Re-export protocol types for convenience
pub use wsrpc_protocol::prelude::*;

// Standard library types commonly used with wsrpc
pub use std::time::Duration;
