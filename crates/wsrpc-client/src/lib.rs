//! # wsrpc Client Library
//!
//! A bidirectional request/notification dispatcher over one persistent
//! WebSocket. One side issues correlated requests and awaits their replies;
//! either side can send notifications and unsolicited requests. Independent
//! consumers subscribe through scopes and can be silenced as a group.
//!
//! ## Features
//!
//! - **Correlated calls**: [`WsRpcClient::call`] returns a [`PendingCall`] future
//! - **Fan-out**: system events, inbound requests and notifications reach every active subscriber in registration order
//! - **Scopes**: revoke a [`ScopeId`] to silence all of its handlers and pending calls
//! - **Transports**: WebSocket via `tokio-tungstenite`, plus an in-process [`MemoryTransport`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsrpc_client::prelude::*;
//! use wsrpc_protocol::methods::PING;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WsRpcClientBuilder::new().build()?;
//!
//!     client.subscribe(SystemEvent::ConnectionClosed, None, |data| {
//!         println!("closed: {:?}", data);
//!     });
//!
//!     client.open("127.0.0.1:21012").await?;
//!     let pong = client.request(&PING, &(), None).await?;
//!     println!("{}", pong);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Scopes
//!
//! ```rust,no_run
//! # use wsrpc_client::prelude::*;
//! # fn demo(client: &WsRpcClient) {
//! let view = client.new_scope("projects");
//! client.subscribe_notification("progress", Some(&view), |n| {
//!     println!("progress: {}", n.params);
//! });
//!
//! // Later, when the view goes away
//! client.revoke_scope(&view);
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod prelude;
pub mod scope;
pub mod transport;

// Re-export main types
pub use client::{WsRpcClient, WsRpcClientBuilder};
pub use config::{ClientConfig, ClientInfo, EndpointConfig, LoggingConfig, TimeoutConfig};
pub use connection::{ConnectionState, ConnectionStatus};
pub use correlator::PendingCall;
pub use dispatcher::{HandlerId, SystemEventData};
pub use error::{ClientError, ClientResult, TransportError};
pub use scope::ScopeId;

// Re-export transport types
pub use transport::{CloseInfo, MemoryTransport, Transport, TransportType};

// Re-export protocol types for convenience
pub use wsrpc_protocol::*;
