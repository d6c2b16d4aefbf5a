//! Configuration types for the wsrpc client

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// Client identification information
    pub client_info: ClientInfo,

    /// How a connection target is turned into an endpoint URL
    pub endpoint: EndpointConfig,

    /// Timeout configurations
    pub timeouts: TimeoutConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Client identification information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name
    pub name: String,

    /// Client version
    pub version: String,
}

/// Endpoint configuration.
///
/// The collaborator supplies `host:port`; scheme and path come from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// URL scheme (`ws` or `wss`)
    pub scheme: String,

    /// Path suffix appended to the target
    pub path: String,
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Transport handshake timeout
    #[serde(with = "duration_serde")]
    pub connect: Duration,

    /// Deadline applied by typed requests. `None` waits for the reply
    /// indefinitely.
    #[serde(with = "option_duration_serde", default)]
    pub request: Option<Duration>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive for binaries embedding the client,
    /// used when `RUST_LOG` is unset
    pub level: String,

    /// Whether to trace every inbound and outbound frame
    pub log_messages: bool,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "wsrpc-client".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            scheme: "ws".to_string(),
            path: "/ws".to_string(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_messages: false,
        }
    }
}

impl EndpointConfig {
    /// Build the endpoint URL for a `host:port` target
    pub fn url_for(&self, target: &str) -> ClientResult<Url> {
        let path = if self.path.is_empty() || self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        let raw = format!("{}://{}{}", self.scheme, target.trim_end_matches('/'), path);
        Url::parse(&raw)
            .map_err(|e| ClientError::config(format!("Invalid endpoint '{}': {}", raw, e)))
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
