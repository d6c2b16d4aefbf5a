//! Helpers shared by the end-to-end tests

#![allow(dead_code)]

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wsrpc_client::LoggingConfig;
use wsrpc_client::prelude::*;
use wsrpc_test_peer::TestPeer;

pub const WAIT: Duration = Duration::from_secs(3);

/// Client configuration with debug logging for the client and the peer
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.logging.level = "wsrpc_client=debug,wsrpc_test_peer=debug".to_string();
    config
}

/// `RUST_LOG` wins over the configured level
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Start a peer and a WebSocket client, not yet connected
pub async fn setup() -> Result<(TestPeer, WsRpcClient)> {
    let config = test_config();
    init_tracing(&config.logging);
    let peer = TestPeer::start().await.context("failed to start test peer")?;
    let client = WsRpcClientBuilder::new().with_config(config).build()?;
    Ok((peer, client))
}

/// Start a peer and a client connected to it
pub async fn connected() -> Result<(TestPeer, WsRpcClient)> {
    let (peer, client) = setup().await?;
    client.open(&peer.target()).await?;
    wait_until(|| peer.has_client()).await?;
    Ok((peer, client))
}

/// Forward every occurrence of `event` into a channel
pub fn events(
    client: &WsRpcClient,
    event: SystemEvent,
    scope: Option<&ScopeId>,
) -> mpsc::UnboundedReceiver<SystemEventData> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.subscribe(event, scope, move |data| {
        let _ = tx.send(data.clone());
    });
    rx
}

/// Next item of a channel, failing after [`WAIT`]
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Result<T> {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .map_err(|_| anyhow!("timed out waiting for event"))?
        .ok_or_else(|| anyhow!("event channel closed"))
}

/// Poll `condition` until it holds or [`WAIT`] passes
pub async fn wait_until(condition: impl Fn() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            return Err(anyhow!("condition not met in time"));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}
