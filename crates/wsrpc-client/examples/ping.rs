//! Connects to a wsrpc peer, pings it and echoes a message.
//!
//! ```text
//! cargo run -p wsrpc-client --example ping -- 127.0.0.1:21012
//! ```

use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use wsrpc_client::prelude::*;
use wsrpc_protocol::methods::{ASK_ME, ECHO, PING};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::default();
    config.logging.level = "wsrpc_client=debug".to_string();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:21012".to_string());

    let client = WsRpcClientBuilder::new().with_config(config).build()?;

    client.subscribe(SystemEvent::ConnectionClosed, None, |data| {
        println!("Connection closed: {:?}", data);
    });

    // The peer answers `askMe` by sending us an `echo` request
    let responder = client.clone();
    client.subscribe_request(ECHO.name(), None, move |request| {
        let text: String = request.params_as().unwrap_or_default();
        println!("Peer asked us to echo {:?}", text);
        if let Err(e) = responder.respond(&ECHO, &request.id, &text) {
            eprintln!("Failed to answer echo: {}", e);
        }
    });

    client.open(&target).await?;

    let pong = client.request(&PING, &(), None).await?;
    println!("ping -> {}", pong);

    let echoed = client
        .request(&ECHO, &"hello from wsrpc".to_string(), None)
        .await?;
    println!("echo -> {}", echoed);

    client.notify_method(&ASK_ME, &"are you there?".to_string())?;
    sleep(Duration::from_millis(200)).await;

    client.close();
    Ok(())
}
