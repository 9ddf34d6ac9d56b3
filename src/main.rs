//! Chat Relay Server - Entry Point
//!
//! Binds the listener, runs the relay, and broadcasts operator-typed
//! stdin lines to every connected peer until Ctrl-C.

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_relay::{ChatServer, RelayConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    // Bind address and handler cap from command line, defaults otherwise
    let mut config = RelayConfig::default();
    if let Some(addr) = env::args().nth(1) {
        config = config.with_addr(addr);
    }
    if let Some(cap) = env::args().nth(2) {
        config = config.with_max_connections(cap.parse()?);
    }

    let mut server = ChatServer::new(config);
    server.start().await?;

    // Operator-typed lines are broadcast to all peers, tagged as
    // server-authored; Ctrl-C stops the relay.
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = stdin.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let delivered = server.broadcast(line);
                    info!("broadcast to {} peer(s)", delivered);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("failed to read stdin: {}", e);
                    break;
                }
            }
        }
    }

    server.stop().await;
    Ok(())
}
