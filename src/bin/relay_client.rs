//! Chat Relay Client - Entry Point
//!
//! Minimal terminal peer: prints every line received from the relay and
//! forwards stdin lines to it. A send failure is shown to the user
//! without stopping the incoming display.

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use chat_relay::config::DEFAULT_ADDR;
use chat_relay::{ChatClient, ClientEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let addr = env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());

    // Connect failure is fatal to the session; no automatic retry
    let (mut client, mut events) = match ChatClient::connect(&addr).await {
        Ok(connected) => {
            println!("Connected to server at {addr}");
            connected
        }
        Err(e) => {
            eprintln!("{e}");
            return Err(e.into());
        }
    };

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event @ ClientEvent::Message(_)) => {
                    println!("{}", event.display_line());
                }
                Some(event @ ClientEvent::Disconnected) => {
                    println!("{}", event.display_line());
                    break;
                }
                None => break,
            },
            line = stdin.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Err(e) = client.send(line).await {
                        // Surface the failure; keep displaying incoming lines
                        println!("Error sending message: {e}");
                    }
                }
                None => break,
            }
        }
    }

    client.close().await;
    Ok(())
}
