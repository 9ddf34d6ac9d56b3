//! Line-Oriented TCP Chat Relay Library
//!
//! A minimal chat relay built on tokio: the server accepts concurrent
//! line-oriented socket connections and broadcasts each received line to
//! every connected peer (including the sender), and the client connects,
//! sends lines, and surfaces received lines as display events.
//!
//! # Features
//! - Newline-delimited UTF-8 wire protocol, no framing
//! - Concurrent connection handling with a configurable handler cap
//! - Broadcast fan-out with per-peer failure isolation
//! - Deterministic shutdown: stop closes the listener, every connection,
//!   and joins all handler tasks
//! - Symmetric client role with independent read and write paths
//!
//! # Architecture
//! The `Registry` is the single piece of shared mutable state: a mutex
//! over the live connection set, exposing add/remove/snapshot so no lock
//! is ever held across socket I/O. Each connection gets two tasks: a
//! handler task reading lines and a writer task draining the outbound
//! queue. Delivery is best-effort, at-most-once, FIFO per stream.
//!
//! # Example
//! ```ignore
//! use chat_relay::{ChatServer, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = ChatServer::new(RelayConfig::default());
//!     let addr = server.start().await.unwrap();
//!     println!("relay on {addr}");
//!     tokio::signal::ctrl_c().await.unwrap();
//!     server.stop().await;
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod message;
pub mod reader;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use broadcast::Broadcaster;
pub use client::{ChatClient, ClientEvent};
pub use config::RelayConfig;
pub use connection::Connection;
pub use error::{RelayError, SendError};
pub use message::{Message, Origin};
pub use reader::{LineEvent, LineReader};
pub use registry::Registry;
pub use server::ChatServer;
pub use types::ConnectionId;
