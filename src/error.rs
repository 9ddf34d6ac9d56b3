//! Error types for the chat relay
//!
//! Defines the relay-level error taxonomy and connection send errors.
//! Uses thiserror for ergonomic error definitions.
//!
//! Per-connection failures (read EOF, read error, write error) are
//! contained at the connection boundary: they trigger deregistration of
//! that one connection and never propagate into other connections'
//! handling.

use std::io;

use thiserror::Error;

/// Relay-level errors
///
/// `Bind` and `Connect` are fatal to the server/client session that hit
/// them. `Accept` is transient; the accept loop logs it and continues.
/// `Write` is surfaced to the client-side caller of `send` without
/// terminating the read loop.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Could not bind the listening socket (fatal, server cannot start)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A single accept call failed (transient, accept loop continues)
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// Could not connect to the server (fatal to the client session)
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A socket write failed (per-peer, reported to the writer)
    #[error("failed to write to connection: {0}")]
    Write(#[source] io::Error),
}

/// Connection send errors
///
/// Occurs when queueing a message onto a connection's outbound channel.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection's writer task has exited (peer gone)
    #[error("connection closed")]
    Closed,

    /// The outbound queue is full; the message is dropped (best-effort)
    #[error("outbound queue full")]
    QueueFull,
}
