//! Relay server: accept loop and lifecycle
//!
//! `ChatServer` owns the registry, the broadcaster, and the shutdown
//! token. `start` binds the listener and spawns the accept loop; `stop`
//! cancels it, closes every live connection, and joins all handler tasks
//! so shutdown is deterministic rather than fire-and-forget.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::config::RelayConfig;
use crate::connection::Connection;
use crate::error::RelayError;
use crate::handler;
use crate::message::Message;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// The chat relay server
///
/// Lives for the process lifetime; the registry is emptied on `stop` but
/// never destroyed mid-run. `start` and `stop` are each safe to call
/// more than once.
pub struct ChatServer {
    config: RelayConfig,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
    acceptor: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl ChatServer {
    pub fn new(config: RelayConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            config,
            registry,
            broadcaster,
            shutdown: CancellationToken::new(),
            acceptor: None,
            local_addr: None,
        }
    }

    /// Bind the configured address and begin accepting connections
    ///
    /// Returns the bound address (useful when configured with port 0).
    /// A bind failure is fatal and reported to the caller. Calling
    /// `start` on a running server is a no-op returning the bound
    /// address.
    pub async fn start(&mut self) -> Result<SocketAddr, RelayError> {
        if let Some(addr) = self.local_addr {
            return Ok(addr);
        }

        let listener = TcpListener::bind(&self.config.addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: self.config.addr.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| RelayError::Bind {
            addr: self.config.addr.clone(),
            source,
        })?;

        info!(
            "relay listening on {} ({} handler slots)",
            addr, self.config.max_connections
        );

        self.shutdown = CancellationToken::new();
        self.acceptor = Some(tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.registry),
            self.broadcaster.clone(),
            self.shutdown.clone(),
            self.config.max_connections,
        )));
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Stop accepting, close all connections, and join handler tasks
    ///
    /// Calling `stop` on a stopped server is a no-op.
    pub async fn stop(&mut self) {
        let Some(acceptor) = self.acceptor.take() else {
            return;
        };
        info!("stopping relay");
        self.shutdown.cancel();
        if acceptor.await.is_err() {
            warn!("accept loop panicked during shutdown");
        }
        self.local_addr = None;
        info!("relay stopped");
    }

    /// Broadcast a server-authored line to every connected peer
    ///
    /// Returns the number of peers the line was queued for.
    pub fn broadcast(&self, text: &str) -> usize {
        self.broadcaster.broadcast(&Message::server(text))
    }

    /// Number of currently registered connections
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// The bound listen address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Shared handle to the connection registry
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}

/// Accept loop: register each connection, then launch its handler task
///
/// A handler slot is acquired before `accept`, so connections beyond the
/// cap wait in the OS backlog instead of being accepted and silently
/// queued. Transient accept errors are logged and the loop continues;
/// cancellation closes the listener and unblocks the loop.
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
    max_connections: usize,
) {
    let slots = Arc::new(Semaphore::new(max_connections));
    let mut handlers = JoinSet::new();

    loop {
        // Reap handlers that have already finished
        while handlers.try_join_next().is_some() {}

        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = Arc::clone(&slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let id = ConnectionId::new();
                    info!("connection {} accepted from {}", id, peer_addr);

                    let (conn, read_half, writer) =
                        Connection::open(id, peer_addr, stream, Arc::clone(&registry));
                    registry.add(conn);
                    handlers.spawn(handler::run(
                        id,
                        read_half,
                        writer,
                        Arc::clone(&registry),
                        broadcaster.clone(),
                        shutdown.clone(),
                        permit,
                    ));
                }
                Err(e) => {
                    warn!("{}", RelayError::Accept(e));
                }
            }
        }
    }

    // Close the listening socket before tearing down connections
    drop(listener);

    // Dropping the registry's handles closes every outbound queue, which
    // ends each writer task and half-closes its socket; handlers observe
    // the shutdown token and exit promptly.
    let live = registry.drain();
    info!("closing {} live connection(s)", live.len());
    drop(live);

    while handlers.join_next().await.is_some() {}
    info!("accept loop ended");
}
