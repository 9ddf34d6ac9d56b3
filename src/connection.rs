//! Connection struct and writer task
//!
//! A `Connection` is the registry-facing handle for one accepted socket:
//! its identity, peer address, and the outbound message channel. The
//! socket's write half is owned by a dedicated writer task so that no
//! registry lock is ever held across socket I/O, and writes from many
//! broadcasts stay FIFO per stream.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Outbound queue depth per connection
///
/// A peer that falls further behind than this starts losing broadcast
/// messages (best-effort delivery).
const OUTBOUND_BUFFER: usize = 32;

/// One registered peer connection
///
/// Cloneable handle; the underlying socket write half lives in the writer
/// task and closes when every handle (and its queue) is gone.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Remote peer address
    pub peer_addr: SocketAddr,
    /// Outbound line queue consumed by the writer task
    sender: mpsc::Sender<String>,
}

impl Connection {
    pub fn new(id: ConnectionId, peer_addr: SocketAddr, sender: mpsc::Sender<String>) -> Self {
        Self {
            id,
            peer_addr,
            sender,
        }
    }

    /// Split an accepted stream and start its writer task
    ///
    /// Returns the registry handle, the read half for the handler task,
    /// and the writer task's join handle.
    pub(crate) fn open(
        id: ConnectionId,
        peer_addr: SocketAddr,
        stream: TcpStream,
        registry: Arc<Registry>,
    ) -> (Self, OwnedReadHalf, JoinHandle<()>) {
        let (read_half, write_half) = stream.into_split();
        let (sender, receiver) = mpsc::channel(OUTBOUND_BUFFER);
        let writer = tokio::spawn(write_loop(write_half, receiver, registry, id));
        (Self::new(id, peer_addr, sender), read_half, writer)
    }

    /// Queue one line for delivery to this peer
    ///
    /// Does not wait for the socket write. `Closed` means the writer task
    /// has exited (the peer is gone); `QueueFull` means this message is
    /// dropped but the peer stays registered.
    pub fn send(&self, text: &str) -> Result<(), SendError> {
        self.sender
            .try_send(text.to_owned())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Closed(_) => SendError::Closed,
                mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            })
    }
}

/// Writer task: drains the outbound queue onto the socket
///
/// Appends the line terminator to each message. A socket write failure
/// deregisters this connection and ends the task; the queue closing
/// (all `Connection` handles dropped) ends it cleanly and half-closes
/// the socket so the peer observes EOF.
pub(crate) async fn write_loop<W>(
    mut writer: W,
    mut receiver: mpsc::Receiver<String>,
    registry: Arc<Registry>,
    id: ConnectionId,
) where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(line) = receiver.recv().await {
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!("write to connection {} failed: {}", id, e);
            registry.remove(id);
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("writer task ended for {}", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_send_queues_line() {
        let (tx, mut rx) = mpsc::channel(4);
        let conn = Connection::new(ConnectionId::new(), test_addr(), tx);

        conn.send("hello").unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_send_after_writer_gone_is_closed() {
        let (tx, rx) = mpsc::channel(4);
        let conn = Connection::new(ConnectionId::new(), test_addr(), tx);

        drop(rx);
        assert!(matches!(conn.send("hello"), Err(SendError::Closed)));
    }

    #[tokio::test]
    async fn test_send_full_queue_drops_message() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(ConnectionId::new(), test_addr(), tx);

        conn.send("first").unwrap();
        assert!(matches!(conn.send("second"), Err(SendError::QueueFull)));
    }

    #[tokio::test]
    async fn test_write_loop_appends_terminator() {
        let (local, mut remote) = tokio::io::duplex(256);
        let (tx, rx) = mpsc::channel(4);
        let registry = Arc::new(Registry::new());
        let id = ConnectionId::new();

        let writer = tokio::spawn(write_loop(local, rx, registry, id));

        tx.send("one".to_string()).await.unwrap();
        tx.send("two".to_string()).await.unwrap();
        drop(tx);
        writer.await.unwrap();

        let mut out = String::new();
        remote.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_write_failure_deregisters() {
        let (local, remote) = tokio::io::duplex(256);
        let (tx, rx) = mpsc::channel(4);
        let registry = Arc::new(Registry::new());
        let id = ConnectionId::new();
        let conn = Connection::new(id, test_addr(), tx.clone());
        registry.add(conn);
        assert_eq!(registry.len(), 1);

        // Peer goes away before we write
        drop(remote);
        let writer = tokio::spawn(write_loop(local, rx, registry.clone(), id));

        tx.send("lost".to_string()).await.unwrap();
        drop(tx);
        writer.await.unwrap();

        assert_eq!(registry.len(), 0);
    }
}
