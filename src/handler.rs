//! Per-connection handler task
//!
//! One handler task runs per registered connection: it pulls lines off
//! the socket, hands each to the broadcaster tagged as client-originated,
//! and deregisters the connection when the peer goes away or the server
//! shuts down.

use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::message::Message;
use crate::reader::{LineEvent, LineReader};
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Run the read loop for one connection
///
/// The connection is already registered; this task owns the read half and
/// the writer task's join handle. End-of-stream and read errors are both
/// normal peer departure: deregister, let the writer drain out, done.
/// Holds its handler slot (`permit`) for the lifetime of the connection.
pub(crate) async fn run(
    id: ConnectionId,
    read_half: OwnedReadHalf,
    writer: JoinHandle<()>,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
    permit: OwnedSemaphorePermit,
) {
    let _permit = permit;
    let mut reader = LineReader::new(read_half);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("shutdown signaled, closing connection {}", id);
                break;
            }
            event = reader.next() => match event {
                LineEvent::Line(line) => {
                    debug!("connection {}: {}", id, line);
                    broadcaster.broadcast(&Message::client(line));
                }
                LineEvent::Eof => {
                    debug!("connection {} closed by peer", id);
                    break;
                }
                LineEvent::Failed(e) => {
                    warn!("read from connection {} failed: {}", id, e);
                    break;
                }
            }
        }
    }

    // Idempotent: shutdown may have drained the registry already, or the
    // writer task may have removed us after a write failure.
    registry.remove(id);
    let _ = writer.await;
    info!("connection {} closed", id);
}
