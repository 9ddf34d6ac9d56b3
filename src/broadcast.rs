//! Broadcast fan-out
//!
//! Delivers one message to every registered connection, including the
//! originating peer (the relay mirrors messages back to their sender;
//! preserved deliberately since changing it would alter the observable
//! protocol). Failed peers are pruned after the full pass.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::SendError;
use crate::message::Message;
use crate::registry::Registry;

/// Fans messages out over a registry snapshot
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Queue `message` for every registered connection
    ///
    /// Iterates a point-in-time snapshot, so a peer registered or removed
    /// mid-broadcast is simply absent or present as of the snapshot. A
    /// closed peer is marked and removed exactly once after the pass; a
    /// full outbound queue drops the message for that one peer only.
    /// Returns the number of peers the message was queued for.
    pub fn broadcast(&self, message: &Message) -> usize {
        let peers = self.registry.snapshot();
        debug!("broadcasting to {} peer(s): {}", peers.len(), message);

        let mut delivered = 0;
        let mut failed = Vec::new();
        for conn in &peers {
            match conn.send(message.text()) {
                Ok(()) => delivered += 1,
                Err(SendError::QueueFull) => {
                    warn!("outbound queue full for {}, dropping message", conn.id);
                }
                Err(SendError::Closed) => failed.push(conn.id),
            }
        }

        for id in failed {
            if self.registry.remove(id) {
                debug!("pruned dead connection {}", id);
            }
        }
        delivered
    }
}
