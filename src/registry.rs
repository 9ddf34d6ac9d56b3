//! Connection registry
//!
//! The authoritative set of currently live server-side connections. The
//! only mutable state shared between handler tasks and the broadcaster;
//! all mutation goes through a single mutex, and iteration happens over
//! snapshots so the lock is never held across socket I/O.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::connection::Connection;
use crate::types::ConnectionId;

/// Thread-safe set of live connections keyed by identity
///
/// A connection present in the registry is assumed writable; read EOF and
/// write failures both trigger removal. `remove` is idempotent so the
/// handler task and the writer task may race to deregister the same peer.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<HashMap<ConnectionId, Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection
    pub fn add(&self, conn: Connection) {
        let mut map = self.lock();
        map.insert(conn.id, conn);
        debug!("registry size: {}", map.len());
    }

    /// Deregister a connection; removing an absent one is a no-op
    ///
    /// Returns whether the connection was present.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut map = self.lock();
        let removed = map.remove(&id).is_some();
        if removed {
            debug!("connection {} removed, registry size: {}", id, map.len());
        }
        removed
    }

    /// Point-in-time copy of the current membership for safe iteration
    pub fn snapshot(&self) -> Vec<Connection> {
        self.lock().values().cloned().collect()
    }

    /// Remove and return every connection (shutdown path)
    pub fn drain(&self) -> Vec<Connection> {
        self.lock().drain().map(|(_, conn)| conn).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn test_connection() -> Connection {
        let (tx, _rx) = mpsc::channel(4);
        Connection::new(ConnectionId::new(), "127.0.0.1:0".parse().unwrap(), tx)
    }

    #[test]
    fn test_add_and_remove() {
        let registry = Registry::new();
        let conn = test_connection();
        let id = conn.id;

        registry.add(conn);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(id));

        assert!(registry.remove(id));
        assert!(registry.is_empty());
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = Registry::new();
        assert!(!registry.remove(ConnectionId::new()));

        let conn = test_connection();
        let id = conn.id;
        registry.add(conn);
        assert!(registry.remove(id));
        // Second removal of the same id is a no-op, not an error
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_stable_copy() {
        let registry = Registry::new();
        let conn = test_connection();
        let id = conn.id;
        registry.add(conn);
        registry.add(test_connection());

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);

        // Mutating the registry does not affect the snapshot
        registry.remove(id);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = Registry::new();
        registry.add(test_connection());
        registry.add(test_connection());

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_add_remove() {
        let registry = Arc::new(Registry::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let conn = test_connection();
                let id = conn.id;
                registry.add(conn);
                let _ = registry.snapshot();
                assert!(registry.remove(id));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(registry.is_empty());
    }
}
