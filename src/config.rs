//! Relay configuration
//!
//! Bind address and handler capacity, with the defaults the binaries fall
//! back to when no arguments are given.

/// Default bind/connect address
pub const DEFAULT_ADDR: &str = "127.0.0.1:12345";

/// Default number of simultaneous handler slots
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Server configuration
///
/// `max_connections` bounds accepted connections: the accept loop takes a
/// slot before accepting, so excess connections wait in the OS backlog
/// rather than being accepted and silently queued.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind (server) or connect to (client)
    pub addr: String,
    /// Maximum number of simultaneously handled connections
    pub max_connections: usize,
}

impl RelayConfig {
    pub fn new(addr: impl Into<String>, max_connections: usize) -> Self {
        Self {
            addr: addr.into(),
            max_connections,
        }
    }

    /// Replace the bind address
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Replace the handler capacity
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}
