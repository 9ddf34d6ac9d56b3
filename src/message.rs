//! Chat message representation
//!
//! A message is one line of text plus an origin label. The label is used
//! only for display; the wire carries the bare text followed by a newline.

/// Where a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Submitted by a connected peer
    Client,
    /// Authored by the server itself
    Server,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Client => write!(f, "Client"),
            Origin::Server => write!(f, "Server"),
        }
    }
}

/// One immutable line of chat text with its origin label
///
/// The origin never affects routing; broadcast delivers every message to
/// every registered connection regardless of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    origin: Origin,
    text: String,
}

impl Message {
    /// Create a message submitted by a connected peer
    pub fn client(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Client,
            text: text.into(),
        }
    }

    /// Create a server-authored message
    pub fn server(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Server,
            text: text.into(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The bare line of text, without origin label or terminator
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Format for display, e.g. `Client: hello`
    pub fn display_line(&self) -> String {
        format!("{}: {}", self.origin, self.text)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.origin, self.text)
    }
}
