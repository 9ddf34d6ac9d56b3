//! Client-side peer role
//!
//! One outbound connection to the relay with two independent duties: a
//! spawned read loop that turns server broadcasts into display events,
//! and a write path driven by user input. A send failure is surfaced to
//! the caller without stopping the read loop, and vice versa.

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::RelayError;
use crate::message::Message;
use crate::reader::{LineEvent, LineReader};

/// Incoming event buffer toward the presentation layer
const INCOMING_BUFFER: usize = 32;

/// What the presentation layer sees from the connection
///
/// Every terminal condition reaches the user as a line of display text,
/// not a structured error.
#[derive(Debug)]
pub enum ClientEvent {
    /// A line broadcast by the server
    Message(Message),
    /// The stream closed or errored; the read loop has ended
    Disconnected,
}

impl ClientEvent {
    /// Format for the display surface, e.g. `Server: hello`
    pub fn display_line(&self) -> String {
        match self {
            ClientEvent::Message(msg) => msg.display_line(),
            ClientEvent::Disconnected => "Disconnected from server.".to_string(),
        }
    }
}

/// A connected chat peer
///
/// Created by [`ChatClient::connect`], which also hands back the event
/// channel the read loop feeds. The channel closes after
/// [`ClientEvent::Disconnected`] is delivered.
pub struct ChatClient {
    writer: OwnedWriteHalf,
    read_task: JoinHandle<()>,
}

impl ChatClient {
    /// Connect to the relay at `addr`
    ///
    /// A connect failure is fatal to the session and reported to the
    /// caller; there is no automatic retry.
    pub async fn connect(addr: &str) -> Result<(Self, mpsc::Receiver<ClientEvent>), RelayError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| RelayError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        debug!("connected to {}", addr);

        let (read_half, writer) = stream.into_split();
        let (events_tx, events_rx) = mpsc::channel(INCOMING_BUFFER);
        let read_task = tokio::spawn(read_loop(read_half, events_tx));

        Ok((Self { writer, read_task }, events_rx))
    }

    /// Send one line to the server
    ///
    /// Appends the line terminator. A write failure is returned to the
    /// caller; the read loop keeps running.
    pub async fn send(&mut self, line: &str) -> Result<(), RelayError> {
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(RelayError::Write)?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(RelayError::Write)?;
        self.writer.flush().await.map_err(RelayError::Write)
    }

    /// Close the connection and wait for the read loop to finish
    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
        let _ = self.read_task.await;
    }
}

/// Read loop: server broadcasts become display events
///
/// End-of-stream and read errors are treated identically; both end the
/// loop after a final `Disconnected` event.
async fn read_loop(read_half: OwnedReadHalf, events: mpsc::Sender<ClientEvent>) {
    let mut reader = LineReader::new(read_half);
    loop {
        match reader.next().await {
            LineEvent::Line(line) => {
                if events
                    .send(ClientEvent::Message(Message::server(line)))
                    .await
                    .is_err()
                {
                    // Presentation layer went away; stop reading
                    break;
                }
            }
            LineEvent::Eof => {
                debug!("server closed the connection");
                let _ = events.send(ClientEvent::Disconnected).await;
                break;
            }
            LineEvent::Failed(e) => {
                debug!("read from server failed: {}", e);
                let _ = events.send(ClientEvent::Disconnected).await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::server::ChatServer;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn start_server() -> (ChatServer, String) {
        let mut server = ChatServer::new(RelayConfig::new("127.0.0.1:0", 10));
        let addr = server.start().await.unwrap();
        (server, addr.to_string())
    }

    async fn next_event(rx: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
        timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed early")
    }

    async fn wait_for_count(server: &ChatServer, expected: usize) {
        timeout(WAIT, async {
            while server.connection_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("registry never reached expected size");
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal() {
        // Nothing listens on a freshly bound-and-dropped port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        tokio::time::sleep(Duration::from_millis(50)).await;

        match ChatClient::connect(&addr).await {
            Err(RelayError::Connect { .. }) => {}
            Ok(_) => panic!("expected connect failure"),
            Err(other) => panic!("expected connect failure, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_send_and_receive_mirrored_line() {
        let (mut server, addr) = start_server().await;
        let (mut client, mut events) = ChatClient::connect(&addr).await.unwrap();

        client.send("hello").await.unwrap();

        match next_event(&mut events).await {
            ClientEvent::Message(msg) => {
                assert_eq!(msg.text(), "hello");
                assert_eq!(msg.display_line(), "Server: hello");
            }
            other => panic!("expected message, got {:?}", other),
        }

        client.close().await;
        server.stop().await;
    }

    #[tokio::test]
    async fn test_two_clients_both_receive() {
        let (mut server, addr) = start_server().await;
        let (mut a, mut a_events) = ChatClient::connect(&addr).await.unwrap();
        let (b, mut b_events) = ChatClient::connect(&addr).await.unwrap();
        wait_for_count(&server, 2).await;

        a.send("hi").await.unwrap();

        match next_event(&mut a_events).await {
            ClientEvent::Message(msg) => assert_eq!(msg.text(), "hi"),
            other => panic!("expected message, got {:?}", other),
        }
        match next_event(&mut b_events).await {
            ClientEvent::Message(msg) => assert_eq!(msg.text(), "hi"),
            other => panic!("expected message, got {:?}", other),
        }

        a.close().await;
        b.close().await;
        server.stop().await;
    }

    #[tokio::test]
    async fn test_server_stop_yields_disconnected() {
        let (mut server, addr) = start_server().await;
        let (client, mut events) = ChatClient::connect(&addr).await.unwrap();

        server.stop().await;

        match next_event(&mut events).await {
            ClientEvent::Disconnected => {}
            other => panic!("expected disconnect, got {:?}", other),
        }
        assert_eq!(
            ClientEvent::Disconnected.display_line(),
            "Disconnected from server."
        );

        client.close().await;
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_read_loop() {
        let (mut server, addr) = start_server().await;
        let (mut client, mut events) = ChatClient::connect(&addr).await.unwrap();

        server.stop().await;
        match next_event(&mut events).await {
            ClientEvent::Disconnected => {}
            other => panic!("expected disconnect, got {:?}", other),
        }

        // Writing into the dead connection fails eventually; the error is
        // surfaced to the caller rather than panicking or hanging. The
        // first write may still succeed while the FIN is in flight.
        let mut saw_error = false;
        for _ in 0..10 {
            if client.send("into the void").await.is_err() {
                saw_error = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(saw_error, "send to closed connection never failed");

        client.close().await;
    }
}
