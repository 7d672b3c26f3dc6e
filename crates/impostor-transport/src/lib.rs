//! Transport layer for the impostor room server.
//!
//! Provides the [`Transport`] and [`Connection`] traits plus the WebSocket
//! implementation browsers talk to. Everything above this crate sees a
//! connection as "something that sends and receives byte frames" and is
//! identified by a [`ConnectionId`].
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Ephemeral identifier for one client connection.
///
/// Never sent on the wire: rooms hand out per-room player tokens instead,
/// so one participant can't address another's transport slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener handing out client connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next client, fully upgraded.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The bound address. Tests bind port 0 and read the real port here.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// A single connection that can send and receive frames.
///
/// `send` and `recv` must be usable concurrently from one task (e.g. from
/// two branches of a `tokio::select!`), so implementations keep the read
/// and write halves independent.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame (an ack or a notification).
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next frame, or `Ok(None)` once the client has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "host");
        map.insert(ConnectionId::new(2), "player");
        assert_eq!(map[&ConnectionId::new(1)], "host");
        assert_eq!(map.len(), 2);
    }
}
