//! Browser-facing transport: WebSocket over plain TCP.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Tungstenite errors are surfaced as I/O errors of the given kind.
fn io_error(kind: io::ErrorKind, err: tokio_tungstenite::tungstenite::Error) -> io::Error {
    match err {
        tokio_tungstenite::tungstenite::Error::Io(e) => e,
        other => io::Error::new(kind, other),
    }
}

/// Listens for browser connections and upgrades them to WebSocket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds to `addr`, e.g. `"0.0.0.0:3000"` or `"127.0.0.1:0"`.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::BindFailed {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "listening for websocket clients");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::AcceptFailed(io_error(io::ErrorKind::InvalidData, e)))?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "websocket upgraded");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// One upgraded browser socket.
///
/// The socket is split so a pending `recv` never blocks an outgoing
/// notification.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// The remote address, for logs.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // JSON frames go out as text so browser clients get a string.
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(io_error(io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // tungstenite answers pings itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io_error(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io_error(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
