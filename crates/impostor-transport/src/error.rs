use std::io;

/// Failures below the protocol layer.
///
/// WebSocket errors are carried as [`io::Error`]s so callers don't depend
/// on the WebSocket library's types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot listen on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// TCP accept or the WebSocket upgrade failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),
}

impl TransportError {
    /// Whether the peer simply went away, as opposed to a local fault.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::SendFailed(e) | Self::ReceiveFailed(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}
