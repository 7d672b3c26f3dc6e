//! Unified error type for the impostor server.

use impostor_protocol::{ErrorKind, ProtocolError};
use impostor_room::{ConfigError, RoomError};
use impostor_session::SessionError;
use impostor_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ImpostorError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An identity verification error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, wrong phase, not the host, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The room configuration handed to the builder is unusable.
    #[error("invalid room config: {0}")]
    Config(#[from] ConfigError),
}

impl ImpostorError {
    /// Classifies the error for a rejected ack.
    ///
    /// Transport errors end the connection instead of being acked; they
    /// are classed with malformed input for completeness.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Room(e) => e.kind(),
            Self::Session(e) => e.kind(),
            Self::Protocol(_) | Self::Transport(_) | Self::Config(_) => ErrorKind::Validation,
        }
    }
}
