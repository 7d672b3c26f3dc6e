//! Error types for the protocol layer.

/// Errors that can occur while turning frames into intents and back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not valid JSON, or doesn't match any intent schema.
    #[cfg(feature = "json")]
    #[error("malformed request: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates a protocol rule
    /// (e.g. an empty room code).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
