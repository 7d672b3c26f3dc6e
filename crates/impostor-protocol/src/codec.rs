//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The connection handler never calls `serde_json` directly; it goes
//! through a [`Codec`], so the wire format is swappable without touching
//! the room logic.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to frame bytes and decodes frame bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task through the server state.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON, which is what browser clients send.
///
/// ```rust
/// use impostor_protocol::{Codec, Intent, JsonCodec, Request};
///
/// let codec = JsonCodec;
/// let frame = br#"{"ref":1,"intent":{"type":"start_game","code":"abc234"}}"#;
///
/// let request: Request = codec.decode(frame).unwrap();
/// assert_eq!(request.reference, Some(1));
/// assert!(matches!(request.intent, Intent::StartGame { .. }));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
