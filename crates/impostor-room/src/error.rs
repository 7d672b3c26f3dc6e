//! Error types for the room layer.

use impostor_protocol::{ErrorKind, RoomCode};

/// Why a room operation was refused.
///
/// Every variant is user-facing: its `Display` text goes straight into the
/// ack. A refused operation never changes room state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Missing, empty or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The room does not exist (or no longer exists).
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Wrong phase, or not enough players.
    #[error("{0}")]
    Precondition(String),

    /// The caller's role doesn't allow this action.
    #[error("{0}")]
    Authorization(String),

    /// Clashes with existing state: duplicate identity, self-vote,
    /// unknown vote target, already in a room.
    #[error("{0}")]
    Conflict(String),

    /// The room's actor stopped while the request was in flight.
    #[error("room {0} is closed")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// Classifies the error for the ack sent back to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) | Self::Unavailable(_) => ErrorKind::NotFound,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_the_code() {
        let err = RoomError::NotFound(RoomCode::parse("ab3k9z").unwrap());
        assert_eq!(err.to_string(), "room AB3K9Z not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_unavailable_is_reported_as_not_found() {
        let err = RoomError::Unavailable(RoomCode::parse("Q").unwrap());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            RoomError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            RoomError::Precondition("x".into()).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            RoomError::Authorization("x".into()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(RoomError::Conflict("x".into()).kind(), ErrorKind::Conflict);
    }
}
