//! Identifiers and shared vocabulary for the wire format.

use std::fmt;

use impostor_transport::ConnectionId;
use serde::{Deserialize, Serialize};

/// What the impostor sees in place of the secret word.
pub const IMPOSTOR_SENTINEL: &str = "IMPOSTOR";

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short, human-typeable identifier of a room.
///
/// Input is case-insensitive and whitespace-tolerant: `" ab3k9z "` and
/// `"AB3K9Z"` address the same room. The canonical form is uppercase.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes user input into a code. Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_uppercase();
        if code.is_empty() { None } else { Some(Self(code)) }
    }

    /// Builds a code from characters already known to be canonical
    /// (the code generator's output).
    pub fn from_canonical(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// PlayerToken
// ---------------------------------------------------------------------------

/// Per-room handle for a player, used as the vote target.
///
/// Distinct from [`ConnectionId`] so votes and results never expose which
/// transport slot belongs to whom.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerToken(String);

impl PlayerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a room is in its round lifecycle.
///
/// ```text
/// Lobby ──start──→ Started ──open_vote──→ Voting ──close_vote──→ Resolved
///   ↑                                                              │
///   └──────────────────────────new_round───────────────────────────┘
/// ```
///
/// `new_round` is accepted from every phase; closing the room is not a
/// phase because a closed room simply stops existing in the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Lobby,
    Started,
    Voting,
    Resolved,
}

impl Phase {
    /// Returns `true` if players may join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` while a round has an impostor assigned.
    pub fn has_round(self) -> bool {
        !matches!(self, Self::Lobby)
    }

    /// Returns `true` while ballots are accepted.
    pub fn is_voting(self) -> bool {
        matches!(self, Self::Voting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Started => write!(f, "Started"),
            Self::Voting => write!(f, "Voting"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who a notification produced by a room should be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// The host and every player.
    All,

    /// Only the host.
    Host,

    /// One specific connection (private reveals).
    Connection(ConnectionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_parse_trims_and_uppercases() {
        let code = RoomCode::parse("  ab3k9z\n").unwrap();
        assert_eq!(code.as_str(), "AB3K9Z");
        assert_eq!(code, RoomCode::parse("AB3K9Z").unwrap());
    }

    #[test]
    fn test_room_code_parse_blank_is_none() {
        assert!(RoomCode::parse("").is_none());
        assert!(RoomCode::parse("   ").is_none());
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode::parse("q7x").unwrap())
            .unwrap();
        assert_eq!(json, "\"Q7X\"");
    }

    #[test]
    fn test_player_token_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerToken::new("K4ZP")).unwrap();
        assert_eq!(json, "\"K4ZP\"");
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Phase::Voting).unwrap(), "\"voting\"");
        assert_eq!(Phase::default(), Phase::Lobby);
    }

    #[test]
    fn test_phase_predicates() {
        assert!(Phase::Lobby.is_joinable());
        assert!(!Phase::Started.is_joinable());
        assert!(!Phase::Lobby.has_round());
        assert!(Phase::Resolved.has_round());
        assert!(Phase::Voting.is_voting());
        assert!(!Phase::Resolved.is_voting());
    }
}
