//! Server → client notifications.
//!
//! Notifications are pushed without being asked for. They are adjacently
//! tagged, `{"event": "room_update", "data": {...}}`, which keeps them
//! distinguishable from acks (acks always carry `ok`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Ack, Phase, PlayerToken, RoomCode};

/// One player as shown to everyone in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub token: PlayerToken,
}

/// The public view of a room, broadcast after every accepted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: RoomCode,
    /// `true` whenever a round is running (any phase but the lobby).
    pub started: bool,
    pub phase: Phase,
    pub host_name: String,
    pub player_count: usize,
    /// Players in join order.
    pub players: Vec<PlayerEntry>,
    pub vote_open: bool,
}

/// Which role a player was dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Impostor,
    Crew,
}

/// The private role card. Only ever sent to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    pub code: RoomCode,
    pub name: String,
    pub role: Role,
    /// The secret word, or [`IMPOSTOR_SENTINEL`](crate::IMPOSTOR_SENTINEL).
    pub shown: String,
}

/// Sent to the host once roles are out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStarted {
    pub code: RoomCode,
    pub player_count: usize,
}

/// The ballot and its current counts.
///
/// `counts` has an entry for every present player, zero included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    pub code: RoomCode,
    pub players: Vec<PlayerEntry>,
    pub counts: BTreeMap<PlayerToken, usize>,
    pub total_votes: usize,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub accuser_wins: u32,
    pub impostor_wins: u32,
    pub total_wins: u32,
}

/// The outcome of a closed ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    #[serde(flatten)]
    pub tally: TallySnapshot,
    pub impostor_name: String,
    pub impostor_token: PlayerToken,
    pub caught: bool,
    pub max_votes: usize,
    pub top_tokens: Vec<PlayerToken>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Why a room went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The host left or disconnected.
    HostLeft,
    /// Nobody did anything for longer than the idle TTL.
    Idle,
    /// The server removed the room.
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomClosed {
    pub code: RoomCode,
    pub reason: CloseReason,
}

/// Everything the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Notification {
    RoomUpdate(RoomSnapshot),
    /// Unicast only.
    Reveal(Reveal),
    /// Host only.
    HostStarted(HostStarted),
    VoteOpen(TallySnapshot),
    VoteUpdate(TallySnapshot),
    VoteClosed(VoteResult),
    RoomClosed(RoomClosed),
}

impl Notification {
    /// The wire name of the notification, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomUpdate(_) => "room_update",
            Self::Reveal(_) => "reveal",
            Self::HostStarted(_) => "host_started",
            Self::VoteOpen(_) => "vote_open",
            Self::VoteUpdate(_) => "vote_update",
            Self::VoteClosed(_) => "vote_closed",
            Self::RoomClosed(_) => "room_closed",
        }
    }
}

/// Any frame the server writes to a socket.
///
/// Untagged: an ack is recognized by its `ok` field, a notification by
/// its `event` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Ack(Ack),
    Event(Notification),
}
