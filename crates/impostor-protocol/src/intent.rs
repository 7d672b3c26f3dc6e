//! Client → server intents and their acknowledgements.
//!
//! Every inbound frame is a [`Request`]: an optional client-chosen `ref`
//! plus one [`Intent`]. The server answers each request with exactly one
//! [`Ack`] carrying the same `ref`, so clients can match answers to
//! questions even though notifications are interleaved on the same socket.
//!
//! ```text
//! → {"ref": 4, "intent": {"type": "cast_vote", "code": "AB3K9Z", "targetToken": "K4ZP"}}
//! ← {"ref": 4, "ok": true}
//! ← {"event": "vote_update", "data": {...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::{Codec, PlayerToken, ProtocolError, RoomCode};

/// One thing a client asks the server to do.
///
/// String fields default to empty when missing so that an absent name is
/// reported as "name is required" by validation rather than as a parse
/// error. Unknown `type` tags fail to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Intent {
    /// Open a new room as its host.
    CreateRoom {
        #[serde(default)]
        host_name: String,
        #[serde(default)]
        word: String,
    },

    /// Join a lobby as a player. `identity` is checked by the identity
    /// verifier when one is configured and taken as given otherwise.
    /// Older clients send it as `credential`.
    JoinRoom {
        #[serde(default)]
        code: String,
        #[serde(default)]
        name: String,
        #[serde(default, alias = "credential")]
        identity: Option<String>,
    },

    /// Host: assign roles and reveal them.
    StartGame {
        #[serde(default)]
        code: String,
    },

    /// Host: open the ballot.
    OpenVote {
        #[serde(default)]
        code: String,
    },

    /// Player: accuse another player. Re-voting replaces the earlier ballot.
    CastVote {
        #[serde(default)]
        code: String,
        #[serde(default)]
        target_token: String,
    },

    /// Host: close the ballot and publish the result.
    CloseVote {
        #[serde(default)]
        code: String,
    },

    /// Host: back to the lobby with a fresh secret word.
    NewRound {
        #[serde(default)]
        code: String,
        #[serde(default)]
        word: String,
    },

    /// Leave the room. For the host this closes the room.
    LeaveRoom {
        #[serde(default)]
        code: String,
    },

    /// Exchange an externally issued credential for a verified identity.
    VerifyIdentity {
        #[serde(default)]
        credential: String,
    },
}

impl Intent {
    /// The wire name of the intent, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::StartGame { .. } => "start_game",
            Self::OpenVote { .. } => "open_vote",
            Self::CastVote { .. } => "cast_vote",
            Self::CloseVote { .. } => "close_vote",
            Self::NewRound { .. } => "new_round",
            Self::LeaveRoom { .. } => "leave_room",
            Self::VerifyIdentity { .. } => "verify_identity",
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Client-chosen correlation id, echoed in the ack.
    #[serde(rename = "ref", default)]
    pub reference: Option<u64>,

    pub intent: Intent,
}

/// Just the correlation id, decoded on its own so a malformed intent can
/// still be answered with the right `ref`.
#[derive(Deserialize)]
struct RequestRef {
    #[serde(rename = "ref", default)]
    reference: Option<u64>,
}

/// A frame that could not be turned into a [`Request`].
#[derive(Debug)]
pub struct RejectedRequest {
    /// The `ref` the client sent, if it could be recovered.
    pub reference: Option<u64>,
    pub error: ProtocolError,
}

impl Request {
    /// Decodes a frame, keeping the `ref` when the intent itself is
    /// malformed.
    pub fn decode<C: Codec>(codec: &C, data: &[u8]) -> Result<Self, RejectedRequest> {
        codec.decode::<Request>(data).map_err(|error| {
            let reference = codec
                .decode::<RequestRef>(data)
                .ok()
                .and_then(|r| r.reference);
            RejectedRequest { reference, error }
        })
    }
}

// ---------------------------------------------------------------------------
// Ack
// ---------------------------------------------------------------------------

/// Machine-readable class of a rejected intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, empty, oversized or malformed input.
    Validation,
    /// The room code doesn't name a live room.
    NotFound,
    /// Wrong phase, or a threshold not met.
    Precondition,
    /// Non-host attempted a host action, or the host a player action.
    Authorization,
    /// Duplicate identity, self-vote, invalid vote target.
    Conflict,
    /// The identity provider call failed or isn't configured.
    ExternalVerification,
}

/// Optional payload fields of a successful ack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<RoomCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<PlayerToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The answer to one [`Request`]: `{ref, ok, error?, errorKind?, ...data}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<u64>,

    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(flatten)]
    pub data: AckData,
}

impl Ack {
    /// A bare success.
    pub fn ok(reference: Option<u64>) -> Self {
        Self::with_data(reference, AckData::default())
    }

    /// A success carrying payload fields.
    pub fn with_data(reference: Option<u64>, data: AckData) -> Self {
        Self {
            reference,
            ok: true,
            error: None,
            error_kind: None,
            data,
        }
    }

    /// A rejection with a human-readable message.
    pub fn rejected(
        reference: Option<u64>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            reference,
            ok: false,
            error: Some(message.into()),
            error_kind: Some(kind),
            data: AckData::default(),
        }
    }
}
