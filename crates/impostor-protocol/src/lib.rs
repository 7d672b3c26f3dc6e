//! Wire protocol for the impostor room server.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Identifiers** ([`RoomCode`], [`PlayerToken`]) and the room [`Phase`].
//! - **Intents** ([`Request`], [`Intent`]): client → server, each answered
//!   by exactly one [`Ack`].
//! - **Notifications** ([`Notification`]): server → client, pushed to a
//!   whole room or to a single connection ([`Recipient`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes ↔ frames.
//!
//! ```text
//! Transport (frames) → Protocol (Request / ServerFrame) → Room (state machine)
//! ```

mod codec;
mod error;
mod intent;
mod notification;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use intent::{Ack, AckData, ErrorKind, Intent, RejectedRequest, Request};
pub use notification::{
    CloseReason, HostStarted, LeaderboardEntry, Notification, PlayerEntry,
    Reveal, Role, RoomClosed, RoomSnapshot, ServerFrame, TallySnapshot,
    VoteResult,
};
pub use types::{IMPOSTOR_SENTINEL, Phase, PlayerToken, Recipient, RoomCode};
