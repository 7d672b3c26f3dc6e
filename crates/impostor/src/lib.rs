//! # Impostor
//!
//! Real-time room server for the impostor word game.
//!
//! A host opens a room with a secret word, players join by code, and the
//! server deals the word to everyone except one randomly chosen impostor.
//! The host then runs a vote; the server tallies it live, reveals whether
//! the impostor was caught, and keeps a per-room leaderboard across
//! rounds.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use impostor::prelude::*;
//!
//! # async fn start() -> Result<(), ImpostorError> {
//! let server = ImpostorServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build(NoVerifier)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ImpostorError;
pub use server::{ImpostorServer, ImpostorServerBuilder};

pub use impostor_protocol as protocol;
pub use impostor_room as room;
pub use impostor_session as session;
pub use impostor_transport as transport;

pub mod prelude {
    pub use crate::{ImpostorError, ImpostorServer, ImpostorServerBuilder};
    pub use impostor_protocol::{
        Ack, AckData, CloseReason, ErrorKind, IMPOSTOR_SENTINEL, Intent, Notification, Phase,
        PlayerToken, Request, RoomCode, ServerFrame,
    };
    pub use impostor_room::RoomConfig;
    pub use impostor_session::{IdentityVerifier, NoVerifier, SessionError, VerifiedIdentity};
}
