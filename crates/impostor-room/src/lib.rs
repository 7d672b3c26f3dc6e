//! Rooms for the impostor word game.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! round state machine, the ballot, and the room's scoreboard.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates and deletes rooms, routes intents by code,
//!   reaps idle rooms
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the synchronous round state machine inside each actor
//! - [`Tally`] / [`Scoreboard`]: vote counting and cumulative scores
//! - [`RoomConfig`]: player minimum, idle TTL, input limits

pub mod code;
mod config;
mod error;
mod actor;
mod registry;
mod room;
mod scoreboard;
mod tally;

pub use actor::{ConnectionSender, LeaveOutcome, RoomAction, RoomHandle, RoomInfo};
pub use config::{ConfigError, RoomConfig};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Departure, Host, Outbox, Player, Room};
pub use scoreboard::{ScoreRow, Scoreboard};
pub use tally::{Resolution, Tally};
