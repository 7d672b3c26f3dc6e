//! Room actor: a Tokio task that owns one [`Room`].
//!
//! The registry talks to a room only through its [`RoomHandle`]. Commands
//! are processed one at a time, so every notification an operation
//! produces is queued to each connection before the next command runs.

use std::collections::HashMap;

use impostor_protocol::{CloseReason, Notification, Phase, PlayerToken, Recipient, RoomCode, RoomSnapshot};
use impostor_session::DurableIdentity;
use impostor_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::room::{Departure, Host, Outbox, Room};
use crate::{RoomConfig, RoomError};

/// Channel a connection task drains to receive its notifications.
pub type ConnectionSender = mpsc::UnboundedSender<Notification>;

/// Command channel capacity per room.
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Host-driven and voting operations, routed to a room by code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    Start,
    OpenVote,
    CastVote(PlayerToken),
    CloseVote,
    /// Carries the already-cleaned word.
    NewRound(String),
}

/// How a leave request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// A player left.
    Left,
    /// The host left and the room has shut down.
    Closed,
    /// The connection wasn't in the room.
    NotMember,
}

/// Room metadata for the registry and for tests.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    pub host: ConnectionId,
    pub player_count: usize,
    pub snapshot: RoomSnapshot,
}

pub(crate) enum RoomCommand {
    Join {
        connection: ConnectionId,
        name: String,
        identity: DurableIdentity,
        sender: ConnectionSender,
        reply: oneshot::Sender<Result<PlayerToken, RoomError>>,
    },
    Leave {
        connection: ConnectionId,
        reply: oneshot::Sender<LeaveOutcome>,
    },
    Act {
        connection: ConnectionId,
        action: RoomAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    /// Broadcast `room_closed` to everyone and stop.
    Close {
        reason: CloseReason,
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Asks the room to admit a player. Returns the player's token.
    pub async fn join(
        &self,
        connection: ConnectionId,
        name: String,
        identity: DurableIdentity,
        sender: ConnectionSender,
    ) -> Result<PlayerToken, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            connection,
            name,
            identity,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn leave(&self, connection: ConnectionId) -> Result<LeaveOutcome, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { connection, reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    pub async fn act(&self, connection: ConnectionId, action: RoomAction) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Act {
            connection,
            action,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to notify everyone and shut down. Returns once
    /// `room_closed` has been queued to every member.
    pub async fn close(&self, reason: CloseReason) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Close { reason, reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

struct RoomActor {
    room: Room,
    /// Outbound channel of the host and every player.
    senders: HashMap<ConnectionId, ConnectionSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(code = %self.room.code(), "room actor started");

        while let Some(command) = self.receiver.recv().await {
            match command {
                RoomCommand::Join {
                    connection,
                    name,
                    identity,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(connection, name, identity, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { connection, reply } => match self.room.leave(connection) {
                    Departure::Player { outbox, .. } => {
                        self.senders.remove(&connection);
                        self.dispatch(outbox);
                        let _ = reply.send(LeaveOutcome::Left);
                    }
                    Departure::Host => {
                        self.senders.remove(&connection);
                        let notice = self.room.closed_notice(CloseReason::HostLeft);
                        self.dispatch(vec![(Recipient::All, notice)]);
                        let _ = reply.send(LeaveOutcome::Closed);
                        tracing::info!(code = %self.room.code(), "host left, room closing");
                        break;
                    }
                    Departure::NotMember => {
                        let _ = reply.send(LeaveOutcome::NotMember);
                    }
                },
                RoomCommand::Act {
                    connection,
                    action,
                    reply,
                } => {
                    let result = self.handle_action(connection, action).map(|outbox| {
                        self.dispatch(outbox);
                    });
                    if let Err(e) = &result {
                        tracing::debug!(
                            code = %self.room.code(),
                            %connection,
                            error = %e,
                            "action refused"
                        );
                    }
                    let _ = reply.send(result);
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Close { reason, reply } => {
                    let notice = self.room.closed_notice(reason);
                    self.dispatch(vec![(Recipient::All, notice)]);
                    let _ = reply.send(());
                    tracing::info!(code = %self.room.code(), ?reason, "room closing");
                    break;
                }
            }
        }

        tracing::info!(code = %self.room.code(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        connection: ConnectionId,
        name: String,
        identity: DurableIdentity,
        sender: ConnectionSender,
    ) -> Result<PlayerToken, RoomError> {
        let (token, outbox) = self
            .room
            .join(connection, name, identity, &mut rand::rng())?;
        self.senders.insert(connection, sender);
        self.dispatch(outbox);
        Ok(token)
    }

    fn handle_action(
        &mut self,
        connection: ConnectionId,
        action: RoomAction,
    ) -> Result<Outbox, RoomError> {
        match action {
            RoomAction::Start => self.room.start(connection, &mut rand::rng()),
            RoomAction::OpenVote => self.room.open_vote(connection),
            RoomAction::CastVote(target) => self.room.cast_vote(connection, &target),
            RoomAction::CloseVote => self.room.close_vote(connection),
            RoomAction::NewRound(word) => self.room.new_round(connection, word),
        }
    }

    /// Delivers notifications in order. A closed receiver means that
    /// connection is on its way out, so sends to it are dropped.
    fn dispatch(&self, outbox: Outbox) {
        for (recipient, notification) in outbox {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(notification.clone());
                    }
                }
                Recipient::Host => self.send_to(self.room.host().connection, notification),
                Recipient::Connection(connection) => self.send_to(connection, notification),
            }
        }
    }

    fn send_to(&self, connection: ConnectionId, notification: Notification) {
        if let Some(sender) = self.senders.get(&connection) {
            let _ = sender.send(notification);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            phase: self.room.phase(),
            host: self.room.host().connection,
            player_count: self.room.players().len(),
            snapshot: self.room.snapshot(),
        }
    }
}

/// Spawns the actor for a new room and greets the host with the first
/// `room_update`.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    host: Host,
    secret_word: String,
    host_sender: ConnectionSender,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

    let room = Room::new(code.clone(), config, host, secret_word);
    let mut senders = HashMap::new();
    senders.insert(room.host().connection, host_sender);

    let actor = RoomActor {
        room,
        senders,
        receiver: rx,
    };
    actor.dispatch(vec![(
        Recipient::Host,
        Notification::RoomUpdate(actor.room.snapshot()),
    )]);

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
