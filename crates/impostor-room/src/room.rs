//! The round state machine of a single room.
//!
//! [`Room`] is plain data: no tasks, no channels, no clocks. Every
//! mutating method either refuses with a [`RoomError`] and leaves the room
//! untouched, or applies the change and returns the notifications it
//! produced as an [`Outbox`]. A room actor owns each `Room`
//! and delivers those notifications.
//!
//! ```text
//! Lobby ──start──▶ Started ──open_vote──▶ Voting ──close_vote──▶ Resolved
//!   ▲                                                              │
//!   └──────────────────────────── new_round ◀──────────────────────┘
//! ```

use std::collections::HashMap;
use std::time::Instant;

use impostor_protocol::{
    CloseReason, HostStarted, IMPOSTOR_SENTINEL, Notification, Phase, PlayerEntry, PlayerToken,
    Recipient, Reveal, Role, RoomClosed, RoomCode, RoomSnapshot, TallySnapshot, VoteResult,
};
use impostor_session::DurableIdentity;
use impostor_transport::ConnectionId;
use rand::Rng;

use crate::code::unique_token;
use crate::{RoomConfig, RoomError, Scoreboard, Tally};

/// Notifications produced by one operation, in delivery order.
pub type Outbox = Vec<(Recipient, Notification)>;

/// The room's creator. Runs the game, never plays or votes.
#[derive(Debug, Clone)]
pub struct Host {
    pub connection: ConnectionId,
    pub name: String,
}

/// A non-host participant.
#[derive(Debug, Clone)]
pub struct Player {
    pub connection: ConnectionId,
    pub name: String,
    pub token: PlayerToken,
    pub identity: DurableIdentity,
    pub joined_at: Instant,
}

/// What a leave did to the room.
#[derive(Debug)]
pub enum Departure {
    /// A player left. The room carries on.
    Player { token: PlayerToken, outbox: Outbox },
    /// The host left. The room must be closed.
    Host,
    /// The connection wasn't in this room.
    NotMember,
}

#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    config: RoomConfig,
    host: Host,
    secret_word: String,
    phase: Phase,
    /// Join order.
    players: Vec<Player>,
    impostor: Option<PlayerToken>,
    /// Voter connection to target. One entry per voter.
    votes: HashMap<ConnectionId, PlayerToken>,
    scoreboard: Scoreboard,
}

impl Room {
    /// Creates a room in the lobby. The host's name and `secret_word`
    /// must already be cleaned and non-empty.
    pub fn new(
        code: RoomCode,
        config: RoomConfig,
        host: Host,
        secret_word: String,
    ) -> Self {
        Self {
            code,
            config,
            host,
            secret_word,
            phase: Phase::Lobby,
            players: Vec::new(),
            impostor: None,
            votes: HashMap::new(),
            scoreboard: Scoreboard::new(),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn impostor(&self) -> Option<&PlayerToken> {
        self.impostor.as_ref()
    }

    pub fn secret_word(&self) -> &str {
        &self.secret_word
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// The target `voter` currently has on the ballot.
    pub fn vote_of(&self, voter: ConnectionId) -> Option<&PlayerToken> {
        self.votes.get(&voter)
    }

    pub fn player_by_connection(&self, connection: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection == connection)
    }

    pub fn player_by_token(&self, token: &PlayerToken) -> Option<&Player> {
        self.players.iter().find(|p| &p.token == token)
    }

    // -- operations --------------------------------------------------------

    /// Adds a player to the lobby and hands back their new token.
    ///
    /// # Errors
    /// - `Validation`: the name is empty.
    /// - `Conflict`: the connection is already host or player here, or
    ///   `identity` belongs to a present player.
    /// - `Precondition`: a round is under way.
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        connection: ConnectionId,
        name: String,
        identity: DurableIdentity,
        rng: &mut R,
    ) -> Result<(PlayerToken, Outbox), RoomError> {
        if name.is_empty() {
            return Err(RoomError::Validation("name is required".into()));
        }
        if connection == self.host.connection {
            return Err(RoomError::Conflict(
                "the host cannot join their own room as a player".into(),
            ));
        }
        if self.player_by_connection(connection).is_some() {
            return Err(RoomError::Conflict(format!(
                "already a player in room {}",
                self.code
            )));
        }
        if !self.phase.is_joinable() {
            return Err(RoomError::Precondition(format!(
                "room {} has already started",
                self.code
            )));
        }
        if self.players.iter().any(|p| p.identity == identity) {
            return Err(RoomError::Conflict(format!(
                "{name} is already in room {}",
                self.code
            )));
        }

        let token = unique_token(rng, &self.config, |t| {
            self.players.iter().any(|p| &p.token == t)
        })
        .ok_or_else(|| RoomError::Conflict(format!("room {} is full", self.code)))?;
        self.scoreboard.register(&identity, &name);
        self.players.push(Player {
            connection,
            name,
            token: token.clone(),
            identity,
            joined_at: Instant::now(),
        });

        tracing::info!(
            code = %self.code,
            %connection,
            %token,
            players = self.players.len(),
            "player joined"
        );

        Ok((token, vec![self.room_update()]))
    }

    /// Removes a connection from the room.
    ///
    /// A departing player takes their ballot entry with them, and every
    /// vote cast for them is dropped too. If the impostor leaves while a
    /// round is running, the round is abandoned and the room returns to
    /// the lobby.
    pub fn leave(&mut self, connection: ConnectionId) -> Departure {
        if connection == self.host.connection {
            return Departure::Host;
        }
        let Some(index) = self.players.iter().position(|p| p.connection == connection) else {
            return Departure::NotMember;
        };

        let player = self.players.remove(index);
        self.votes.remove(&connection);
        self.votes.retain(|_, target| *target != player.token);

        if self.impostor.as_ref() == Some(&player.token) {
            match self.phase {
                Phase::Started | Phase::Voting => {
                    tracing::info!(
                        code = %self.code,
                        "impostor left mid-round, back to lobby"
                    );
                    self.reset_round();
                }
                _ => self.impostor = None,
            }
        }

        tracing::info!(
            code = %self.code,
            %connection,
            token = %player.token,
            stayed_secs = player.joined_at.elapsed().as_secs(),
            players = self.players.len(),
            "player left"
        );

        let mut outbox = Vec::with_capacity(2);
        if self.phase.is_voting() {
            outbox.push((Recipient::All, Notification::VoteUpdate(self.tally_snapshot())));
        }
        outbox.push(self.room_update());

        Departure::Player {
            token: player.token,
            outbox,
        }
    }

    /// Deals roles and begins a round.
    ///
    /// Exactly one player, chosen uniformly, is the impostor and is shown
    /// the sentinel. Everyone else is shown the secret word.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        caller: ConnectionId,
        rng: &mut R,
    ) -> Result<Outbox, RoomError> {
        self.require_host(caller, "start the game")?;
        if self.phase != Phase::Lobby {
            return Err(RoomError::Precondition(format!(
                "cannot start while {}",
                self.phase
            )));
        }
        if self.players.len() < self.config.min_players {
            return Err(RoomError::Precondition(format!(
                "need at least {} players to start, have {}",
                self.config.min_players,
                self.players.len()
            )));
        }

        let chosen = rng.random_range(0..self.players.len());
        let impostor = self.players[chosen].token.clone();
        self.impostor = Some(impostor.clone());
        self.votes.clear();
        self.phase = Phase::Started;

        tracing::info!(
            code = %self.code,
            players = self.players.len(),
            "round started"
        );

        let mut outbox: Outbox = self
            .players
            .iter()
            .map(|p| {
                let (role, shown) = if p.token == impostor {
                    (Role::Impostor, IMPOSTOR_SENTINEL.to_string())
                } else {
                    (Role::Crew, self.secret_word.clone())
                };
                (
                    Recipient::Connection(p.connection),
                    Notification::Reveal(Reveal {
                        code: self.code.clone(),
                        name: p.name.clone(),
                        role,
                        shown,
                    }),
                )
            })
            .collect();
        outbox.push((
            Recipient::Host,
            Notification::HostStarted(HostStarted {
                code: self.code.clone(),
                player_count: self.players.len(),
            }),
        ));
        outbox.push(self.room_update());
        Ok(outbox)
    }

    /// Opens an empty ballot.
    pub fn open_vote(&mut self, caller: ConnectionId) -> Result<Outbox, RoomError> {
        self.require_host(caller, "open the vote")?;
        if self.phase != Phase::Started {
            return Err(RoomError::Precondition(format!(
                "cannot open a vote while {}",
                self.phase
            )));
        }

        self.votes.clear();
        self.phase = Phase::Voting;
        tracing::info!(code = %self.code, "vote opened");

        Ok(vec![
            (Recipient::All, Notification::VoteOpen(self.tally_snapshot())),
            self.room_update(),
        ])
    }

    /// Records or replaces `caller`'s vote.
    pub fn cast_vote(
        &mut self,
        caller: ConnectionId,
        target: &PlayerToken,
    ) -> Result<Outbox, RoomError> {
        if !self.phase.is_voting() {
            return Err(RoomError::Precondition("voting is not open".into()));
        }
        if caller == self.host.connection {
            return Err(RoomError::Authorization("the host does not vote".into()));
        }
        let voter = self.player_by_connection(caller).ok_or_else(|| {
            RoomError::Authorization(format!("not a player in room {}", self.code))
        })?;
        if &voter.token == target {
            return Err(RoomError::Conflict("you cannot vote for yourself".into()));
        }
        if self.player_by_token(target).is_none() {
            return Err(RoomError::Conflict(format!(
                "no player with token {target} in room {}",
                self.code
            )));
        }

        self.votes.insert(caller, target.clone());
        tracing::debug!(code = %self.code, %caller, %target, "vote cast");

        Ok(vec![
            (Recipient::All, Notification::VoteUpdate(self.tally_snapshot())),
            self.room_update(),
        ])
    }

    /// Closes the ballot, scores it, and reveals the impostor.
    ///
    /// If the impostor is caught every player who voted for them earns an
    /// accuser win; otherwise the impostor earns an impostor win.
    pub fn close_vote(&mut self, caller: ConnectionId) -> Result<Outbox, RoomError> {
        self.require_host(caller, "close the vote")?;
        if !self.phase.is_voting() {
            return Err(RoomError::Precondition("voting is not open".into()));
        }
        let impostor = self.impostor.clone().ok_or_else(|| {
            RoomError::Precondition("this round has no impostor".into())
        })?;
        let impostor_player = self
            .player_by_token(&impostor)
            .cloned()
            .ok_or_else(|| RoomError::Precondition("the impostor has left".into()))?;

        let tally = self.tally();
        let resolution = tally.resolve(&impostor);

        if resolution.caught {
            let accusers: Vec<DurableIdentity> = self
                .players
                .iter()
                .filter(|p| self.votes.get(&p.connection) == Some(&impostor))
                .map(|p| p.identity.clone())
                .collect();
            for identity in &accusers {
                self.scoreboard.award_accuser(identity);
            }
        } else {
            self.scoreboard.award_impostor(&impostor_player.identity);
        }
        self.phase = Phase::Resolved;

        tracing::info!(
            code = %self.code,
            caught = resolution.caught,
            max_votes = resolution.max_votes,
            total_votes = tally.total_votes(),
            "vote closed"
        );

        let result = VoteResult {
            tally: self.snapshot_of(&tally),
            impostor_name: impostor_player.name,
            impostor_token: impostor,
            caught: resolution.caught,
            max_votes: resolution.max_votes,
            top_tokens: resolution.top_tokens,
            leaderboard: self.scoreboard.leaderboard(),
        };

        Ok(vec![
            (Recipient::All, Notification::VoteClosed(result)),
            self.room_update(),
        ])
    }

    /// Replaces the secret word and returns to the lobby, scores intact.
    ///
    /// Accepted from any phase, so a host can also abandon a round.
    pub fn new_round(&mut self, caller: ConnectionId, word: String) -> Result<Outbox, RoomError> {
        self.require_host(caller, "start a new round")?;
        if word.is_empty() {
            return Err(RoomError::Validation("word is required".into()));
        }

        self.secret_word = word;
        self.reset_round();
        tracing::info!(code = %self.code, "new round");

        Ok(vec![self.room_update()])
    }

    // -- views -------------------------------------------------------------

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            started: self.phase.has_round(),
            phase: self.phase,
            host_name: self.host.name.clone(),
            player_count: self.players.len(),
            players: self.player_entries(),
            vote_open: self.phase.is_voting(),
        }
    }

    pub fn tally(&self) -> Tally {
        Tally::count(self.players.iter().map(|p| &p.token), self.votes.values())
    }

    pub fn tally_snapshot(&self) -> TallySnapshot {
        self.snapshot_of(&self.tally())
    }

    /// The notification sent to everyone else when this room goes away.
    pub fn closed_notice(&self, reason: CloseReason) -> Notification {
        Notification::RoomClosed(RoomClosed {
            code: self.code.clone(),
            reason,
        })
    }

    fn snapshot_of(&self, tally: &Tally) -> TallySnapshot {
        TallySnapshot {
            code: self.code.clone(),
            players: self.player_entries(),
            counts: tally.counts().clone(),
            total_votes: tally.total_votes(),
        }
    }

    fn player_entries(&self) -> Vec<PlayerEntry> {
        self.players
            .iter()
            .map(|p| PlayerEntry {
                name: p.name.clone(),
                token: p.token.clone(),
            })
            .collect()
    }

    fn room_update(&self) -> (Recipient, Notification) {
        (Recipient::All, Notification::RoomUpdate(self.snapshot()))
    }

    fn reset_round(&mut self) {
        self.phase = Phase::Lobby;
        self.impostor = None;
        self.votes.clear();
    }

    fn require_host(&self, caller: ConnectionId, action: &str) -> Result<(), RoomError> {
        if caller == self.host.connection {
            Ok(())
        } else {
            Err(RoomError::Authorization(format!(
                "only the host can {action}"
            )))
        }
    }
}
