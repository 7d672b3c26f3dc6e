//! Room registry: creates rooms, routes intents to them by code, and
//! reaps the idle ones.

use std::collections::HashMap;
use std::time::Instant;

use impostor_protocol::{CloseReason, PlayerToken, RoomCode};
use impostor_session::Session;
use impostor_transport::ConnectionId;

use crate::actor::spawn_room;
use crate::code::unique_room_code;
use crate::room::Host;
use crate::{ConnectionSender, LeaveOutcome, RoomAction, RoomConfig, RoomError, RoomHandle, RoomInfo};

struct RoomEntry {
    handle: RoomHandle,
    last_activity: Instant,
}

/// Every live room, keyed by code.
///
/// The server keeps one registry behind a mutex; each method runs to
/// completion before the next intent is routed, so the registry and every
/// room agree on who is where.
pub struct RoomRegistry {
    config: RoomConfig,
    rooms: HashMap<RoomCode, RoomEntry>,
    /// The room each connection is host or player in. At most one.
    affiliations: HashMap<ConnectionId, RoomCode>,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
            affiliations: HashMap::new(),
        }
    }

    /// Opens a room with `host` as its host and returns the new code.
    ///
    /// The host's `sender` receives the first `room_update` immediately.
    pub fn create(
        &mut self,
        host: ConnectionId,
        host_name: &str,
        word: &str,
        sender: ConnectionSender,
    ) -> Result<RoomCode, RoomError> {
        let name = self.config.clean_name(host_name);
        let word = self.config.clean_word(word);
        if name.is_empty() {
            return Err(RoomError::Validation("name is required".into()));
        }
        if word.is_empty() {
            return Err(RoomError::Validation("word is required".into()));
        }
        self.ensure_unaffiliated(host, None)?;

        let code = unique_room_code(&mut rand::rng(), &self.config, |c| {
            self.rooms.contains_key(c)
        })
        .ok_or_else(|| RoomError::Conflict("no free room codes".into()))?;
        let handle = spawn_room(
            code.clone(),
            self.config.clone(),
            Host {
                connection: host,
                name,
            },
            word,
            sender,
        );
        self.rooms.insert(
            code.clone(),
            RoomEntry {
                handle,
                last_activity: Instant::now(),
            },
        );
        self.affiliations.insert(host, code.clone());

        tracing::info!(%code, %host, rooms = self.rooms.len(), "room created");
        Ok(code)
    }

    /// Looks up a live room. `None` once the room has been deleted.
    pub fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).map(|e| e.handle.clone())
    }

    /// Adds the session's connection to a room as a player.
    ///
    /// The score identity is the session's verified email when it has
    /// one, otherwise the cleaned display name.
    pub async fn join(
        &mut self,
        code: &RoomCode,
        session: &Session,
        name: &str,
        sender: ConnectionSender,
    ) -> Result<PlayerToken, RoomError> {
        let connection = session.connection;
        let name = self.config.clean_name(name);
        if name.is_empty() {
            return Err(RoomError::Validation("name is required".into()));
        }
        let handle = self.handle(code)?;
        self.ensure_unaffiliated(connection, Some(code))?;

        let identity = session.durable_identity(&name);
        let token = handle.join(connection, name, identity, sender).await?;
        self.touch(code);
        self.affiliations.insert(connection, code.clone());
        Ok(token)
    }

    /// Routes a host or voting action to a room.
    pub async fn act(
        &mut self,
        code: &RoomCode,
        connection: ConnectionId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        let action = match action {
            RoomAction::NewRound(word) => RoomAction::NewRound(self.config.clean_word(&word)),
            other => other,
        };
        let handle = self.handle(code)?;
        handle.act(connection, action).await?;
        self.touch(code);
        Ok(())
    }

    /// Removes a connection from a room. Leaving a room that doesn't
    /// exist, or that the connection isn't in, does nothing.
    ///
    /// When the host leaves the room is deleted and everyone else gets
    /// `room_closed`.
    pub async fn leave(&mut self, code: &RoomCode, connection: ConnectionId) {
        let Ok(handle) = self.handle(code) else {
            return;
        };
        match handle.leave(connection).await {
            Ok(LeaveOutcome::Left) => {
                self.touch(code);
                self.affiliations.remove(&connection);
            }
            Ok(LeaveOutcome::Closed) => {
                self.forget(code);
                tracing::info!(%code, rooms = self.rooms.len(), "room closed by host");
            }
            Ok(LeaveOutcome::NotMember) => {}
            Err(e) => {
                tracing::warn!(%code, %connection, error = %e, "room actor gone, dropping room");
                self.forget(code);
            }
        }
    }

    /// Runs the leave path for whatever room `connection` was in.
    pub async fn disconnect(&mut self, connection: ConnectionId) {
        if let Some(code) = self.room_of(connection).cloned() {
            self.leave(&code, connection).await;
        }
    }

    /// Closes a room, notifying every member with `reason`.
    pub async fn delete(&mut self, code: &RoomCode, reason: CloseReason) -> Result<(), RoomError> {
        let entry = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let handle = entry.handle.clone();
        self.forget(code);
        let _ = handle.close(reason).await;
        tracing::info!(%code, ?reason, rooms = self.rooms.len(), "room deleted");
        Ok(())
    }

    /// Deletes every room idle for at least the configured TTL and
    /// returns their codes.
    pub async fn reap_idle(&mut self) -> Vec<RoomCode> {
        self.reap_idle_at(Instant::now()).await
    }

    /// [`reap_idle`](Self::reap_idle) against an explicit clock reading.
    pub async fn reap_idle_at(&mut self, now: Instant) -> Vec<RoomCode> {
        let ttl = self.config.idle_ttl;
        let expired: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.last_activity) >= ttl)
            .map(|(code, _)| code.clone())
            .collect();

        for code in &expired {
            let _ = self.delete(code, CloseReason::Idle).await;
        }
        if !expired.is_empty() {
            tracing::info!(reaped = expired.len(), rooms = self.rooms.len(), "idle rooms reaped");
        }
        expired
    }

    /// Closes every room with `reason` and returns how many there were.
    pub async fn close_all(&mut self, reason: CloseReason) -> usize {
        let codes: Vec<RoomCode> = self.rooms.keys().cloned().collect();
        for code in &codes {
            let _ = self.delete(code, reason).await;
        }
        codes.len()
    }

    pub async fn room_info(&self, code: &RoomCode) -> Result<RoomInfo, RoomError> {
        let handle = self
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.info().await
    }

    /// The room `connection` is currently in, if any.
    pub fn room_of(&self, connection: ConnectionId) -> Option<&RoomCode> {
        self.affiliations.get(&connection)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn handle(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Records activity on a room. Only accepted intents count.
    fn touch(&mut self, code: &RoomCode) {
        if let Some(entry) = self.rooms.get_mut(code) {
            entry.last_activity = Instant::now();
        }
    }

    /// A connection may be in one room at a time. Joining the room it's
    /// already in is left to the room, which knows whether it's the host.
    fn ensure_unaffiliated(
        &self,
        connection: ConnectionId,
        joining: Option<&RoomCode>,
    ) -> Result<(), RoomError> {
        match self.affiliations.get(&connection) {
            Some(current) if Some(current) != joining => Err(RoomError::Conflict(format!(
                "already in room {current}"
            ))),
            _ => Ok(()),
        }
    }

    fn forget(&mut self, code: &RoomCode) {
        self.rooms.remove(code);
        self.affiliations.retain(|_, c| c != code);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    fn sender() -> ConnectionSender {
        mpsc::unbounded_channel().0
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let mut registry = RoomRegistry::new(RoomConfig::default());
        let conn = ConnectionId::new(1);

        let err = registry.create(conn, "   ", "banana", sender()).unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
        let err = registry.create(conn, "Host", "", sender()).unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_create_twice_from_same_connection_conflicts() {
        let mut registry = RoomRegistry::new(RoomConfig::default());
        let conn = ConnectionId::new(1);
        let code = registry.create(conn, "Host", "banana", sender()).unwrap();

        let err = registry.create(conn, "Host", "kiwi", sender()).unwrap_err();
        assert!(matches!(err, RoomError::Conflict(_)));
        assert_eq!(registry.room_of(conn), Some(&code));
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn test_accepted_join_refreshes_activity() {
        let mut registry = RoomRegistry::new(RoomConfig::default());
        let code = registry
            .create(ConnectionId::new(1), "Host", "banana", sender())
            .unwrap();
        let before = registry.rooms[&code].last_activity;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let session = Session::new(ConnectionId::new(2));
        registry.join(&code, &session, "Ana", sender()).await.unwrap();
        assert!(registry.rooms[&code].last_activity > before);
    }

    #[tokio::test]
    async fn test_refused_intents_leave_activity_alone() {
        let mut registry = RoomRegistry::new(RoomConfig::default());
        let code = registry
            .create(ConnectionId::new(1), "Host", "banana", sender())
            .unwrap();
        let before = registry.rooms[&code].last_activity;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let stranger = ConnectionId::new(9);
        let err = registry
            .act(&code, stranger, RoomAction::Start)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::Authorization(_)));
        registry.leave(&code, stranger).await;

        let err = registry
            .act(&code, ConnectionId::new(1), RoomAction::Start)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::Precondition(_)));

        assert_eq!(registry.rooms[&code].last_activity, before);
        let reaped = registry.reap_idle_at(before + RoomConfig::default().idle_ttl).await;
        assert_eq!(reaped, vec![code]);
    }

    #[tokio::test]
    async fn test_close_all_empties_registry() {
        let mut registry = RoomRegistry::new(RoomConfig::default());
        registry
            .create(ConnectionId::new(1), "Host", "banana", sender())
            .unwrap();
        registry
            .create(ConnectionId::new(2), "Host", "kiwi", sender())
            .unwrap();

        assert_eq!(registry.close_all(CloseReason::Shutdown).await, 2);
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.room_of(ConnectionId::new(1)), None);
    }

    #[tokio::test]
    async fn test_reap_idle_at_uses_ttl() {
        let config = RoomConfig {
            idle_ttl: Duration::from_secs(60),
            ..RoomConfig::default()
        };
        let mut registry = RoomRegistry::new(config);
        let code = registry
            .create(ConnectionId::new(1), "Host", "banana", sender())
            .unwrap();
        let created = registry.rooms[&code].last_activity;

        let reaped = registry.reap_idle_at(created + Duration::from_secs(59)).await;
        assert!(reaped.is_empty());

        let reaped = registry.reap_idle_at(created + Duration::from_secs(60)).await;
        assert_eq!(reaped, vec![code.clone()]);
        assert!(registry.get(&code).is_none());
        assert_eq!(registry.room_of(ConnectionId::new(1)), None);
    }
}
