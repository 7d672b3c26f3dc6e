//! Per-connection handler: decode intents, route them, ack them, and
//! forward room notifications.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task owns the connection's [`Session`] and a notification channel
//! whose sender is handed to every room the connection enters. One
//! `select!` loop interleaves:
//!   - inbound frames → [`Request`] → registry → exactly one [`Ack`]
//!   - room notifications → outbound frames

use std::sync::Arc;

use impostor_protocol::{
    Ack, AckData, Codec, Intent, Notification, PlayerToken, Request, RoomCode, ServerFrame,
};
use impostor_room::{ConnectionSender, RoomAction, RoomError};
use impostor_session::{IdentityVerifier, Session, SessionError, VerifiedIdentity};
use impostor_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ImpostorError;
use crate::server::ServerState;

/// Drop guard that runs the leave path for a connection when its handler
/// exits, however it exits.
///
/// `Drop` is synchronous, so the registry cleanup is spawned.
struct DisconnectGuard<V: IdentityVerifier, C: Codec> {
    connection: ConnectionId,
    state: Arc<ServerState<V, C>>,
}

impl<V: IdentityVerifier, C: Codec> Drop for DisconnectGuard<V, C> {
    fn drop(&mut self) {
        let connection = self.connection;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.rooms.lock().await.disconnect(connection).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<V, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<V, C>>,
) -> Result<(), ImpostorError>
where
    V: IdentityVerifier,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
    let mut session = Session::new(conn_id);
    let _guard = DisconnectGuard {
        connection: conn_id,
        state: Arc::clone(&state),
    };

    loop {
        tokio::select! {
            incoming = conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) if e.is_disconnect() => {
                        tracing::debug!(%conn_id, error = %e, "peer went away");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "recv failed");
                        break;
                    }
                };
                let ack = handle_frame(&state, &mut session, &tx, &data).await;
                send_frame(&conn, &state.codec, &ServerFrame::Ack(ack)).await?;
            }
            Some(notification) = rx.recv() => {
                tracing::trace!(%conn_id, event = notification.name(), "notify");
                send_frame(&conn, &state.codec, &ServerFrame::Event(notification)).await?;
            }
        }
    }

    // _guard drops here → leave path for whatever room we were in.
    Ok(())
}

/// Turns one inbound frame into its ack. Never fails: every problem is
/// reported to the client as a rejected ack.
async fn handle_frame<V, C>(
    state: &ServerState<V, C>,
    session: &mut Session,
    tx: &ConnectionSender,
    data: &[u8],
) -> Ack
where
    V: IdentityVerifier,
    C: Codec,
{
    let request = match Request::decode(&state.codec, data) {
        Ok(request) => request,
        Err(rejected) => {
            tracing::debug!(
                conn_id = %session.connection,
                error = %rejected.error,
                "malformed request"
            );
            let err = ImpostorError::from(rejected.error);
            return Ack::rejected(rejected.reference, err.kind(), err.to_string());
        }
    };

    let reference = request.reference;
    let intent = request.intent.name();
    match handle_intent(state, session, tx, request.intent).await {
        Ok(data) => {
            tracing::debug!(conn_id = %session.connection, intent, "intent accepted");
            Ack::with_data(reference, data)
        }
        Err(e) => {
            tracing::debug!(
                conn_id = %session.connection,
                intent,
                error = %e,
                "intent refused"
            );
            Ack::rejected(reference, e.kind(), e.to_string())
        }
    }
}

async fn handle_intent<V, C>(
    state: &ServerState<V, C>,
    session: &mut Session,
    tx: &ConnectionSender,
    intent: Intent,
) -> Result<AckData, ImpostorError>
where
    V: IdentityVerifier,
    C: Codec,
{
    let connection = session.connection;
    match intent {
        Intent::CreateRoom { host_name, word } => {
            let code = state
                .rooms
                .lock()
                .await
                .create(connection, &host_name, &word, tx.clone())?;
            Ok(AckData {
                code: Some(code),
                is_host: Some(true),
                ..AckData::default()
            })
        }

        Intent::JoinRoom {
            code,
            name,
            identity,
        } => {
            let code = parse_code(&code)?;
            // Verify outside the registry lock: the provider may be slow.
            if let Some(identity) = identity.filter(|id| !id.trim().is_empty()) {
                if state.verifier.is_enabled() {
                    let verified = verify(&state.verifier, &identity).await?;
                    session.set_verified(verified);
                } else {
                    session.set_claimed(&identity);
                }
            }
            let token = state
                .rooms
                .lock()
                .await
                .join(&code, session, &name, tx.clone())
                .await?;
            Ok(AckData {
                code: Some(code),
                token: Some(token),
                is_host: Some(false),
                ..AckData::default()
            })
        }

        Intent::StartGame { code } => act(state, connection, &code, RoomAction::Start).await,
        Intent::OpenVote { code } => act(state, connection, &code, RoomAction::OpenVote).await,
        Intent::CloseVote { code } => act(state, connection, &code, RoomAction::CloseVote).await,

        Intent::CastVote { code, target_token } => {
            let target = target_token.trim();
            if target.is_empty() {
                return Err(RoomError::Validation("target token is required".into()).into());
            }
            let action = RoomAction::CastVote(PlayerToken::new(target));
            act(state, connection, &code, action).await
        }

        Intent::NewRound { code, word } => {
            act(state, connection, &code, RoomAction::NewRound(word)).await
        }

        Intent::LeaveRoom { code } => {
            if let Some(code) = RoomCode::parse(&code) {
                state.rooms.lock().await.leave(&code, connection).await;
            }
            Ok(AckData::default())
        }

        Intent::VerifyIdentity { credential } => {
            let verified = verify(&state.verifier, &credential).await?;
            let data = AckData {
                email: Some(verified.email.clone()),
                name: Some(verified.name.clone()),
                ..AckData::default()
            };
            session.set_verified(verified);
            Ok(data)
        }
    }
}

async fn act<V, C>(
    state: &ServerState<V, C>,
    connection: ConnectionId,
    code: &str,
    action: RoomAction,
) -> Result<AckData, ImpostorError>
where
    V: IdentityVerifier,
    C: Codec,
{
    let code = parse_code(code)?;
    state
        .rooms
        .lock()
        .await
        .act(&code, connection, action)
        .await?;
    Ok(AckData::default())
}

async fn verify<V: IdentityVerifier>(
    verifier: &V,
    credential: &str,
) -> Result<VerifiedIdentity, SessionError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(SessionError::EmptyCredential);
    }
    verifier.verify(credential).await
}

fn parse_code(raw: &str) -> Result<RoomCode, RoomError> {
    RoomCode::parse(raw).ok_or_else(|| RoomError::Validation("room code is required".into()))
}

/// Encodes and sends one frame.
async fn send_frame(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    frame: &ServerFrame,
) -> Result<(), ImpostorError> {
    let bytes = codec.encode(frame)?;
    conn.send(&bytes).await?;
    Ok(())
}
