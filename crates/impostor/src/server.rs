//! `ImpostorServer` builder and server loop.
//!
//! This is the entry point for running the room server. It ties together
//! all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use impostor_protocol::{CloseReason, Codec, JsonCodec};
use impostor_room::{RoomConfig, RoomRegistry};
use impostor_session::IdentityVerifier;
use impostor_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::ImpostorError;
use crate::handler::handle_connection;

/// Shortest reaper period accepted, whatever the config says.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<V: IdentityVerifier, C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) verifier: V,
    pub(crate) codec: C,
}

/// Builder for configuring and starting the server.
///
/// # Example
///
/// ```rust,no_run
/// use impostor::prelude::*;
///
/// # async fn start() -> Result<(), ImpostorError> {
/// let server = ImpostorServer::builder()
///     .bind("0.0.0.0:3000")
///     .room_config(RoomConfig { min_players: 4, ..RoomConfig::default() })
///     .build(NoVerifier)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ImpostorServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl ImpostorServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration shared by every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Checks the room config, binds the listener and builds the server
    /// around `verifier`.
    ///
    /// Pass [`NoVerifier`](impostor_session::NoVerifier) to run without an
    /// identity provider.
    pub async fn build<V: IdentityVerifier>(
        self,
        verifier: V,
    ) -> Result<ImpostorServer<V, JsonCodec>, ImpostorError> {
        self.room_config.validate()?;
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let sweep_interval = self.room_config.sweep_interval.max(MIN_SWEEP_INTERVAL);
        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(self.room_config)),
            verifier,
            codec: JsonCodec,
        });

        Ok(ImpostorServer {
            transport,
            state,
            sweep_interval,
        })
    }
}

impl Default for ImpostorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound room server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ImpostorServer<V: IdentityVerifier, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<V, C>>,
    sweep_interval: Duration,
}

impl ImpostorServer<impostor_session::NoVerifier, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ImpostorServerBuilder {
        ImpostorServerBuilder::new()
    }
}

impl<V, C> ImpostorServer<V, C>
where
    V: IdentityVerifier,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop and the idle-room reaper until the process is
    /// terminated.
    pub async fn run(self) -> Result<(), ImpostorError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop and the idle-room reaper until `shutdown`
    /// completes, then closes every room with reason `shutdown`.
    ///
    /// Spawns a handler task for each accepted connection.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ImpostorError> {
        tracing::info!(
            addr = ?self.local_addr().ok(),
            identity_verification = self.state.verifier.is_enabled(),
            "impostor server running"
        );

        let reaper = spawn_reaper(Arc::clone(&self.state), self.sweep_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        reaper.abort();
        let closed = self
            .state
            .rooms
            .lock()
            .await
            .close_all(CloseReason::Shutdown)
            .await;
        tracing::info!(rooms = closed, "impostor server stopped");
        Ok(())
    }
}

/// Periodically closes rooms that have been idle longer than the TTL.
fn spawn_reaper<V: IdentityVerifier, C: Codec>(
    state: Arc<ServerState<V, C>>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.rooms.lock().await.reap_idle().await;
        }
    })
}
