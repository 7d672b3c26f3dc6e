//! Per-connection session record.

use impostor_transport::ConnectionId;

use crate::{DurableIdentity, VerifiedIdentity};

/// The server's record of one connected client.
///
/// Lives inside the connection task; it's created on accept and dropped
/// on disconnect. Nothing here is shared between connections.
#[derive(Debug, Clone)]
pub struct Session {
    /// The transport connection this session belongs to.
    pub connection: ConnectionId,

    /// Set by a successful `verify_identity` (or a join that carried a
    /// credential). Reused by later joins on the same connection.
    pub verified: Option<VerifiedIdentity>,

    /// Identity sent on a join when no provider is configured to check it.
    pub claimed: Option<String>,
}

impl Session {
    pub fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            verified: None,
            claimed: None,
        }
    }

    /// Records a verified identity for the rest of the connection.
    pub fn set_verified(&mut self, identity: VerifiedIdentity) {
        tracing::info!(
            conn_id = %self.connection,
            email = %identity.email,
            "identity verified"
        );
        self.verified = Some(identity);
    }

    /// Records an unverified identity. Blank claims are ignored.
    pub fn set_claimed(&mut self, claim: &str) {
        let claim = claim.trim();
        if claim.is_empty() {
            return;
        }
        tracing::debug!(conn_id = %self.connection, claim, "identity claimed");
        self.claimed = Some(claim.to_string());
    }

    /// The identity a join under `display_name` should be scored as:
    /// verified, then claimed, then the display name.
    pub fn durable_identity(&self, display_name: &str) -> DurableIdentity {
        if let Some(verified) = &self.verified {
            return DurableIdentity::from(verified);
        }
        match &self.claimed {
            Some(claim) => DurableIdentity::from_claim(claim),
            None => DurableIdentity::from_display_name(display_name),
        }
    }
}
