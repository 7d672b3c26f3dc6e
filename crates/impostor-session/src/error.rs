//! Error types for the session layer.

use impostor_protocol::ErrorKind;

/// Errors raised while establishing who a connection belongs to.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The client sent a blank credential.
    #[error("credential is required")]
    EmptyCredential,

    /// The server was started without an identity provider.
    #[error("identity verification is not configured")]
    NotConfigured,

    /// The identity provider rejected the credential or could not be
    /// reached.
    #[error("identity verification failed: {0}")]
    VerificationFailed(String),
}

impl SessionError {
    /// Classifies the error for the ack sent back to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyCredential => ErrorKind::Validation,
            Self::NotConfigured | Self::VerificationFailed(_) => {
                ErrorKind::ExternalVerification
            }
        }
    }
}
