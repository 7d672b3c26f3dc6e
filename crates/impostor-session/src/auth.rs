//! Hook for verifying an externally issued credential.
//!
//! The server doesn't talk to any identity provider itself. Deployments
//! that want verified identities implement [`IdentityVerifier`] (e.g. by
//! checking a Google ID token) and hand it to the server builder;
//! everyone else uses [`NoVerifier`].

use std::future::Future;

use crate::{SessionError, VerifiedIdentity};

/// Exchanges a credential for a verified identity.
///
/// Called from a connection task *before* the registry is locked, so a
/// slow provider never stalls other rooms.
///
/// # Example
///
/// ```rust
/// use impostor_session::{IdentityVerifier, SessionError, VerifiedIdentity};
///
/// /// Accepts "email|name" pairs. Development only.
/// struct PipeVerifier;
///
/// impl IdentityVerifier for PipeVerifier {
///     async fn verify(
///         &self,
///         credential: &str,
///     ) -> Result<VerifiedIdentity, SessionError> {
///         let (email, name) = credential.split_once('|').ok_or_else(|| {
///             SessionError::VerificationFailed("expected email|name".into())
///         })?;
///         Ok(VerifiedIdentity::new(email, name))
///     }
/// }
/// ```
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Verifies `credential` and returns who it belongs to.
    ///
    /// # Returns
    /// - `Ok(VerifiedIdentity)`: the provider vouches for this identity
    /// - `Err(SessionError::VerificationFailed)`: rejected or unreachable
    fn verify(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<VerifiedIdentity, SessionError>> + Send;

    /// Whether an identity provider is configured at all.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// The verifier of a server without an identity provider.
///
/// Every call fails with [`SessionError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerifier;

impl IdentityVerifier for NoVerifier {
    async fn verify(
        &self,
        _credential: &str,
    ) -> Result<VerifiedIdentity, SessionError> {
        Err(SessionError::NotConfigured)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_verifier_reports_not_configured() {
        let result = NoVerifier.verify("anything").await;
        assert!(matches!(result, Err(SessionError::NotConfigured)));
        assert!(!NoVerifier.is_enabled());
    }
}
