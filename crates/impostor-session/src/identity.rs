//! Identity types.

use std::fmt;

/// What an identity provider vouched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: String,
}

impl VerifiedIdentity {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// The key a participant's score is kept under for the lifetime of a room.
///
/// Verified participants are keyed by email. Clients may also claim an
/// identity without verification (servers with no identity provider);
/// everyone else is keyed by display name. All are case-folded, and the
/// namespaces can't collide (`email:` / `id:` / `name:` prefixes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DurableIdentity(String);

impl DurableIdentity {
    /// Identity backed by a verified email address.
    pub fn from_email(email: &str) -> Self {
        Self(format!("email:{}", email.trim().to_lowercase()))
    }

    /// Identity the client asserted on join, unverified.
    pub fn from_claim(claim: &str) -> Self {
        Self(format!("id:{}", claim.trim().to_lowercase()))
    }

    /// Identity backed only by the name the participant typed.
    pub fn from_display_name(name: &str) -> Self {
        Self(format!("name:{}", name.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&VerifiedIdentity> for DurableIdentity {
    fn from(verified: &VerifiedIdentity) -> Self {
        Self::from_email(&verified.email)
    }
}

impl fmt::Display for DurableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
