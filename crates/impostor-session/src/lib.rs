//! Who is on the other end of a connection.
//!
//! This crate handles the identity side of a connection:
//!
//! 1. **Verification**: exchanging an externally issued credential for a
//!    verified `{email, name}` ([`IdentityVerifier`] trait). Optional: a
//!    server built with [`NoVerifier`] treats display names as identities.
//! 2. **Durable identity**: the key scores are kept under across rounds
//!    ([`DurableIdentity`]).
//! 3. **Session**: per-connection record tying the two together
//!    ([`Session`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← keys players and scores by DurableIdentity
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below)  ← ErrorKind for acks
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod identity;
mod session;

pub use auth::{IdentityVerifier, NoVerifier};
pub use error::SessionError;
pub use identity::{DurableIdentity, VerifiedIdentity};
pub use session::Session;
