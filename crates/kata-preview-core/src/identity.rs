//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

/// The identity of an authenticated caller, as issued by the identity
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Stable user ID (the token subject).
    pub uid: String,
}

impl CallerIdentity {
    /// Create an identity for a user ID.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }

    /// Whether this identity names a user at all.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.uid.trim().is_empty()
    }
}
