//! Lifecycle state shared by magic-link tokens and invitations.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// State of a single-use token.
///
/// `Consumed` and `Expired` are terminal. A token that is past its expiry is
/// reported as `Expired` even if it was consumed before, so an expired link
/// always fails with the same reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Active,
    Consumed,
    Expired,
}

impl TokenState {
    /// Derives the state of a token at `now`.
    ///
    /// A token is `Active` iff it has no `used_at` and `now <= expires_at`.
    pub fn at(
        used_at: Option<DateTime<Utc>>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        if now > expires_at {
            TokenState::Expired
        } else if used_at.is_some() {
            TokenState::Consumed
        } else {
            TokenState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TokenState::Active)
    }
}
