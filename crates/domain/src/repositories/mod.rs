//! Collaborator contracts used by the domain services.
//!
//! Stores are implemented with PostgreSQL in the `persistence` crate and by
//! [`InMemoryStore`] for tests. Every conditional update must be atomic in
//! the backing store, never guarded by an in-process lock alone.

pub mod clock;
pub mod mailer;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Club, ClubWithRole, Invitation, MagicLink, Membership, NewInvitation, NewMagicLink,
    NewSession, Session, User, UserIdentity,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use mailer::{MailError, Mailer, OutgoingEmail, SentEmail};
pub use memory::InMemoryStore;

/// Failure of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MagicLinkStore: Send + Sync {
    async fn create(&self, link: NewMagicLink) -> Result<MagicLink, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<MagicLink>, StoreError>;

    /// Marks the token used if it is still active at `now` and upserts the
    /// user for its email, in one transaction.
    ///
    /// Returns `None` when no active row matched.
    async fn consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserIdentity>, StoreError>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invitation>, StoreError>;

    /// Newest first.
    async fn list_by_club(&self, club_id: Uuid) -> Result<Vec<Invitation>, StoreError>;

    /// Forces `expires_at = now` on an active invitation.
    ///
    /// Returns `None` when no active row matched.
    async fn expire(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Invitation>, StoreError>;

    /// Marks the invitation used by `user_id` if it is still active at `now`
    /// and upserts the membership with the invitation's role, in one transaction.
    ///
    /// Returns `None` when no active row matched.
    async fn consume(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Membership>, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: NewSession) -> Result<Session, StoreError>;

    /// Finds a session by token hash that has not expired at `now`.
    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError>;

    /// Returns true if a session was deleted.
    async fn delete(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Deletes sessions that expired before `now`. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ClubStore: Send + Sync {
    /// Creates a club and makes `user_id` its admin atomically.
    async fn create_with_admin(
        &self,
        name: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Club, Membership), StoreError>;

    /// Clubs where the user has an active membership.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ClubWithRole>, StoreError>;

    async fn find_membership(
        &self,
        user_id: Uuid,
        club_id: Uuid,
    ) -> Result<Option<Membership>, StoreError>;

    async fn find_by_id(&self, club_id: Uuid) -> Result<Option<Club>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
}

/// Readiness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}
