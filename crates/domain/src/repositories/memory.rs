//! In-process store backing every store trait.
//!
//! Conditional updates run while the state lock is held, so each one is
//! atomic with respect to every other call on the same store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    ClubStore, InvitationStore, MagicLinkStore, SessionStore, StoreError, StoreHealth, UserStore,
};
use crate::models::{
    Club, ClubRole, ClubWithRole, Invitation, MagicLink, Membership, MembershipStatus,
    NewInvitation, NewMagicLink, NewSession, Session, TokenState, User, UserIdentity,
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    clubs: Vec<Club>,
    memberships: Vec<Membership>,
    magic_links: Vec<MagicLink>,
    invitations: Vec<Invitation>,
    sessions: Vec<Session>,
}

impl State {
    fn upsert_user(&mut self, email: &str, now: DateTime<Utc>) -> User {
        if let Some(user) = self.users.iter().find(|u| u.email == email) {
            return user.clone();
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            created_at: now,
            updated_at: now,
        };
        self.users.push(user.clone());
        user
    }

    fn upsert_membership(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        role: ClubRole,
        now: DateTime<Utc>,
    ) -> Membership {
        if let Some(existing) = self
            .memberships
            .iter_mut()
            .find(|m| m.user_id == user_id && m.club_id == club_id)
        {
            existing.role = role;
            existing.status = MembershipStatus::Active;
            return existing.clone();
        }
        let membership = Membership {
            user_id,
            club_id,
            role,
            status: MembershipStatus::Active,
            joined_at: now,
        };
        self.memberships.push(membership.clone());
        membership
    }

    /// Membership granted by an invitation. An active member keeps a higher role.
    fn grant_membership(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        role: ClubRole,
        now: DateTime<Utc>,
    ) -> Membership {
        let kept = self
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.club_id == club_id)
            .filter(|m| m.status == MembershipStatus::Active && m.role.has_at_least(role))
            .map(|m| m.role);
        self.upsert_membership(user_id, club_id, kept.unwrap_or(role), now)
    }
}

/// Mutex-guarded store for tests and local runs.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the user for `email`, creating it if absent.
    pub fn upsert_user(&self, email: &str, now: DateTime<Utc>) -> Result<User, StoreError> {
        Ok(self.lock()?.upsert_user(email, now))
    }

    /// Creates or updates a membership directly.
    pub fn add_member(
        &self,
        user_id: Uuid,
        club_id: Uuid,
        role: ClubRole,
        now: DateTime<Utc>,
    ) -> Result<Membership, StoreError> {
        Ok(self.lock()?.upsert_membership(user_id, club_id, role, now))
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl MagicLinkStore for InMemoryStore {
    async fn create(&self, link: NewMagicLink) -> Result<MagicLink, StoreError> {
        let mut state = self.lock()?;
        if state.magic_links.iter().any(|l| l.token == link.token) {
            return Err(StoreError::Unavailable(
                "duplicate magic link token".to_string(),
            ));
        }
        let link = MagicLink {
            id: Uuid::new_v4(),
            token: link.token,
            email: link.email,
            expires_at: link.expires_at,
            used_at: None,
            created_at: link.created_at,
        };
        state.magic_links.push(link.clone());
        Ok(link)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<MagicLink>, StoreError> {
        let state = self.lock()?;
        Ok(state.magic_links.iter().find(|l| l.token == token).cloned())
    }

    async fn consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let mut state = self.lock()?;
        let Some(link) = state
            .magic_links
            .iter_mut()
            .find(|l| l.token == token && l.state(now) == TokenState::Active)
        else {
            return Ok(None);
        };
        link.used_at = Some(now);
        let email = link.email.clone();

        let user = state.upsert_user(&email, now);
        Ok(Some(UserIdentity::from(&user)))
    }
}

#[async_trait]
impl InvitationStore for InMemoryStore {
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, StoreError> {
        let mut state = self.lock()?;
        let invitation = Invitation {
            id: Uuid::new_v4(),
            token: invitation.token,
            club_id: invitation.club_id,
            email: invitation.email,
            role: invitation.role,
            created_by: invitation.created_by,
            expires_at: invitation.expires_at,
            used_at: None,
            used_by: None,
            created_at: invitation.created_at,
        };
        state.invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        let state = self.lock()?;
        Ok(state.invitations.iter().find(|i| i.token == token).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invitation>, StoreError> {
        let state = self.lock()?;
        Ok(state.invitations.iter().find(|i| i.id == id).cloned())
    }

    async fn list_by_club(&self, club_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
        let state = self.lock()?;
        // Later insertions win ties on created_at.
        let mut invitations: Vec<Invitation> = state
            .invitations
            .iter()
            .rev()
            .filter(|i| i.club_id == club_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn expire(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Invitation>, StoreError> {
        let mut state = self.lock()?;
        let Some(invitation) = state
            .invitations
            .iter_mut()
            .find(|i| i.id == id && i.state(now) == TokenState::Active)
        else {
            return Ok(None);
        };
        invitation.expires_at = now;
        Ok(Some(invitation.clone()))
    }

    async fn consume(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Membership>, StoreError> {
        let mut state = self.lock()?;
        let Some(invitation) = state
            .invitations
            .iter_mut()
            .find(|i| i.token == token && i.state(now) == TokenState::Active)
        else {
            return Ok(None);
        };
        invitation.used_at = Some(now);
        invitation.used_by = Some(user_id);
        let (club_id, role) = (invitation.club_id, invitation.role);

        Ok(Some(state.grant_membership(user_id, club_id, role, now)))
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut state = self.lock()?;
        let session = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            email: session.email,
            token_hash: session.token_hash,
            expires_at: session.expires_at,
            created_at: session.created_at,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash && now <= s.expires_at)
            .cloned())
    }

    async fn delete(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.token_hash != token_hash);
        Ok(state.sessions.len() < before)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let before = state.sessions.len();
        state.sessions.retain(|s| now <= s.expires_at);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl ClubStore for InMemoryStore {
    async fn create_with_admin(
        &self,
        name: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Club, Membership), StoreError> {
        let mut state = self.lock()?;
        let club = Club {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
        };
        state.clubs.push(club.clone());
        let membership = state.upsert_membership(user_id, club.id, ClubRole::Admin, now);
        Ok((club, membership))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ClubWithRole>, StoreError> {
        let state = self.lock()?;
        let mut clubs: Vec<ClubWithRole> = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active())
            .filter_map(|m| {
                state
                    .clubs
                    .iter()
                    .find(|c| c.id == m.club_id)
                    .map(|club| ClubWithRole {
                        club: club.clone(),
                        role: m.role,
                        joined_at: m.joined_at,
                    })
            })
            .collect();
        clubs.sort_by(|a, b| a.club.name.cmp(&b.club.name));
        Ok(clubs)
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        club_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.club_id == club_id)
            .cloned())
    }

    async fn find_by_id(&self, club_id: Uuid) -> Result<Option<Club>, StoreError> {
        let state = self.lock()?;
        Ok(state.clubs.iter().find(|c| c.id == club_id).cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
