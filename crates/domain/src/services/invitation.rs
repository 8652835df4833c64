//! Club invitation lifecycle: create, validate, cancel, list and accept.

use chrono::Duration;
use metrics::counter;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared::crypto::generate_invite_token;
use shared::validation::normalize_email;

use super::error::AuthError;
use crate::models::invitation::{DEFAULT_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS};
use crate::models::{
    ClubRole, InvalidInvitationReason, Invitation, InvitationValidation, Membership, NewInvitation,
    TokenState, UserIdentity,
};
use crate::repositories::{Clock, InvitationStore};

/// Settings resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct InvitationSettings {
    /// Base URL that signup links point at.
    pub base_url: String,
    pub default_expiry_days: i64,
    pub max_expiry_days: i64,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            default_expiry_days: DEFAULT_EXPIRATION_DAYS,
            max_expiry_days: MAX_EXPIRATION_DAYS,
        }
    }
}

/// A freshly created invitation with its signup URL.
#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    pub signup_url: String,
}

/// Input to [`InvitationService::create`].
#[derive(Debug, Clone)]
pub struct InvitationDraft {
    pub club_id: Uuid,
    pub role: ClubRole,
    pub created_by: Uuid,
    pub email: Option<String>,
    pub expires_in_days: Option<i64>,
}

pub struct InvitationService {
    invitations: Arc<dyn InvitationStore>,
    clock: Arc<dyn Clock>,
    settings: InvitationSettings,
}

impl InvitationService {
    pub fn new(
        invitations: Arc<dyn InvitationStore>,
        clock: Arc<dyn Clock>,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            invitations,
            clock,
            settings,
        }
    }

    /// Persists a new invitation. Concurrent invitations for the same
    /// club and email may coexist.
    ///
    /// Rejects a non-positive or over-limit lifetime without writing anything.
    pub async fn create(&self, draft: InvitationDraft) -> Result<IssuedInvitation, AuthError> {
        let days = draft
            .expires_in_days
            .unwrap_or(self.settings.default_expiry_days);
        if days <= 0 || days > self.settings.max_expiry_days {
            return Err(AuthError::InvalidExpiration(days));
        }

        let email = draft
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty());
        let now = self.clock.now();

        let invitation = self
            .invitations
            .create(NewInvitation {
                token: generate_invite_token(),
                club_id: draft.club_id,
                email,
                role: draft.role,
                created_by: draft.created_by,
                expires_at: now + Duration::days(days),
                created_at: now,
            })
            .await?;

        counter!("invitations_created_total").increment(1);
        info!(
            invitation_id = %invitation.id,
            club_id = %invitation.club_id,
            role = %invitation.role,
            expires_at = %invitation.expires_at,
            "Invitation created"
        );

        let signup_url = self.signup_url(&invitation.token);
        Ok(IssuedInvitation {
            invitation,
            signup_url,
        })
    }

    /// Checks a token without changing any state.
    pub async fn validate(&self, token: &str) -> Result<InvitationValidation, AuthError> {
        let now = self.clock.now();
        let validation = match self.invitations.find_by_token(token).await? {
            None => InvitationValidation::Invalid(InvalidInvitationReason::NotFound),
            Some(invitation) => match invitation.state(now) {
                TokenState::Active => InvitationValidation::Valid(invitation),
                TokenState::Consumed => {
                    InvitationValidation::Invalid(InvalidInvitationReason::AlreadyUsed)
                }
                TokenState::Expired => {
                    InvitationValidation::Invalid(InvalidInvitationReason::Expired)
                }
            },
        };
        Ok(validation)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Invitation, AuthError> {
        self.invitations
            .find_by_id(id)
            .await?
            .ok_or(AuthError::InvitationNotFound)
    }

    /// Cancels an invitation by forcing its expiry to now.
    ///
    /// A consumed invitation cannot be cancelled. An expired one is returned unchanged.
    pub async fn cancel(&self, id: Uuid) -> Result<Invitation, AuthError> {
        let invitation = self.find_by_id(id).await?;
        self.cancel_invitation(invitation).await
    }

    /// Cancels an invitation the caller has already loaded.
    ///
    /// The expiry write is still conditional, so a stale copy cannot
    /// cancel an invitation consumed in the meantime.
    pub async fn cancel_invitation(&self, invitation: Invitation) -> Result<Invitation, AuthError> {
        let now = self.clock.now();
        match invitation.state(now) {
            TokenState::Consumed => Err(AuthError::TokenAlreadyUsed),
            TokenState::Expired => Ok(invitation),
            TokenState::Active => match self.invitations.expire(invitation.id, now).await? {
                Some(cancelled) => {
                    info!(
                        invitation_id = %cancelled.id,
                        club_id = %cancelled.club_id,
                        "Invitation cancelled"
                    );
                    Ok(cancelled)
                }
                None => Err(AuthError::TokenAlreadyUsed),
            },
        }
    }

    /// Newest first.
    pub async fn list_by_club(&self, club_id: Uuid) -> Result<Vec<Invitation>, AuthError> {
        Ok(self.invitations.list_by_club(club_id).await?)
    }

    /// Consumes an invitation for the signed-in user and grants its role in the club.
    pub async fn accept(
        &self,
        token: &str,
        identity: &UserIdentity,
    ) -> Result<Membership, AuthError> {
        let now = self.clock.now();
        let invitation = self
            .invitations
            .find_by_token(token)
            .await?
            .ok_or(AuthError::InvitationNotFound)?;

        match invitation.state(now) {
            TokenState::Expired => return Err(AuthError::TokenExpired),
            TokenState::Consumed => return Err(AuthError::TokenAlreadyUsed),
            TokenState::Active => {}
        }

        if !invitation.can_be_used_by(&identity.email) {
            info!(
                invitation_id = %invitation.id,
                user_id = %identity.user_id,
                "Invitation email mismatch"
            );
            return Err(AuthError::InvitationEmailMismatch);
        }

        let membership = self
            .invitations
            .consume(token, identity.user_id, now)
            .await?
            .ok_or(AuthError::TokenAlreadyUsed)?;

        counter!("invitations_accepted_total").increment(1);
        info!(
            invitation_id = %invitation.id,
            club_id = %membership.club_id,
            user_id = %membership.user_id,
            role = %membership.role,
            "Invitation accepted"
        );
        Ok(membership)
    }

    fn signup_url(&self, token: &str) -> String {
        format!(
            "{}/auth/signup?invite={}",
            self.settings.base_url.trim_end_matches('/'),
            token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryStore, ManualClock, StoreError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        service: Arc<InvitationService>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = Arc::new(InvitationService::new(
            store.clone(),
            clock.clone(),
            InvitationSettings {
                base_url: "https://club.example.com".to_string(),
                ..Default::default()
            },
        ));
        Fixture {
            store,
            clock,
            service,
        }
    }

    fn draft(role: ClubRole, email: Option<&str>, days: Option<i64>) -> InvitationDraft {
        InvitationDraft {
            club_id: Uuid::new_v4(),
            role,
            created_by: Uuid::new_v4(),
            email: email.map(str::to_string),
            expires_in_days: days,
        }
    }

    fn identity(f: &Fixture, email: &str) -> UserIdentity {
        let user = f.store.upsert_user(email, f.clock.now()).unwrap();
        UserIdentity::from(&user)
    }

    #[tokio::test]
    async fn test_create_builds_signup_url() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::Parent, Some(" Parent@Example.com"), None))
            .await
            .unwrap();

        assert_eq!(
            issued.signup_url,
            format!(
                "https://club.example.com/auth/signup?invite={}",
                issued.invitation.token
            )
        );
        assert_eq!(issued.invitation.email.as_deref(), Some("parent@example.com"));
        assert_eq!(
            issued.invitation.expires_at,
            f.clock.now() + Duration::days(7)
        );
    }

    #[tokio::test]
    async fn test_validate_scenario_over_time() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::HeadCoach, None, Some(7)))
            .await
            .unwrap();
        let token = issued.invitation.token;

        f.clock.advance(Duration::days(1));
        match f.service.validate(&token).await.unwrap() {
            InvitationValidation::Valid(invitation) => {
                assert_eq!(invitation.role, ClubRole::HeadCoach)
            }
            other => panic!("expected valid, got {other:?}"),
        }

        f.clock.advance(Duration::days(7));
        assert_eq!(
            f.service.validate(&token).await.unwrap(),
            InvitationValidation::Invalid(InvalidInvitationReason::Expired)
        );
    }

    #[tokio::test]
    async fn test_validate_unknown_token() {
        let f = fixture();
        assert_eq!(
            f.service.validate("missing").await.unwrap(),
            InvitationValidation::Invalid(InvalidInvitationReason::NotFound)
        );
    }

    #[tokio::test]
    async fn test_validate_does_not_mutate() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::Parent, None, None))
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(f
                .service
                .validate(&issued.invitation.token)
                .await
                .unwrap()
                .is_valid());
        }
        let stored = f.service.find_by_id(issued.invitation.id).await.unwrap();
        assert_eq!(stored, issued.invitation);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_expiry() {
        let f = fixture();
        let club = draft(ClubRole::Parent, None, Some(0));
        let club_id = club.club_id;

        assert!(matches!(
            f.service.create(club).await,
            Err(AuthError::InvalidExpiration(0))
        ));
        assert!(matches!(
            f.service.create(draft(ClubRole::Parent, None, Some(-3))).await,
            Err(AuthError::InvalidExpiration(-3))
        ));
        assert!(matches!(
            f.service.create(draft(ClubRole::Parent, None, Some(31))).await,
            Err(AuthError::InvalidExpiration(31))
        ));
        assert!(f.service.list_by_club(club_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_makes_invitation_expired() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::AssistantCoach, None, None))
            .await
            .unwrap();

        let cancelled = f.service.cancel(issued.invitation.id).await.unwrap();
        assert_eq!(cancelled.expires_at, f.clock.now());

        f.clock.advance(Duration::seconds(1));
        assert_eq!(
            f.service.validate(&issued.invitation.token).await.unwrap(),
            InvitationValidation::Invalid(InvalidInvitationReason::Expired)
        );
    }

    #[tokio::test]
    async fn test_cancel_consumed_invitation_rejected() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::Parent, None, None))
            .await
            .unwrap();
        let user = identity(&f, "parent@example.com");
        f.service
            .accept(&issued.invitation.token, &user)
            .await
            .unwrap();

        assert!(matches!(
            f.service.cancel(issued.invitation.id).await,
            Err(AuthError::TokenAlreadyUsed)
        ));
    }

    /// Counts lookups by id on top of the in-memory store.
    struct CountingStore {
        inner: Arc<InMemoryStore>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl InvitationStore for CountingStore {
        async fn create(&self, invitation: NewInvitation) -> Result<Invitation, StoreError> {
            InvitationStore::create(self.inner.as_ref(), invitation).await
        }

        async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
            InvitationStore::find_by_token(self.inner.as_ref(), token).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Invitation>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            InvitationStore::find_by_id(self.inner.as_ref(), id).await
        }

        async fn list_by_club(&self, club_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
            self.inner.list_by_club(club_id).await
        }

        async fn expire(
            &self,
            id: Uuid,
            now: DateTime<Utc>,
        ) -> Result<Option<Invitation>, StoreError> {
            self.inner.expire(id, now).await
        }

        async fn consume(
            &self,
            token: &str,
            user_id: Uuid,
            now: DateTime<Utc>,
        ) -> Result<Option<Membership>, StoreError> {
            InvitationStore::consume(self.inner.as_ref(), token, user_id, now).await
        }
    }

    #[tokio::test]
    async fn test_cancel_loaded_invitation_skips_second_lookup() {
        let f = fixture();
        let counting = Arc::new(CountingStore {
            inner: f.store.clone(),
            lookups: AtomicUsize::new(0),
        });
        let service = InvitationService::new(
            counting.clone(),
            f.clock.clone(),
            InvitationSettings::default(),
        );
        let issued = service
            .create(draft(ClubRole::Parent, None, None))
            .await
            .unwrap();

        let loaded = service.find_by_id(issued.invitation.id).await.unwrap();
        let cancelled = service.cancel_invitation(loaded).await.unwrap();
        assert_eq!(cancelled.expires_at, f.clock.now());
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_stale_copy_of_consumed_invitation() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::Parent, None, None))
            .await
            .unwrap();
        let stale = f.service.find_by_id(issued.invitation.id).await.unwrap();

        let user = identity(&f, "parent@example.com");
        f.service
            .accept(&issued.invitation.token, &user)
            .await
            .unwrap();

        assert!(matches!(
            f.service.cancel_invitation(stale).await,
            Err(AuthError::TokenAlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn test_cancel_unknown_invitation() {
        let f = fixture();
        assert!(matches!(
            f.service.cancel(Uuid::new_v4()).await,
            Err(AuthError::InvitationNotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_by_club_newest_first() {
        let f = fixture();
        let club_id = Uuid::new_v4();
        let mut created = Vec::new();
        for role in [ClubRole::Parent, ClubRole::AssistantCoach, ClubRole::HeadCoach] {
            let mut d = draft(role, None, None);
            d.club_id = club_id;
            created.push(f.service.create(d).await.unwrap().invitation.id);
            f.clock.advance(Duration::minutes(1));
        }
        f.service
            .create(draft(ClubRole::Parent, None, None))
            .await
            .unwrap();

        let listed: Vec<Uuid> = f
            .service
            .list_by_club(club_id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        created.reverse();
        assert_eq!(listed, created);
    }

    #[tokio::test]
    async fn test_accept_grants_role() {
        let f = fixture();
        let d = draft(ClubRole::HeadCoach, Some("coach@example.com"), None);
        let club_id = d.club_id;
        let issued = f.service.create(d).await.unwrap();
        let user = identity(&f, "coach@example.com");

        let membership = f
            .service
            .accept(&issued.invitation.token, &user)
            .await
            .unwrap();
        assert_eq!(membership.club_id, club_id);
        assert_eq!(membership.role, ClubRole::HeadCoach);
        assert!(membership.is_active());

        assert_eq!(
            f.service.validate(&issued.invitation.token).await.unwrap(),
            InvitationValidation::Invalid(InvalidInvitationReason::AlreadyUsed)
        );
    }

    #[tokio::test]
    async fn test_accept_email_mismatch() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::Parent, Some("parent@example.com"), None))
            .await
            .unwrap();
        let other = identity(&f, "someone@example.com");

        assert!(matches!(
            f.service.accept(&issued.invitation.token, &other).await,
            Err(AuthError::InvitationEmailMismatch)
        ));
        assert!(f
            .service
            .validate(&issued.invitation.token)
            .await
            .unwrap()
            .is_valid());
    }

    #[tokio::test]
    async fn test_accept_expired() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::Parent, None, Some(1)))
            .await
            .unwrap();
        let user = identity(&f, "parent@example.com");

        f.clock.advance(Duration::days(2));
        assert!(matches!(
            f.service.accept(&issued.invitation.token, &user).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_accept_unknown() {
        let f = fixture();
        let user = identity(&f, "parent@example.com");
        assert!(matches!(
            f.service.accept("nope", &user).await,
            Err(AuthError::InvitationNotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_accept_single_success() {
        let f = fixture();
        let issued = f
            .service
            .create(draft(ClubRole::Parent, None, None))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = f.service.clone();
            let token = issued.invitation.token.clone();
            let user = identity(&f, &format!("parent{i}@example.com"));
            handles.push(tokio::spawn(
                async move { service.accept(&token, &user).await },
            ));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AuthError::TokenAlreadyUsed) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_failed() {
        let f = fixture();
        f.store.set_unavailable(true);
        assert!(matches!(
            f.service.validate("any").await,
            Err(AuthError::PersistenceFailed(_))
        ));
    }
}
