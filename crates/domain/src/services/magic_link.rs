//! Magic-link issuance and verification.

use chrono::Duration;
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

use shared::crypto::generate_secure_token;
use shared::validation::normalize_email;

use super::error::AuthError;
use crate::models::{MagicLinkIssued, NewMagicLink, TokenState, UserIdentity};
use crate::repositories::{Clock, MagicLinkStore, Mailer, OutgoingEmail};

/// Default magic-link lifetime.
pub const DEFAULT_MAGIC_LINK_TTL_MINUTES: i64 = 15;

/// Settings resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct MagicLinkSettings {
    /// Base URL that verification links point at.
    pub base_url: String,
    pub ttl: Duration,
}

impl Default for MagicLinkSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            ttl: Duration::minutes(DEFAULT_MAGIC_LINK_TTL_MINUTES),
        }
    }
}

/// Issues single-use login links and exchanges them for a user identity.
pub struct MagicLinkService {
    links: Arc<dyn MagicLinkStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: MagicLinkSettings,
}

impl MagicLinkService {
    pub fn new(
        links: Arc<dyn MagicLinkStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: MagicLinkSettings,
    ) -> Self {
        Self {
            links,
            mailer,
            clock,
            settings,
        }
    }

    /// Persists a new token for `email` and mails the verification link.
    ///
    /// Every call mints an independent token; earlier tokens stay valid.
    pub async fn issue(&self, email: &str) -> Result<MagicLinkIssued, AuthError> {
        let email = normalize_email(email);
        let now = self.clock.now();
        let token = generate_secure_token();
        let expires_at = now + self.settings.ttl;

        self.links
            .create(NewMagicLink {
                token: token.clone(),
                email: email.clone(),
                expires_at,
                created_at: now,
            })
            .await
            .map_err(|e| {
                warn!(email = %email, error = %e, "Failed to persist magic link");
                AuthError::from(e)
            })?;

        let verification_url = self.verification_url(&token);
        let sent = self
            .mailer
            .send(self.render_email(&email, &verification_url))
            .await
            .map_err(|e| {
                warn!(email = %email, error = %e, "Failed to deliver magic link");
                AuthError::from(e)
            })?;

        counter!("magic_links_issued_total").increment(1);
        info!(
            email = %email,
            message_id = %sent.message_id,
            expires_at = %expires_at,
            "Magic link issued"
        );

        Ok(MagicLinkIssued {
            token,
            verification_url,
            expires_at,
            message_id: sent.message_id,
        })
    }

    /// Consumes `token` and resolves it to a user, creating the user on first sign-in.
    pub async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let result = self.verify_inner(token).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(AuthError::InvalidToken) => "invalid",
            Err(AuthError::TokenAlreadyUsed) => "already_used",
            Err(AuthError::TokenExpired) => "expired",
            Err(_) => "error",
        };
        counter!("magic_links_verified_total", "outcome" => outcome).increment(1);
        result
    }

    async fn verify_inner(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let now = self.clock.now();

        let Some(link) = self.links.find_by_token(token).await? else {
            info!("Magic link verification with unknown token");
            return Err(AuthError::InvalidToken);
        };

        match link.state(now) {
            TokenState::Expired => {
                info!(email = %link.email, "Magic link expired");
                return Err(AuthError::TokenExpired);
            }
            TokenState::Consumed => {
                info!(email = %link.email, "Magic link already used");
                return Err(AuthError::TokenAlreadyUsed);
            }
            TokenState::Active => {}
        }

        // Zero rows means a concurrent verification got there first.
        match self.links.consume(token, now).await? {
            Some(identity) => {
                info!(email = %identity.email, user_id = %identity.user_id, "Magic link verified");
                Ok(identity)
            }
            None => {
                info!(email = %link.email, "Magic link consumed concurrently");
                Err(AuthError::TokenAlreadyUsed)
            }
        }
    }

    fn verification_url(&self, token: &str) -> String {
        format!(
            "{}/auth/verify?token={}",
            self.settings.base_url.trim_end_matches('/'),
            token
        )
    }

    fn render_email(&self, email: &str, url: &str) -> OutgoingEmail {
        let minutes = self.settings.ttl.num_minutes();
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; line-height: 1.5;">
    <h2>Sign in to Clubhouse</h2>
    <p>Click the button below to sign in. This link expires in {minutes} minutes and can only be used once.</p>
    <p><a href="{url}" style="display: inline-block; padding: 12px 24px; background: #2563eb; color: #ffffff; text-decoration: none; border-radius: 6px;">Sign in</a></p>
    <p>If the button does not work, paste this URL into your browser:<br>{url}</p>
    <p>If you did not request this email, you can ignore it.</p>
  </body>
</html>"#
        );
        let text_body = format!(
            "Sign in to Clubhouse\n\n\
             Open this link to sign in (expires in {minutes} minutes, single use):\n\
             {url}\n\n\
             If you did not request this email, you can ignore it.\n"
        );

        OutgoingEmail {
            to: email.to_string(),
            subject: "Sign in to Clubhouse".to_string(),
            html_body,
            text_body: Some(text_body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryStore, ManualClock};
    use crate::services::test_support::RecordingMailer;
    use chrono::Utc;

    struct Fixture {
        store: Arc<InMemoryStore>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<ManualClock>,
        service: Arc<MagicLinkService>,
    }

    fn fixture_with(mailer: RecordingMailer) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(mailer);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = Arc::new(MagicLinkService::new(
            store.clone(),
            mailer.clone(),
            clock.clone(),
            MagicLinkSettings {
                base_url: "https://club.example.com/".to_string(),
                ttl: Duration::minutes(15),
            },
        ));
        Fixture {
            store,
            mailer,
            clock,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingMailer::default())
    }

    #[tokio::test]
    async fn test_issue_sends_verification_link() {
        let f = fixture();
        let issued = f.service.issue("  Coach@Example.COM ").await.unwrap();

        assert_eq!(
            issued.verification_url,
            format!("https://club.example.com/auth/verify?token={}", issued.token)
        );
        assert_eq!(issued.expires_at, f.clock.now() + Duration::minutes(15));

        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "coach@example.com");
        assert!(sent[0].html_body.contains(&issued.verification_url));
        assert!(sent[0]
            .text_body
            .as_deref()
            .unwrap()
            .contains(&issued.verification_url));
    }

    #[tokio::test]
    async fn test_issue_twice_gives_independent_tokens() {
        let f = fixture();
        let first = f.service.issue("parent@example.com").await.unwrap();
        let second = f.service.issue("parent@example.com").await.unwrap();
        assert_ne!(first.token, second.token);

        let a = f.service.verify(&second.token).await.unwrap();
        let b = f.service.verify(&first.token).await.unwrap();
        assert_eq!(a, b);

        assert!(matches!(
            f.service.verify(&first.token).await,
            Err(AuthError::TokenAlreadyUsed)
        ));
        assert!(matches!(
            f.service.verify(&second.token).await,
            Err(AuthError::TokenAlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn test_verify_unknown_token() {
        let f = fixture();
        assert!(matches!(
            f.service.verify("never-issued").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_verify_twice() {
        let f = fixture();
        let issued = f.service.issue("coach@example.com").await.unwrap();

        let identity = f.service.verify(&issued.token).await.unwrap();
        assert_eq!(identity.email, "coach@example.com");

        assert!(matches!(
            f.service.verify(&issued.token).await,
            Err(AuthError::TokenAlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn test_verify_expired() {
        let f = fixture();
        let issued = f.service.issue("coach@example.com").await.unwrap();

        f.clock.advance(Duration::minutes(15));
        f.clock.advance(Duration::seconds(1));
        assert!(matches!(
            f.service.verify(&issued.token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_verify_at_exact_expiry_succeeds() {
        let f = fixture();
        let issued = f.service.issue("coach@example.com").await.unwrap();

        f.clock.set(issued.expires_at);
        assert!(f.service.verify(&issued.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_wins_over_used() {
        let f = fixture();
        let issued = f.service.issue("coach@example.com").await.unwrap();
        f.service.verify(&issued.token).await.unwrap();

        f.clock.advance(Duration::hours(1));
        assert!(matches!(
            f.service.verify(&issued.token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_verification_single_success() {
        let f = fixture();
        let issued = f.service.issue("coach@example.com").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let service = f.service.clone();
            let token = issued.token.clone();
            handles.push(tokio::spawn(async move { service.verify(&token).await }));
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
    async fn test_issue_delivery_failure() {
        let f = fixture_with(RecordingMailer::failing());
        assert!(matches!(
            f.service.issue("coach@example.com").await,
            Err(AuthError::DeliveryFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_issue_persistence_failure() {
        let f = fixture();
        f.store.set_unavailable(true);
        assert!(matches!(
            f.service.issue("coach@example.com").await,
            Err(AuthError::PersistenceFailed(_))
        ));
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_verify_persistence_failure_is_not_invalid_token() {
        let f = fixture();
        let issued = f.service.issue("coach@example.com").await.unwrap();

        f.store.set_unavailable(true);
        assert!(matches!(
            f.service.verify(&issued.token).await,
            Err(AuthError::PersistenceFailed(_))
        ));

        f.store.set_unavailable(false);
        assert!(f.service.verify(&issued.token).await.is_ok());
    }
}
