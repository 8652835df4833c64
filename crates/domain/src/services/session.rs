//! Database-backed sessions created after a successful magic-link verification.

use chrono::Duration;
use std::sync::Arc;
use tracing::info;

use shared::crypto::{generate_secure_token, sha256_hex};

use super::error::AuthError;
use crate::models::{NewSession, Session, UserIdentity};
use crate::repositories::{Clock, SessionStore};

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// A new session together with the opaque token handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions,
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session for a verified identity. Only the token hash is stored.
    pub async fn create(&self, identity: &UserIdentity) -> Result<IssuedSession, AuthError> {
        let now = self.clock.now();
        let token = generate_secure_token();

        let session = self
            .sessions
            .create(NewSession {
                user_id: identity.user_id,
                email: identity.email.clone(),
                token_hash: sha256_hex(&token),
                expires_at: now + self.ttl,
                created_at: now,
            })
            .await?;

        info!(user_id = %session.user_id, session_id = %session.id, "Session created");
        Ok(IssuedSession { token, session })
    }

    /// Looks up the live session for a client token.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let now = self.clock.now();
        Ok(self.sessions.find_active(&sha256_hex(token), now).await?)
    }

    /// Ends the session for a client token. Returns true if one existed.
    pub async fn destroy(&self, token: &str) -> Result<bool, AuthError> {
        let deleted = self.sessions.delete(&sha256_hex(token)).await?;
        if deleted {
            info!("Session destroyed");
        }
        Ok(deleted)
    }
}
