//! Magic-link token models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::token::TokenState;

/// A persisted single-use login token bound to an email.
#[derive(Clone, PartialEq, Eq)]
pub struct MagicLink {
    pub id: Uuid,
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MagicLink {
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        TokenState::at(self.used_at, self.expires_at, now)
    }
}

impl std::fmt::Debug for MagicLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicLink")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .field("used_at", &self.used_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Input for persisting a new magic link.
#[derive(Debug, Clone)]
pub struct NewMagicLink {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct MagicLinkIssued {
    pub token: String,
    pub verification_url: String,
    pub expires_at: DateTime<Utc>,
    pub message_id: String,
}

/// Request body for asking for a login link.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: String,
}

/// Response body for a login link request.
///
/// The body is identical whether or not the email belongs to a known user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SignInResponse {
    pub success: bool,
    pub message: String,
}

/// Query string of the verification URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

/// Reason code carried back to the login page when verification fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    MissingToken,
    InvalidToken,
    VerificationFailed,
}

impl VerifyFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyFailure::MissingToken => "missing-token",
            VerifyFailure::InvalidToken => "invalid-token",
            VerifyFailure::VerificationFailed => "verification-failed",
        }
    }
}
