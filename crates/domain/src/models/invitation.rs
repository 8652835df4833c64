//! Club invitation models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::role::ClubRole;
use super::token::TokenState;

/// Default expiration days for invitations.
pub const DEFAULT_EXPIRATION_DAYS: i64 = 7;

/// Maximum expiration days for invitations.
pub const MAX_EXPIRATION_DAYS: i64 = 30;

/// Placeholder shown instead of tokens and emails to members who cannot manage invitations.
pub const MASK: &str = "***";

/// A single-use invitation into a club.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: Uuid,
    pub token: String,
    pub club_id: Uuid,
    /// Target email; `None` for an open invitation.
    pub email: Option<String>,
    pub role: ClubRole,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        TokenState::at(self.used_at, self.expires_at, now)
    }

    /// Check if this invitation can be used by the given email.
    ///
    /// Open invitations can be used by anyone.
    pub fn can_be_used_by(&self, email: &str) -> bool {
        match self.email.as_deref() {
            None | Some("") => true,
            Some(target) => target.eq_ignore_ascii_case(email.trim()),
        }
    }
}

/// Input for persisting a new invitation.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub token: String,
    pub club_id: Uuid,
    pub email: Option<String>,
    pub role: ClubRole,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Why an invitation token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvalidInvitationReason {
    NotFound,
    AlreadyUsed,
    Expired,
}

/// Outcome of validating an invitation token. Validation never mutates state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationValidation {
    Valid(Invitation),
    Invalid(InvalidInvitationReason),
}

impl InvitationValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, InvitationValidation::Valid(_))
    }
}

/// Request to create a new invitation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateInvitationRequest {
    /// Email of the invitee; omit for an open invitation.
    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: Option<String>,

    #[validate(custom(function = "shared::validation::validate_role"))]
    pub role: String,

    /// Days until expiration (1-30, default: 7).
    #[validate(range(
        min = 1,
        max = 30,
        message = "Expiration must be between 1 and 30 days"
    ))]
    pub expires_in_days: Option<i64>,
}

/// Invitation as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationResponse {
    pub id: Uuid,
    pub club_id: Uuid,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: ClubRole,
    pub status: TokenState,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl InvitationResponse {
    pub fn from_invitation(invitation: Invitation, now: DateTime<Utc>) -> Self {
        let status = invitation.state(now);
        Self {
            id: invitation.id,
            club_id: invitation.club_id,
            token: invitation.token,
            email: invitation.email,
            role: invitation.role,
            status,
            created_by: invitation.created_by,
            expires_at: invitation.expires_at,
            created_at: invitation.created_at,
            used_at: invitation.used_at,
        }
    }

    /// Hide the token and the target email.
    pub fn masked(mut self) -> Self {
        self.token = MASK.to_string();
        self.email = self.email.map(|_| MASK.to_string());
        self
    }
}

/// Response after creating an invitation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateInvitationResponse {
    pub invitation: InvitationResponse,
    pub invite_url: String,
}

/// Response for the public validation endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidateInvitationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation: Option<InvitationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<InvalidInvitationReason>,
}

impl ValidateInvitationResponse {
    pub fn from_validation(validation: InvitationValidation, now: DateTime<Utc>) -> Self {
        match validation {
            InvitationValidation::Valid(invitation) => Self {
                valid: true,
                invitation: Some(InvitationResponse::from_invitation(invitation, now)),
                reason: None,
            },
            InvitationValidation::Invalid(reason) => Self {
                valid: false,
                invitation: None,
                reason: Some(reason),
            },
        }
    }
}

/// Request to accept an invitation as the signed-in user.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct AcceptInvitationRequest {
    #[validate(length(min = 1, message = "Invitation token is required"))]
    pub token: String,
}
