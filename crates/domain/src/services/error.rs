//! Error taxonomy for the token lifecycles.

use thiserror::Error;

use crate::repositories::{MailError, StoreError};

/// Failures of magic-link, invitation, session and club operations.
///
/// None of these are fatal. Callers map them to user-visible reason codes.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has already been used")]
    TokenAlreadyUsed,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Email delivery failed: {0}")]
    DeliveryFailed(String),

    /// Store failure. Retryable, and never reported as `InvalidToken`.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Invalid expiration: {0} days")]
    InvalidExpiration(i64),

    #[error("Invitation not found")]
    InvitationNotFound,

    #[error("Invitation was issued for a different email")]
    InvitationEmailMismatch,
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::PersistenceFailed(err.to_string())
    }
}

impl From<MailError> for AuthError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::DeliveryFailed(msg) => AuthError::DeliveryFailed(msg),
        }
    }
}
