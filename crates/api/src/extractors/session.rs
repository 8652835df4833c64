//! Session cookie authentication extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::UserIdentity;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// The signed-in user, resolved from the `session` cookie.
///
/// Rejects with 401 when the cookie is missing, unknown or expired.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    /// Raw session token from the cookie, needed for sign-out.
    pub token: String,
}

impl CurrentUser {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            user_id: self.user_id,
            email: self.email.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = state
            .session_cookie
            .extract(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Not signed in".into()))?
            .to_string();

        let session = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".into()))?;

        Ok(CurrentUser {
            user_id: session.user_id,
            email: session.email,
            token,
        })
    }
}
