//! Passwordless sign-in: magic-link request, verification and sessions.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use domain::models::{ClubWithRole, SignInRequest, SignInResponse, User, VerifyFailure, VerifyQuery};
use domain::services::AuthError;
use shared::validation::normalize_email;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::middleware::rate_limited_response;

pub const SIGN_IN_SUCCESS_MESSAGE: &str = "Check your email for a sign-in link.";
pub const SIGN_IN_FAILURE_MESSAGE: &str = "Failed to send magic link. Please try again.";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Request a login link by email.
///
/// POST /api/v1/auth/magic-link
pub async fn request_magic_link(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let email = normalize_email(&request.email);
    if let Err(retry_after) = state.sign_in_limiter.check(&email) {
        warn!(email = %email, retry_after, "Magic link rate limit exceeded");
        return Ok(rate_limited_response(retry_after));
    }

    // Same body for known and unknown addresses.
    match state.magic_links.issue(&email).await {
        Ok(_) => Ok(Json(SignInResponse {
            success: true,
            message: SIGN_IN_SUCCESS_MESSAGE.to_string(),
        })
        .into_response()),
        Err(e) => {
            warn!(email = %email, error = %e, "Magic link issuance failed");
            Err(ApiError::ServiceUnavailable(SIGN_IN_FAILURE_MESSAGE.to_string()))
        }
    }
}

/// Exchange a login link for a session.
///
/// GET /auth/verify?token=
pub async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Response {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return login_redirect(VerifyFailure::MissingToken);
    };

    let identity = match state.magic_links.verify(&token).await {
        Ok(identity) => identity,
        Err(e) => return login_redirect(verify_failure(&e)),
    };

    match state.sessions.create(&identity).await {
        Ok(issued) => {
            info!(user_id = %identity.user_id, "Signed in with magic link");
            (
                AppendHeaders([(header::SET_COOKIE, state.session_cookie.build(&issued.token))]),
                Redirect::to(DASHBOARD_PATH),
            )
                .into_response()
        }
        Err(e) => {
            warn!(user_id = %identity.user_id, error = %e, "Session creation failed");
            login_redirect(VerifyFailure::VerificationFailed)
        }
    }
}

/// Token problems are the caller's; anything else is ours.
fn verify_failure(error: &AuthError) -> VerifyFailure {
    match error {
        AuthError::InvalidToken | AuthError::TokenAlreadyUsed | AuthError::TokenExpired => {
            VerifyFailure::InvalidToken
        }
        _ => VerifyFailure::VerificationFailed,
    }
}

fn login_redirect(reason: VerifyFailure) -> Response {
    Redirect::to(&format!("/auth/login?error={}", reason.as_str())).into_response()
}

/// POST /api/v1/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    state.sessions.destroy(&user.token).await?;
    info!(user_id = %user.user_id, "Signed out");

    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, state.session_cookie.clear())]),
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub clubs: Vec<ClubWithRole>,
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
    let record = state
        .users
        .find_by_id(user.user_id)
        .await
        .map_err(AuthError::from)?
        .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".into()))?;

    let clubs = state.clubs.my_clubs(user.user_id).await?;

    Ok(Json(MeResponse {
        user: record,
        clubs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_map_to_invalid_token() {
        for error in [
            AuthError::InvalidToken,
            AuthError::TokenAlreadyUsed,
            AuthError::TokenExpired,
        ] {
            assert_eq!(verify_failure(&error), VerifyFailure::InvalidToken);
        }
    }

    #[test]
    fn test_persistence_failure_is_not_invalid_token() {
        let error = AuthError::PersistenceFailed("connection reset".into());
        assert_eq!(verify_failure(&error), VerifyFailure::VerificationFailed);
    }

    #[test]
    fn test_login_redirect_location() {
        let response = login_redirect(VerifyFailure::MissingToken);
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login?error=missing-token"
        );
    }
}
