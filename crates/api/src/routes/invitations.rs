//! Club invitation routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::{
    AcceptInvitationRequest, ClubRole, CreateInvitationRequest, CreateInvitationResponse,
    InvitationResponse, Membership, ValidateInvitationResponse,
};
use domain::services::InvitationDraft;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct InvitationListResponse {
    pub invitations: Vec<InvitationResponse>,
}

#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub membership: Membership,
}

/// Caller's active role in the club, or 403.
async fn require_member(
    state: &AppState,
    user: &CurrentUser,
    club_id: Uuid,
) -> Result<ClubRole, ApiError> {
    state
        .clubs
        .role_in_club(user.user_id, club_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("You are not a member of this club".into()))
}

async fn require_invitation_manager(
    state: &AppState,
    user: &CurrentUser,
    club_id: Uuid,
) -> Result<ClubRole, ApiError> {
    let role = require_member(state, user, club_id).await?;
    if !role.can_manage_invitations() {
        return Err(ApiError::Forbidden(
            "You do not have permission to manage invitations for this club".into(),
        ));
    }
    Ok(role)
}

/// Create an invitation for a club.
///
/// POST /api/v1/clubs/:club_id/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreateInvitationResponse>), ApiError> {
    request.validate()?;
    let caller_role = require_invitation_manager(&state, &user, club_id).await?;

    let role: ClubRole = request.role.parse().map_err(ApiError::Validation)?;
    if !caller_role.can_invite(role) {
        return Err(ApiError::Forbidden(format!(
            "Your role ({}) cannot invite members as {}",
            caller_role, role
        )));
    }
    let issued = state
        .invitations
        .create(InvitationDraft {
            club_id,
            role,
            created_by: user.user_id,
            email: request.email,
            expires_in_days: request.expires_in_days,
        })
        .await?;

    let now = state.clock.now();
    Ok((
        StatusCode::CREATED,
        Json(CreateInvitationResponse {
            invitation: InvitationResponse::from_invitation(issued.invitation, now),
            invite_url: issued.signup_url,
        }),
    ))
}

/// List a club's invitations, newest first.
///
/// Members below head coach see tokens and emails masked.
///
/// GET /api/v1/clubs/:club_id/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(club_id): Path<Uuid>,
) -> Result<Json<InvitationListResponse>, ApiError> {
    let role = require_member(&state, &user, club_id).await?;
    let now = state.clock.now();

    let invitations = state
        .invitations
        .list_by_club(club_id)
        .await?
        .into_iter()
        .map(|inv| {
            let response = InvitationResponse::from_invitation(inv, now);
            if role.can_manage_invitations() {
                response
            } else {
                response.masked()
            }
        })
        .collect();

    Ok(Json(InvitationListResponse { invitations }))
}

/// Cancel an invitation.
///
/// DELETE /api/v1/invitations/:invitation_id
pub async fn cancel_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(invitation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let invitation = state.invitations.find_by_id(invitation_id).await?;
    require_invitation_manager(&state, &user, invitation.club_id).await?;

    state.invitations.cancel_invitation(invitation).await?;
    info!(
        invitation_id = %invitation_id,
        cancelled_by = %user.user_id,
        "Invitation cancel requested"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Check whether an invitation token can still be accepted.
///
/// GET /api/v1/invitations/:token/validate
pub async fn validate_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ValidateInvitationResponse>, ApiError> {
    let validation = state.invitations.validate(&token).await?;
    Ok(Json(ValidateInvitationResponse::from_validation(
        validation,
        state.clock.now(),
    )))
}

/// Accept an invitation as the signed-in user.
///
/// POST /api/v1/invitations/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<AcceptInvitationRequest>,
) -> Result<Json<AcceptInvitationResponse>, ApiError> {
    request.validate()?;

    let membership = state
        .invitations
        .accept(&request.token, &user.identity())
        .await?;
    Ok(Json(AcceptInvitationResponse { membership }))
}
