//! Club routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use domain::models::{ClubWithRole, CreateClubRequest};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct ClubListResponse {
    pub clubs: Vec<ClubWithRole>,
}

/// Create a club. The caller becomes its admin.
///
/// POST /api/v1/clubs
pub async fn create_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateClubRequest>,
) -> Result<(StatusCode, Json<ClubWithRole>), ApiError> {
    request.validate()?;

    let club = state.clubs.create_club(&request.name, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(club)))
}

/// GET /api/v1/clubs
pub async fn list_clubs(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ClubListResponse>, ApiError> {
    let clubs = state.clubs.my_clubs(user.user_id).await?;
    Ok(Json(ClubListResponse { clubs }))
}

/// Fetch one club with the caller's role.
///
/// Unknown clubs and clubs the caller does not belong to both answer 403.
///
/// GET /api/v1/clubs/:club_id
pub async fn get_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(club_id): Path<Uuid>,
) -> Result<Json<ClubWithRole>, ApiError> {
    state
        .clubs
        .club_for_member(user.user_id, club_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::Forbidden("You do not have access to this club".into()))
}
