//! Club creation and membership lookups.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::AuthError;
use crate::models::{ClubRole, ClubWithRole};
use crate::repositories::{Clock, ClubStore};

pub struct ClubService {
    clubs: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
}

impl ClubService {
    pub fn new(clubs: Arc<dyn ClubStore>, clock: Arc<dyn Clock>) -> Self {
        Self { clubs, clock }
    }

    /// Creates a club with the caller as its admin.
    pub async fn create_club(&self, name: &str, user_id: Uuid) -> Result<ClubWithRole, AuthError> {
        let now = self.clock.now();
        let (club, membership) = self
            .clubs
            .create_with_admin(name.trim(), user_id, now)
            .await?;

        info!(club_id = %club.id, user_id = %user_id, "Club created");
        Ok(ClubWithRole {
            club,
            role: membership.role,
            joined_at: membership.joined_at,
        })
    }

    pub async fn my_clubs(&self, user_id: Uuid) -> Result<Vec<ClubWithRole>, AuthError> {
        Ok(self.clubs.list_for_user(user_id).await?)
    }

    /// A club together with the caller's membership. `None` unless they are an active member.
    pub async fn club_for_member(
        &self,
        user_id: Uuid,
        club_id: Uuid,
    ) -> Result<Option<ClubWithRole>, AuthError> {
        let Some(membership) = self
            .clubs
            .find_membership(user_id, club_id)
            .await?
            .filter(|m| m.is_active())
        else {
            return Ok(None);
        };

        let club = self.clubs.find_by_id(club_id).await?;
        Ok(club.map(|club| ClubWithRole {
            club,
            role: membership.role,
            joined_at: membership.joined_at,
        }))
    }

    /// The caller's role in a club, if they are an active member.
    pub async fn role_in_club(
        &self,
        user_id: Uuid,
        club_id: Uuid,
    ) -> Result<Option<ClubRole>, AuthError> {
        let membership = self.clubs.find_membership(user_id, club_id).await?;
        Ok(membership.filter(|m| m.is_active()).map(|m| m.role))
    }
}
