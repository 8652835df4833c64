//! Club and membership entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{Club, ClubWithRole, Membership, MembershipStatus};
use sqlx::FromRow;
use uuid::Uuid;

use super::parse_role;

/// Database row mapping for the clubs table.
#[derive(Debug, Clone, FromRow)]
pub struct ClubEntity {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<ClubEntity> for Club {
    fn from(entity: ClubEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the user_clubs table.
#[derive(Debug, Clone, FromRow)]
pub struct UserClubEntity {
    pub user_id: Uuid,
    pub club_id: Uuid,
    pub role: String,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

impl From<UserClubEntity> for Membership {
    fn from(entity: UserClubEntity) -> Self {
        Self {
            user_id: entity.user_id,
            club_id: entity.club_id,
            role: parse_role(&entity.role),
            status: entity
                .status
                .parse()
                .unwrap_or(MembershipStatus::Inactive),
            joined_at: entity.joined_at,
        }
    }
}

/// A club joined with the member's role.
#[derive(Debug, Clone, FromRow)]
pub struct ClubWithRoleEntity {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl From<ClubWithRoleEntity> for ClubWithRole {
    fn from(entity: ClubWithRoleEntity) -> Self {
        Self {
            club: Club {
                id: entity.id,
                name: entity.name,
                created_at: entity.created_at,
            },
            role: parse_role(&entity.role),
            joined_at: entity.joined_at,
        }
    }
}
