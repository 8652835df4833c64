//! Invitation entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::parse_role;

/// Database row mapping for the invitations table.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationEntity {
    pub id: Uuid,
    pub token: String,
    pub club_id: Uuid,
    pub email: Option<String>,
    pub role: String,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<InvitationEntity> for domain::models::Invitation {
    fn from(entity: InvitationEntity) -> Self {
        Self {
            id: entity.id,
            token: entity.token,
            club_id: entity.club_id,
            email: entity.email,
            role: parse_role(&entity.role),
            created_by: entity.created_by,
            expires_at: entity.expires_at,
            used_at: entity.used_at,
            used_by: entity.used_by,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{ClubRole, Invitation, TokenState};

    #[test]
    fn test_into_domain() {
        let now = Utc::now();
        let entity = InvitationEntity {
            id: Uuid::new_v4(),
            token: "Tok3nValue".to_string(),
            club_id: Uuid::new_v4(),
            email: None,
            role: "assistant_coach".to_string(),
            created_by: Uuid::new_v4(),
            expires_at: now,
            used_at: None,
            used_by: None,
            created_at: now,
        };

        let invitation: Invitation = entity.into();
        assert_eq!(invitation.role, ClubRole::AssistantCoach);
        assert_eq!(invitation.state(now), TokenState::Active);
    }
}
