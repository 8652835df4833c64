//! Magic link entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the magic_links table.
#[derive(Clone, FromRow)]
pub struct MagicLinkEntity {
    pub id: Uuid,
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<MagicLinkEntity> for domain::models::MagicLink {
    fn from(entity: MagicLinkEntity) -> Self {
        Self {
            id: entity.id,
            token: entity.token,
            email: entity.email,
            expires_at: entity.expires_at,
            used_at: entity.used_at,
            created_at: entity.created_at,
        }
    }
}
