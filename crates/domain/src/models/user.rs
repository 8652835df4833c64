//! User domain models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Application user, keyed by normalized email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity resolved from a consumed magic link or a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub email: String,
}

impl From<&User> for UserIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}
