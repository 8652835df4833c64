//! Invitation repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{Invitation, Membership, NewInvitation};
use domain::repositories::{InvitationStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{InvitationEntity, UserClubEntity};
use crate::metrics::QueryTimer;

/// Repository for club invitation operations.
#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationStore for InvitationRepository {
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, StoreError> {
        let timer = QueryTimer::new("create_invitation");
        let result = sqlx::query_as::<_, InvitationEntity>(
            r#"
            INSERT INTO invitations (token, club_id, email, role, created_by, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, token, club_id, email, role, created_by, expires_at,
                      used_at, used_by, created_at
            "#,
        )
        .bind(&invitation.token)
        .bind(invitation.club_id)
        .bind(&invitation.email)
        .bind(invitation.role.as_str())
        .bind(invitation.created_by)
        .bind(invitation.expires_at)
        .bind(invitation.created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        let timer = QueryTimer::new("find_invitation_by_token");
        let result = sqlx::query_as::<_, InvitationEntity>(
            r#"
            SELECT id, token, club_id, email, role, created_by, expires_at,
                   used_at, used_by, created_at
            FROM invitations
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invitation>, StoreError> {
        let timer = QueryTimer::new("find_invitation_by_id");
        let result = sqlx::query_as::<_, InvitationEntity>(
            r#"
            SELECT id, token, club_id, email, role, created_by, expires_at,
                   used_at, used_by, created_at
            FROM invitations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn list_by_club(&self, club_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
        let timer = QueryTimer::new("list_invitations_by_club");
        let result = sqlx::query_as::<_, InvitationEntity>(
            r#"
            SELECT id, token, club_id, email, role, created_by, expires_at,
                   used_at, used_by, created_at
            FROM invitations
            WHERE club_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn expire(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Invitation>, StoreError> {
        let timer = QueryTimer::new("expire_invitation");
        let result = sqlx::query_as::<_, InvitationEntity>(
            r#"
            UPDATE invitations
            SET expires_at = $2
            WHERE id = $1 AND used_at IS NULL AND expires_at >= $2
            RETURNING id, token, club_id, email, role, created_by, expires_at,
                      used_at, used_by, created_at
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn consume(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Membership>, StoreError> {
        let timer = QueryTimer::new("consume_invitation");
        let mut tx = self.pool.begin().await?;

        let consumed: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            UPDATE invitations
            SET used_at = $3, used_by = $2
            WHERE token = $1 AND used_at IS NULL AND expires_at >= $3
            RETURNING club_id, role
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((club_id, role)) = consumed else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        let membership = sqlx::query_as::<_, UserClubEntity>(
            r#"
            INSERT INTO user_clubs (user_id, club_id, role, status, joined_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $4)
            ON CONFLICT (user_id, club_id) DO UPDATE
            SET role = CASE
                    WHEN user_clubs.status = 'active'
                         AND club_role_rank(user_clubs.role) >= club_role_rank(EXCLUDED.role)
                    THEN user_clubs.role
                    ELSE EXCLUDED.role
                END,
                status = 'active',
                updated_at = EXCLUDED.updated_at
            RETURNING user_id, club_id, role, status, joined_at
            "#,
        )
        .bind(user_id)
        .bind(club_id)
        .bind(&role)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(membership.into()))
    }
}
