//! Club and membership repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{Club, ClubRole, ClubWithRole, Membership};
use domain::repositories::{ClubStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ClubEntity, ClubWithRoleEntity, UserClubEntity};
use crate::metrics::QueryTimer;

/// Repository for club operations.
#[derive(Clone)]
pub struct ClubRepository {
    pool: PgPool,
}

impl ClubRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClubStore for ClubRepository {
    async fn create_with_admin(
        &self,
        name: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Club, Membership), StoreError> {
        let timer = QueryTimer::new("create_club");
        let mut tx = self.pool.begin().await?;

        let club = sqlx::query_as::<_, ClubEntity>(
            r#"
            INSERT INTO clubs (name, created_at, updated_at)
            VALUES ($1, $2, $2)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let membership = sqlx::query_as::<_, UserClubEntity>(
            r#"
            INSERT INTO user_clubs (user_id, club_id, role, status, joined_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $4)
            RETURNING user_id, club_id, role, status, joined_at
            "#,
        )
        .bind(user_id)
        .bind(club.id)
        .bind(ClubRole::Admin.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok((club.into(), membership.into()))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ClubWithRole>, StoreError> {
        let timer = QueryTimer::new("list_clubs_for_user");
        let result = sqlx::query_as::<_, ClubWithRoleEntity>(
            r#"
            SELECT c.id, c.name, c.created_at, uc.role, uc.joined_at
            FROM user_clubs uc
            JOIN clubs c ON c.id = uc.club_id
            WHERE uc.user_id = $1 AND uc.status = 'active'
            ORDER BY c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        club_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let timer = QueryTimer::new("find_membership");
        let result = sqlx::query_as::<_, UserClubEntity>(
            r#"
            SELECT user_id, club_id, role, status, joined_at
            FROM user_clubs
            WHERE user_id = $1 AND club_id = $2
            "#,
        )
        .bind(user_id)
        .bind(club_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn find_by_id(&self, club_id: Uuid) -> Result<Option<Club>, StoreError> {
        let timer = QueryTimer::new("find_club_by_id");
        let result = sqlx::query_as::<_, ClubEntity>(
            "SELECT id, name, created_at FROM clubs WHERE id = $1",
        )
        .bind(club_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }
}
