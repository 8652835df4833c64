//! Magic link repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{MagicLink, NewMagicLink, User, UserIdentity};
use domain::repositories::{MagicLinkStore, StoreError};
use sqlx::PgPool;

use crate::entities::{MagicLinkEntity, UserEntity};
use crate::metrics::QueryTimer;

/// Repository for magic link operations.
#[derive(Clone)]
pub struct MagicLinkRepository {
    pool: PgPool,
}

impl MagicLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MagicLinkStore for MagicLinkRepository {
    async fn create(&self, link: NewMagicLink) -> Result<MagicLink, StoreError> {
        let timer = QueryTimer::new("create_magic_link");
        let result = sqlx::query_as::<_, MagicLinkEntity>(
            r#"
            INSERT INTO magic_links (token, email, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, token, email, expires_at, used_at, created_at
            "#,
        )
        .bind(&link.token)
        .bind(&link.email)
        .bind(link.expires_at)
        .bind(link.created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<MagicLink>, StoreError> {
        let timer = QueryTimer::new("find_magic_link_by_token");
        let result = sqlx::query_as::<_, MagicLinkEntity>(
            r#"
            SELECT id, token, email, expires_at, used_at, created_at
            FROM magic_links
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let timer = QueryTimer::new("consume_magic_link");
        let mut tx = self.pool.begin().await?;

        // Concurrent updates on the same row serialize on its lock; the loser
        // re-evaluates the predicate and matches zero rows.
        let consumed: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE magic_links
            SET used_at = $2
            WHERE token = $1 AND used_at IS NULL AND expires_at >= $2
            RETURNING email
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((email,)) = consumed else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        let user = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (email, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (email) DO UPDATE SET updated_at = EXCLUDED.updated_at
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(&email)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();

        let user: User = user.into();
        Ok(Some(UserIdentity::from(&user)))
    }
}

/// These run against a real Postgres and need `DATABASE_URL`.
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_link(token: &str, now: DateTime<Utc>) -> NewMagicLink {
        NewMagicLink {
            token: token.to_string(),
            email: "coach@example.com".to_string(),
            expires_at: now + Duration::minutes(15),
            created_at: now,
        }
    }

    #[sqlx::test(migrations = "src/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_consume_is_single_use(pool: PgPool) {
        let repo = MagicLinkRepository::new(pool);
        let now = Utc::now();
        repo.create(new_link("single-use", now)).await.unwrap();

        let identity = repo.consume("single-use", now).await.unwrap().unwrap();
        assert_eq!(identity.email, "coach@example.com");
        assert!(repo.consume("single-use", now).await.unwrap().is_none());

        let stored = repo.find_by_token("single-use").await.unwrap().unwrap();
        assert!(stored.used_at.is_some());
    }

    #[sqlx::test(migrations = "src/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_consume_respects_expiry_boundary(pool: PgPool) {
        let repo = MagicLinkRepository::new(pool);
        let now = Utc::now();
        repo.create(new_link("late", now)).await.unwrap();
        repo.create(new_link("edge", now)).await.unwrap();

        let late = now + Duration::minutes(16);
        assert!(repo.consume("late", late).await.unwrap().is_none());

        let edge = now + Duration::minutes(15);
        assert!(repo.consume("edge", edge).await.unwrap().is_some());
    }

    #[sqlx::test(migrations = "src/migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_consume_has_one_winner(pool: PgPool) {
        let repo = MagicLinkRepository::new(pool);
        let now = Utc::now();
        repo.create(new_link("raced", now)).await.unwrap();

        let (a, b) = tokio::join!(repo.consume("raced", now), repo.consume("raced", now));
        let winners = [a.unwrap(), b.unwrap()]
            .into_iter()
            .filter(Option::is_some)
            .count();
        assert_eq!(winners, 1);
    }
}
