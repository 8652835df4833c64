//! Session repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{NewSession, Session};
use domain::repositories::{SessionStore, StoreError};
use sqlx::PgPool;

use crate::entities::SessionEntity;
use crate::metrics::QueryTimer;

/// Repository for session operations.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create(&self, session: NewSession) -> Result<Session, StoreError> {
        let timer = QueryTimer::new("create_session");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            INSERT INTO user_sessions (user_id, email, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, email, token_hash, expires_at, created_at
            "#,
        )
        .bind(session.user_id)
        .bind(&session.email)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let timer = QueryTimer::new("find_active_session");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            SELECT id, user_id, email, token_hash, expires_at, created_at
            FROM user_sessions
            WHERE token_hash = $1 AND expires_at >= $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn delete(&self, token_hash: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("delete_session");
        let result = sqlx::query("DELETE FROM user_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("delete_expired_sessions");
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
