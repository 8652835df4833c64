//! Housekeeping jobs: expired sessions, idle rate-limit keys and pool gauges.

use domain::repositories::{Clock, SessionStore};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::SignInRateLimiter;

/// Deletes session rows past their expiry.
pub struct SessionCleanupJob {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl SessionCleanupJob {
    pub fn new(sessions: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { sessions, clock }
    }
}

#[async_trait::async_trait]
impl Job for SessionCleanupJob {
    fn name(&self) -> &'static str {
        "session_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .sessions
            .delete_expired(self.clock.now())
            .await
            .map_err(|e| format!("Failed to delete expired sessions: {}", e))?;

        if deleted > 0 {
            info!(deleted, "Deleted expired sessions");
        }
        Ok(())
    }
}

/// Forgets sign-in limiter keys whose quota has fully refilled.
pub struct RateLimitCleanupJob {
    limiter: Arc<SignInRateLimiter>,
}

impl RateLimitCleanupJob {
    pub fn new(limiter: Arc<SignInRateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait::async_trait]
impl Job for RateLimitCleanupJob {
    fn name(&self) -> &'static str {
        "rate_limit_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(15)
    }

    async fn execute(&self) -> Result<(), String> {
        self.limiter.cleanup();
        Ok(())
    }
}

pub struct PoolMetricsJob {
    pool: PgPool,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        persistence::metrics::record_pool_metrics(&self.pool);
        Ok(())
    }
}
