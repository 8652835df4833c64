//! Background jobs.

pub mod cleanup;
pub mod scheduler;

pub use cleanup::{PoolMetricsJob, RateLimitCleanupJob, SessionCleanupJob};
pub use scheduler::{Job, JobFrequency, JobScheduler};
