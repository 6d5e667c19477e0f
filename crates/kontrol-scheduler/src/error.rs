//! Scheduler error types.

use thiserror::Error;

/// Result type alias for registry operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors that can occur registering a job.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {expr:?}: {source}")]
    BadSchedule {
        expr: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("invalid delay: {0:?}")]
    BadDelay(String),

    #[error("job already registered: {0}")]
    AlreadyRegistered(String),
}
