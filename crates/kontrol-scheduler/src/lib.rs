//! kontrol-scheduler — the job registry and scheduling loop.
//!
//! One independent cron timer task per job. Each firing either spawns
//! the job body (probe → tracker update → notification → remediation)
//! or, when the previous body is still in flight, skips — a missed tick
//! is logged and dropped, never queued. `stop_all` halts future firings
//! without aborting in-flight bodies.

pub mod error;
pub mod job;
pub mod registry;

pub use error::{ScheduleError, ScheduleResult};
pub use registry::JobRegistry;
