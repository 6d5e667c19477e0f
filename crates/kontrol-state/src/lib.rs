//! kontrol-state — domain types shared across the kontrol subsystems.
//!
//! Holds the job/probe/step configuration model, the health record shapes,
//! and the in-memory `HealthBoard` that the scheduler writes and the status
//! API reads. Nothing here is persisted: all health state lives for the
//! process lifetime and resets on restart.

pub mod board;
pub mod duration;
pub mod types;

pub use board::HealthBoard;
pub use duration::parse_duration;
pub use types::*;
