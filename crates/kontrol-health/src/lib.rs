//! kontrol-health — the HTTP probe and the health state tracker.
//!
//! The probe turns a `ProbeSpec` into a single [`HealthRecord`]: a
//! success descriptor (status code + message) or a failure detail,
//! after bounded retries. The tracker rotates current/previous records
//! per job and classifies each observation as a state transition, which
//! drives edge-aware notification.

pub mod probe;
pub mod tracker;

pub use probe::run_probe;
pub use tracker::{HealthTracker, Transition, should_notify};
