//! Per-job health state tracking and edge detection.

use kontrol_state::{HealthRecord, HealthState, NotifyMode};

/// How one observation relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered the unhealthy state (previous outcome was not a failure).
    Degraded,
    /// Failed again; already unhealthy.
    StillUnhealthy,
    /// Returned to healthy from unhealthy.
    Recovered,
    /// Succeeded without a preceding failure (includes the first tick).
    StillHealthy,
}

/// Current and previous probe outcome for one job.
///
/// `previous` exists only for edge detection: it is the outcome that was
/// current before the latest `record` call.
#[derive(Debug, Default)]
pub struct HealthTracker {
    health: Option<HealthRecord>,
    previous: Option<HealthRecord>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a probe outcome, rotating the previous record, and
    /// classify the transition.
    pub fn record(&mut self, record: HealthRecord) -> Transition {
        let was_failing = self.health.as_ref().is_some_and(HealthRecord::is_failure);
        self.previous = self.health.take();
        let is_failing = record.is_failure();
        self.health = Some(record);

        match (was_failing, is_failing) {
            (false, true) => Transition::Degraded,
            (true, true) => Transition::StillUnhealthy,
            (true, false) => Transition::Recovered,
            (false, false) => Transition::StillHealthy,
        }
    }

    pub fn health(&self) -> Option<&HealthRecord> {
        self.health.as_ref()
    }

    pub fn previous(&self) -> Option<&HealthRecord> {
        self.previous.as_ref()
    }

    pub fn state(&self) -> HealthState {
        match &self.health {
            None => HealthState::Unknown,
            Some(record) if record.is_failure() => HealthState::Unhealthy,
            Some(_) => HealthState::Healthy,
        }
    }
}

/// Whether a transition warrants a notification under the given policy.
///
/// Edge mode notifies only on entering/leaving the unhealthy state;
/// always mode additionally notifies on every repeated failure.
pub fn should_notify(mode: NotifyMode, transition: Transition) -> bool {
    match (mode, transition) {
        (_, Transition::Degraded | Transition::Recovered) => true,
        (NotifyMode::Always, Transition::StillUnhealthy) => true,
        _ => false,
    }
}
