//! Domain types for kontrol jobs.
//!
//! These types mirror the configuration file one-to-one: a map of named
//! jobs, each with a cron schedule, an HTTP probe spec, and an ordered
//! list of remediation steps interpreted by the pipeline engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique name of a monitored job.
pub type JobName = String;

// ── Job configuration ──────────────────────────────────────────────

/// A single named health-probe-plus-remediation unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSpec {
    /// Cron schedule expression (6-field, e.g. `*/3 * * * * *`).
    pub schedule: String,
    /// The outbound health-check request.
    pub probe: ProbeSpec,
    /// Defer arming the schedule by this long after startup (e.g. "30s").
    #[serde(default)]
    pub delay: Option<String>,
    /// Ordered remediation steps, run after a failed probe.
    #[serde(default)]
    pub steps: Vec<ActionStep>,
    /// Notification policy. `None` disables notification for this job.
    #[serde(default)]
    pub notify: Option<NotifyMode>,
}

/// When to deliver notifications for a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// Only on the failure/recovery transition edge (default).
    Edge,
    /// On every failed tick, plus the recovery edge.
    Always,
}

/// The HTTP request that defines "is the target healthy".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeSpec {
    pub url: String,
    /// HTTP method, default GET.
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Query parameters appended to the URL.
    #[serde(default)]
    pub query: HashMap<String, String>,
    /// Per-attempt timeout (e.g. "10s").
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Additional attempts after the first failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout() -> String {
    "10s".to_string()
}

fn default_retries() -> u32 {
    1
}

// ── Remediation pipeline ───────────────────────────────────────────

/// Host-API operations the pipeline may invoke. A closed set: an unknown
/// command is a config deserialization error, not a runtime no-op.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    ListContainers,
    GetContainer,
    Stop,
    Restart,
    Remove,
}

impl HostCommand {
    /// Whether this command evicts its `target` from the object store
    /// after a successful call.
    pub fn is_removal(self) -> bool {
        matches!(self, HostCommand::Remove)
    }
}

impl std::fmt::Display for HostCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HostCommand::ListContainers => "list_containers",
            HostCommand::GetContainer => "get_container",
            HostCommand::Stop => "stop",
            HostCommand::Restart => "restart",
            HostCommand::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// One declarative remediation operation in a job's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionStep {
    pub command: HostCommand,
    /// Object-store entry to invoke the command on. Absent means the root
    /// host-API handle.
    #[serde(default)]
    pub target: Option<String>,
    /// Command options: string leaves are templates rendered against the
    /// object store, other literals pass through unchanged.
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    /// Narrows a collection result to matching elements.
    #[serde(default)]
    pub filter: Option<Filter>,
    /// Object-store name for the (possibly filtered) return value.
    #[serde(default)]
    pub result: Option<String>,
}

/// Predicate over a JSON object, used to narrow collection results.
///
/// `field` is a dotted path into the object (e.g. `State.Status`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// The field equals the given literal.
    FieldEquals {
        field: String,
        value: serde_json::Value,
    },
    /// The field is a string matching the regex.
    FieldMatches { field: String, pattern: String },
    /// The field is an array and at least one string element matches
    /// the regex.
    AnyElementMatches { field: String, pattern: String },
    /// All nested filters match.
    All { filters: Vec<Filter> },
}

// ── Health records ─────────────────────────────────────────────────

/// Outcome of the most recent probe for a job. Exactly one of the two
/// shapes, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HealthRecord {
    Passed {
        #[serde(rename = "statusCode")]
        status_code: u16,
        #[serde(rename = "statusMessage")]
        status_message: String,
    },
    Failed {
        error: String,
    },
}

impl HealthRecord {
    pub fn is_failure(&self) -> bool {
        matches!(self, HealthRecord::Failed { .. })
    }
}

/// Coarse health state derived from the record history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// No probe has completed yet.
    Unknown,
    Healthy,
    Unhealthy,
}
