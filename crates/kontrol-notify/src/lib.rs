//! kontrol-notify — best-effort webhook notifications.
//!
//! Message construction is a pure function of the transition context;
//! delivery is fire-and-forget. A delivery failure is logged and
//! discarded, never propagated, so the health-check loop's reliability
//! is independent of the sink's availability. Without a webhook URL the
//! dispatcher is silently disabled.

use serde_json::{Value, json};
use tracing::{debug, error};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// The job entered the unhealthy state (or failed again, in
    /// always-notify mode).
    Failure,
    /// The job returned to healthy.
    Recovery,
    /// The remediation pipeline itself failed.
    RemediationFailed,
}

/// Context for one notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub job: String,
    pub kind: NotifyKind,
    /// Error detail for failure kinds.
    pub detail: Option<String>,
}

/// Build the webhook body for a notification.
///
/// Uses the attachment format existing sinks expect: `color`,
/// `mrkdwn_in`, `text`.
pub fn build_message(notification: &Notification) -> Value {
    let job = &notification.job;
    let detail = notification.detail.as_deref().unwrap_or("");
    let (color, text) = match notification.kind {
        NotifyKind::Failure => (
            "danger",
            format!("*Healthcheck for task {job} failed*\n{detail}"),
        ),
        NotifyKind::Recovery => ("good", format!("*Task {job} is healthy again*")),
        NotifyKind::RemediationFailed => (
            "danger",
            format!("*Healing for task {job} failed*\n{detail}"),
        ),
    };

    json!({
        "attachments": [{
            "color": color,
            "mrkdwn_in": ["text"],
            "text": text.trim_end(),
        }]
    })
}

/// The webhook dispatcher.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Deliver a notification. Never fails; errors are logged and
    /// swallowed.
    pub async fn send(&self, notification: &Notification) {
        let Some(url) = &self.webhook_url else {
            debug!(job = %notification.job, "notification skipped: no webhook configured");
            return;
        };

        let body = build_message(notification);
        match self.client.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(job = %notification.job, kind = ?notification.kind, "notification delivered");
            }
            Ok(response) => {
                error!(
                    job = %notification.job,
                    status = %response.status(),
                    "notification for task rejected by sink"
                );
            }
            Err(e) => {
                error!(job = %notification.job, error = %e, "notification for task failed");
            }
        }
    }
}
