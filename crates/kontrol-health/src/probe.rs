//! The outbound health probe.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use kontrol_state::{HealthRecord, ProbeSpec, parse_duration};

/// Pause between probe attempts.
const RETRY_PAUSE: Duration = Duration::from_millis(250);

/// Execute one health probe with bounded retries.
///
/// A 2xx response is success; non-2xx, network errors, and timeouts are
/// failures. The probe never panics and never returns a transport error
/// to the caller — every outcome is a `HealthRecord`.
pub async fn run_probe(client: &Client, spec: &ProbeSpec) -> HealthRecord {
    let method = match reqwest::Method::from_bytes(spec.method.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            return HealthRecord::Failed {
                error: format!("invalid probe method: {}", spec.method),
            };
        }
    };
    let timeout = parse_duration(&spec.timeout).unwrap_or(Duration::from_secs(10));

    let attempts = spec.retries.saturating_add(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let mut request = client
            .request(method.clone(), &spec.url)
            .timeout(timeout)
            .query(&spec.query);
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return HealthRecord::Passed {
                        status_code: status.as_u16(),
                        status_message: status
                            .canonical_reason()
                            .unwrap_or("")
                            .to_string(),
                    };
                }
                last_error = format!("probe returned status {status}");
            }
            Err(e) => {
                last_error = format!("probe request failed: {e}");
            }
        }

        debug!(url = %spec.url, attempt, attempts, error = %last_error, "probe attempt failed");
        if attempt < attempts {
            tokio::time::sleep(RETRY_PAUSE).await;
        }
    }

    HealthRecord::Failed { error: last_error }
}
