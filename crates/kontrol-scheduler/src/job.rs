//! The job body: one tick of probe, tracking, notification, and
//! remediation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use kontrol_health::{HealthTracker, run_probe, should_notify};
use kontrol_host::HostApi;
use kontrol_notify::{Notification, Notifier, NotifyKind};
use kontrol_pipeline::{ObjectStore, run_steps};
use kontrol_state::{HealthBoard, HealthRecord, JobSpec, NotifyMode};

/// Long-lived state for one registered job.
pub struct JobContext {
    pub name: String,
    pub spec: JobSpec,
    /// Overlap guard: at most one in-flight body per job.
    is_running: AtomicBool,
    tracker: Mutex<HealthTracker>,
    /// Reused across ticks, hard-reset before every remediation run.
    store: Mutex<ObjectStore>,
}

impl JobContext {
    pub fn new(name: &str, spec: JobSpec) -> Self {
        Self {
            name: name.to_string(),
            spec,
            is_running: AtomicBool::new(false),
            tracker: Mutex::new(HealthTracker::new()),
            store: Mutex::new(ObjectStore::new()),
        }
    }

    /// Claim the job for one body execution. Returns false when a
    /// previous body is still in flight; that tick is dropped.
    pub fn try_begin(&self) -> bool {
        self.is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the overlap guard, success or not.
    pub fn finish(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

/// Shared collaborators handed to every job body.
#[derive(Clone)]
pub struct RunDeps {
    pub client: reqwest::Client,
    pub board: HealthBoard,
    pub host: Arc<dyn HostApi>,
    pub notifier: Notifier,
}

/// Execute one tick of a job to completion.
///
/// The probe outcome is fully recorded before any remediation step
/// begins. Every error is contained here; the function never fails.
pub async fn run_tick(ctx: &JobContext, deps: &RunDeps) {
    let job = ctx.name.as_str();
    info!(%job, "executing scheduled tick");

    let record = run_probe(&deps.client, &ctx.spec.probe).await;
    let transition = {
        let mut tracker = ctx.tracker.lock().await;
        tracker.record(record.clone())
    };
    deps.board.set(job, record.clone()).await;

    match &record {
        HealthRecord::Passed {
            status_code,
            status_message,
        } => {
            info!(%job, status_code, status_message, "probe passed");
            if let Some(mode) = ctx.spec.notify {
                if should_notify(mode, transition) {
                    info!(%job, "notifying healthy state");
                    deps.notifier
                        .send(&Notification {
                            job: job.to_string(),
                            kind: NotifyKind::Recovery,
                            detail: None,
                        })
                        .await;
                }
            }
        }
        HealthRecord::Failed { error } => {
            warn!(%job, %error, "probe failed");
            if let Some(mode) = ctx.spec.notify {
                if should_notify(mode, transition) {
                    info!(%job, "notifying healthcheck failure");
                    deps.notifier
                        .send(&Notification {
                            job: job.to_string(),
                            kind: NotifyKind::Failure,
                            detail: Some(error.clone()),
                        })
                        .await;
                }
            }
            remediate(ctx, deps).await;
        }
    }
}

/// Run the job's remediation pipeline, if it has one.
async fn remediate(ctx: &JobContext, deps: &RunDeps) {
    if ctx.spec.steps.is_empty() {
        return;
    }
    let job = ctx.name.as_str();
    info!(%job, steps = ctx.spec.steps.len(), "performing remediation");

    let mut store = ctx.store.lock().await;
    // Intermediate results must not leak across ticks.
    store.reset();

    match run_steps(deps.host.as_ref(), &ctx.spec.steps, &mut store).await {
        Ok(()) => info!(%job, "remediation completed"),
        Err(e) => {
            error!(%job, step = e.step, command = %e.command, error = %e, "remediation failed");
            // Reported regardless of the job's notify policy; the
            // dispatcher is a no-op without a webhook.
            deps.notifier
                .send(&Notification {
                    job: job.to_string(),
                    kind: NotifyKind::RemediationFailed,
                    detail: Some(e.to_string()),
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::json;

    use kontrol_host::testing::InMemoryHost;
    use kontrol_state::{ActionStep, Filter, HostCommand, ProbeSpec};

    fn probe_spec(url: String) -> ProbeSpec {
        ProbeSpec {
            url,
            method: "GET".to_string(),
            headers: HashMap::new(),
            query: HashMap::new(),
            timeout: "2s".to_string(),
            retries: 0,
        }
    }

    fn kontrol_spec(url: String) -> JobSpec {
        JobSpec {
            schedule: "*/3 * * * * *".to_string(),
            probe: probe_spec(url),
            delay: None,
            notify: Some(NotifyMode::Edge),
            steps: vec![
                ActionStep {
                    command: HostCommand::ListContainers,
                    target: None,
                    options: None,
                    filter: Some(Filter::AnyElementMatches {
                        field: "Names".to_string(),
                        pattern: ".*kontrol.*".to_string(),
                    }),
                    result: Some("container".to_string()),
                },
                ActionStep {
                    command: HostCommand::GetContainer,
                    target: None,
                    options: Some(json!("<%= container.Id %>")),
                    filter: None,
                    result: Some("container".to_string()),
                },
                ActionStep {
                    command: HostCommand::Stop,
                    target: Some("container".to_string()),
                    options: None,
                    filter: None,
                    result: None,
                },
                ActionStep {
                    command: HostCommand::Remove,
                    target: Some("container".to_string()),
                    options: None,
                    filter: None,
                    result: None,
                },
            ],
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn deps(host: Arc<InMemoryHost>) -> RunDeps {
        RunDeps {
            client: reqwest::Client::new(),
            board: HealthBoard::new(),
            host,
            notifier: Notifier::new(None),
        }
    }

    #[tokio::test]
    async fn failed_probe_triggers_the_full_remediation() {
        let base = serve(Router::new().route(
            "/healthcheck",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let host = Arc::new(InMemoryHost::with_containers(vec![
            json!({"Id": "abc123", "Names": ["/kontrol"]}),
            json!({"Id": "def456", "Names": ["/postgres"]}),
        ]));
        let ctx = JobContext::new("kontrol", kontrol_spec(format!("{base}/healthcheck")));
        let deps = deps(host.clone());

        run_tick(&ctx, &deps).await;

        assert_eq!(
            host.calls(),
            vec![
                "list_containers",
                "get_container abc123",
                "stop abc123",
                "remove abc123",
            ]
        );
        assert_eq!(host.container_ids(), vec!["def456"]);
        assert!(deps.board.get("kontrol").await.unwrap().is_failure());
        // The threaded entry is gone after the removal step.
        assert!(ctx.store.lock().await.get("container").is_none());
    }

    #[tokio::test]
    async fn passing_probe_skips_remediation() {
        let base = serve(Router::new().route("/healthcheck", get(|| async { "ok" }))).await;
        let host = Arc::new(InMemoryHost::with_containers(vec![
            json!({"Id": "abc123", "Names": ["/kontrol"]}),
        ]));
        let ctx = JobContext::new("kontrol", kontrol_spec(format!("{base}/healthcheck")));
        let deps = deps(host.clone());

        run_tick(&ctx, &deps).await;

        assert!(host.calls().is_empty());
        assert!(!deps.board.get("kontrol").await.unwrap().is_failure());
    }

    #[tokio::test]
    async fn object_store_is_reset_between_ticks() {
        let base = serve(Router::new().route(
            "/healthcheck",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        // Two matching containers: the filter keeps a 2-element list, so
        // step 2's template reference fails, leaving the list behind in
        // the store.
        let host = Arc::new(InMemoryHost::with_containers(vec![
            json!({"Id": "abc123", "Names": ["/kontrol-a"]}),
            json!({"Id": "def456", "Names": ["/kontrol-b"]}),
        ]));
        let ctx = JobContext::new("kontrol", kontrol_spec(format!("{base}/healthcheck")));
        let deps = deps(host.clone());

        run_tick(&ctx, &deps).await;
        assert_eq!(ctx.store.lock().await.len(), 1);

        // The next tick starts from the seeded state, not the leftovers.
        run_tick(&ctx, &deps).await;
        let calls = host.calls();
        // Both ticks began with a fresh list_containers.
        assert_eq!(
            calls.iter().filter(|c| c.as_str() == "list_containers").count(),
            2
        );
    }

    #[tokio::test]
    async fn edge_notification_fires_once_per_transition() {
        let flips = Arc::new(AtomicU32::new(0));
        let handler_flips = flips.clone();
        // Fails twice, then recovers.
        let router = Router::new()
            .route(
                "/healthcheck",
                get(|State(hits): State<Arc<AtomicU32>>| async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                        StatusCode::INTERNAL_SERVER_ERROR
                    } else {
                        StatusCode::OK
                    }
                }),
            )
            .with_state(handler_flips);
        let base = serve(router).await;

        let hooks: Arc<AtomicU32> = Arc::new(AtomicU32::new(0));
        let sink = hooks.clone();
        let hook_router = Router::new()
            .route(
                "/hook",
                axum::routing::post(|State(hits): State<Arc<AtomicU32>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .with_state(sink);
        let hook_base = serve(hook_router).await;

        let mut spec = kontrol_spec(format!("{base}/healthcheck"));
        spec.steps.clear();
        let ctx = JobContext::new("kontrol", spec);
        let deps = RunDeps {
            client: reqwest::Client::new(),
            board: HealthBoard::new(),
            host: Arc::new(InMemoryHost::new()),
            notifier: Notifier::new(Some(format!("{hook_base}/hook"))),
        };

        run_tick(&ctx, &deps).await; // fail → notify
        run_tick(&ctx, &deps).await; // fail again → silent
        run_tick(&ctx, &deps).await; // recover → notify
        run_tick(&ctx, &deps).await; // steady → silent

        assert_eq!(hooks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remediation_failure_is_contained_and_reported() {
        let base = serve(Router::new().route(
            "/healthcheck",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let host = Arc::new(InMemoryHost::with_containers(vec![
            json!({"Id": "abc123", "Names": ["/kontrol"]}),
        ]));
        host.fail_on("stop");
        let ctx = JobContext::new("kontrol", kontrol_spec(format!("{base}/healthcheck")));
        let deps = deps(host.clone());

        // Must not panic; the error stops at the job-run boundary.
        run_tick(&ctx, &deps).await;

        assert!(!host.calls().iter().any(|c| c.starts_with("remove")));
        assert!(deps.board.get("kontrol").await.unwrap().is_failure());
    }

    #[test]
    fn overlap_guard_admits_exactly_one_body() {
        let ctx = JobContext::new(
            "kontrol",
            kontrol_spec("http://127.0.0.1:1/".to_string()),
        );

        assert!(ctx.try_begin());
        assert!(ctx.is_running());
        // A second firing while in flight is refused.
        assert!(!ctx.try_begin());

        ctx.finish();
        assert!(!ctx.is_running());
        assert!(ctx.try_begin());
    }
}
