//! The job registry — owns every job's timer task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use kontrol_host::HostApi;
use kontrol_notify::Notifier;
use kontrol_state::{HealthBoard, JobSpec, parse_duration};

use crate::error::{ScheduleError, ScheduleResult};
use crate::job::{JobContext, RunDeps, run_tick};

/// Per-job registry state.
struct JobSlot {
    /// Handle to the timer task.
    handle: JoinHandle<()>,
    /// Shutdown signal for this job's timer.
    shutdown_tx: watch::Sender<bool>,
}

/// Owns the scheduling lifecycle of all registered jobs.
///
/// Firings across different jobs are independent and may execute
/// concurrently; within one job, bodies are serialized by the overlap
/// guard.
pub struct JobRegistry {
    deps: RunDeps,
    jobs: Arc<RwLock<HashMap<String, JobSlot>>>,
}

impl JobRegistry {
    pub fn new(board: HealthBoard, host: Arc<dyn HostApi>, notifier: Notifier) -> Self {
        Self {
            deps: RunDeps {
                client: reqwest::Client::new(),
                board,
                host,
                notifier,
            },
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a job and arm its schedule (after the spec's optional
    /// startup delay). Fails on a bad cron expression, a bad delay, or
    /// a duplicate name.
    pub async fn register(&self, name: &str, spec: JobSpec) -> ScheduleResult<()> {
        let schedule: Schedule =
            spec.schedule
                .parse()
                .map_err(|source| ScheduleError::BadSchedule {
                    expr: spec.schedule.clone(),
                    source,
                })?;
        let delay = match &spec.delay {
            None => None,
            Some(d) => Some(
                parse_duration(d).ok_or_else(|| ScheduleError::BadDelay(d.clone()))?,
            ),
        };

        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(name) {
            return Err(ScheduleError::AlreadyRegistered(name.to_string()));
        }

        info!(job = %name, schedule = %spec.schedule, "registering job");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = Arc::new(JobContext::new(name, spec));
        let deps = self.deps.clone();
        let handle = tokio::spawn(async move {
            run_schedule(ctx, schedule, delay, deps, shutdown_rx).await;
        });

        jobs.insert(
            name.to_string(),
            JobSlot {
                handle,
                shutdown_tx,
            },
        );
        Ok(())
    }

    /// Names of all registered jobs.
    pub async fn job_names(&self) -> Vec<String> {
        let jobs = self.jobs.read().await;
        jobs.keys().cloned().collect()
    }

    /// Stop all future firings. In-flight bodies are not interrupted;
    /// they run to completion or natural timeout.
    pub async fn stop_all(&self) {
        let mut jobs = self.jobs.write().await;
        for (name, slot) in jobs.drain() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            debug!(job = %name, "schedule stopped");
        }
        info!("all job schedules stopped");
    }
}

/// The timer loop for one job.
async fn run_schedule(
    ctx: Arc<JobContext>,
    schedule: Schedule,
    delay: Option<Duration>,
    deps: RunDeps,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Some(delay) = delay {
        debug!(job = %ctx.name, ?delay, "deferring schedule start");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }
    }

    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            debug!(job = %ctx.name, "schedule exhausted");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if !ctx.try_begin() {
                    // Firings are not buffered; this tick is lost.
                    info!(job = %ctx.name, "skipping scheduled tick: previous run still in progress");
                    continue;
                }
                let ctx = ctx.clone();
                let deps = deps.clone();
                tokio::spawn(async move {
                    run_tick(&ctx, &deps).await;
                    ctx.finish();
                });
            }
            _ = shutdown.changed() => {
                debug!(job = %ctx.name, "schedule shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::Router;
    use axum::extract::State;
    use axum::routing::get;

    use kontrol_host::testing::InMemoryHost;
    use kontrol_state::ProbeSpec;

    fn job_spec(url: String, schedule: &str) -> JobSpec {
        JobSpec {
            schedule: schedule.to_string(),
            probe: ProbeSpec {
                url,
                method: "GET".to_string(),
                headers: StdHashMap::new(),
                query: StdHashMap::new(),
                timeout: "2s".to_string(),
                retries: 0,
            },
            delay: None,
            steps: Vec::new(),
            notify: None,
        }
    }

    fn registry() -> (JobRegistry, HealthBoard) {
        let board = HealthBoard::new();
        let registry = JobRegistry::new(
            board.clone(),
            Arc::new(InMemoryHost::new()),
            Notifier::new(None),
        );
        (registry, board)
    }

    #[tokio::test]
    async fn rejects_invalid_cron_expressions() {
        let (registry, _) = registry();
        let err = registry
            .register("bad", job_spec("http://127.0.0.1:1/".to_string(), "not a cron"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::BadSchedule { .. }));
    }

    #[tokio::test]
    async fn rejects_invalid_delay() {
        let (registry, _) = registry();
        let mut spec = job_spec("http://127.0.0.1:1/".to_string(), "* * * * * *");
        spec.delay = Some("soon".to_string());
        let err = registry.register("bad", spec).await.unwrap_err();
        assert!(matches!(err, ScheduleError::BadDelay(_)));
    }

    #[tokio::test]
    async fn rejects_duplicate_names() {
        let (registry, _) = registry();
        let spec = job_spec("http://127.0.0.1:1/".to_string(), "* * * * * *");
        registry.register("kontrol", spec.clone()).await.unwrap();
        let err = registry.register("kontrol", spec).await.unwrap_err();
        assert!(matches!(err, ScheduleError::AlreadyRegistered(name) if name == "kontrol"));
        registry.stop_all().await;
    }

    #[tokio::test]
    async fn stop_all_clears_the_registry() {
        let (registry, _) = registry();
        registry
            .register("a", job_spec("http://127.0.0.1:1/".to_string(), "* * * * * *"))
            .await
            .unwrap();
        registry
            .register("b", job_spec("http://127.0.0.1:1/".to_string(), "* * * * * *"))
            .await
            .unwrap();
        assert_eq!(registry.job_names().await.len(), 2);

        registry.stop_all().await;
        assert!(registry.job_names().await.is_empty());
    }

    #[tokio::test]
    async fn every_second_schedule_fires_and_records_health() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler_hits = hits.clone();
        let router = Router::new()
            .route(
                "/healthcheck",
                get(|State(hits): State<Arc<AtomicU32>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }),
            )
            .with_state(handler_hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let (registry, board) = registry();
        registry
            .register(
                "kontrol",
                job_spec(format!("http://{addr}/healthcheck"), "* * * * * *"),
            )
            .await
            .unwrap();

        // Wait past at least one firing.
        tokio::time::sleep(Duration::from_millis(2200)).await;
        registry.stop_all().await;

        assert!(hits.load(Ordering::SeqCst) >= 1);
        assert!(!board.get("kontrol").await.unwrap().is_failure());
    }

    #[tokio::test]
    async fn delayed_start_defers_the_first_firing() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler_hits = hits.clone();
        let router = Router::new()
            .route(
                "/healthcheck",
                get(|State(hits): State<Arc<AtomicU32>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }),
            )
            .with_state(handler_hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let (registry, _) = registry();
        let mut spec = job_spec(format!("http://{addr}/healthcheck"), "* * * * * *");
        spec.delay = Some("10s".to_string());
        registry.register("kontrol", spec).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        registry.stop_all().await;

        // Still inside the startup delay: nothing fired.
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overrunning_body_causes_skipped_ticks_not_queued_ones() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler_hits = hits.clone();
        // Each probe takes ~2.5s against a 1s schedule.
        let router = Router::new()
            .route(
                "/healthcheck",
                get(|State(hits): State<Arc<AtomicU32>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2500)).await;
                    "ok"
                }),
            )
            .with_state(handler_hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let (registry, _) = registry();
        let mut spec = job_spec(format!("http://{addr}/healthcheck"), "* * * * * *");
        spec.probe.timeout = "10s".to_string();
        registry.register("kontrol", spec).await.unwrap();

        // ~3.5 schedule firings; with a 2.5s body at most two bodies
        // can have started, the rest were skipped.
        tokio::time::sleep(Duration::from_millis(3600)).await;
        registry.stop_all().await;

        assert!(hits.load(Ordering::SeqCst) <= 2);
    }
}
