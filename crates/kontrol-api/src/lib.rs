//! kontrol-api — the aggregated-status HTTP endpoint.
//!
//! A pure read of the in-memory health board:
//!
//! ```text
//! GET /healthcheck → { "isRunning": true, "<job>": <health-record> }
//! ```
//!
//! Jobs that have not completed a tick yet render as `{}`. The response
//! is always 200 in normal operation; the config-gated chaos mode
//! randomizes 200/500 so a kontrol instance can probe itself through
//! its own failure path.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Map, Value, json};
use tower_http::cors::CorsLayer;
use tracing::warn;

use kontrol_state::HealthBoard;

/// Shared state for the status handler.
#[derive(Clone)]
pub struct ApiState {
    board: HealthBoard,
    /// All registered job names, so unticked jobs still appear.
    jobs: Vec<String>,
    /// Randomize the status code (test harness mode, off in production).
    chaos: bool,
}

/// Build the status router.
pub fn build_router(board: HealthBoard, jobs: Vec<String>, chaos: bool) -> Router {
    let state = ApiState { board, jobs, chaos };
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /healthcheck
async fn healthcheck(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.board.snapshot().await;

    let mut body = Map::new();
    body.insert("isRunning".to_string(), Value::Bool(true));
    for job in &state.jobs {
        let record = snapshot
            .get(job)
            .map(|r| serde_json::to_value(r).unwrap_or_else(|_| json!({})))
            .unwrap_or_else(|| json!({}));
        body.insert(job.clone(), record);
    }

    let status = if state.chaos && coin_flip() {
        warn!("chaos mode: reporting 500");
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    (status, Json(Value::Object(body)))
}

/// Unbiased 50/50, falling back to "healthy" if the entropy source
/// fails.
fn coin_flip() -> bool {
    let mut byte = [0u8; 1];
    getrandom::fill(&mut byte).map(|_| byte[0] % 2 == 0).unwrap_or(false)
}
