//! kontrold — the kontrol daemon.
//!
//! Assembles the subsystems:
//! - Health board (in-memory)
//! - Docker host client
//! - Webhook notifier
//! - Job registry (cron schedules, probes, remediation pipelines)
//! - Status API
//!
//! # Usage
//!
//! ```text
//! kontrold --config kontrol.toml --port 8080
//! ```
//!
//! Environment: `PORT`, `KONTROL_CONFIG`, and `KONTROL_WEBHOOK_URL` are
//! honored when the matching flag is absent. Without a webhook URL,
//! notifications are disabled.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use kontrol_host::DockerHost;
use kontrol_notify::Notifier;
use kontrol_scheduler::JobRegistry;
use kontrol_state::HealthBoard;

#[derive(Parser)]
#[command(name = "kontrold", about = "Self-healing HTTP healthcheck daemon")]
struct Cli {
    /// Path to the TOML job configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port for the status surface.
    #[arg(long)]
    port: Option<u16>,

    /// Webhook URL for notifications.
    #[arg(long)]
    webhook_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kontrold=debug,kontrol=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| std::env::var("KONTROL_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("kontrol.toml"));
    let config = config::load(&config_path)?;
    info!(path = %config_path.display(), jobs = config.jobs.len(), "configuration loaded");

    let port = cli
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(8080);
    let webhook_url = cli
        .webhook_url
        .or_else(|| std::env::var("KONTROL_WEBHOOK_URL").ok());

    // ── Initialize subsystems ──────────────────────────────────

    let board = HealthBoard::new();

    let host = Arc::new(DockerHost::new(config.host.socket.clone()));
    info!(socket = %config.host.socket, "host API client initialized");

    let notifier = Notifier::new(webhook_url);
    if notifier.is_enabled() {
        info!("webhook notifications enabled");
    } else {
        info!("no webhook configured, notifications disabled");
    }

    let registry = Arc::new(JobRegistry::new(board.clone(), host, notifier));
    let mut job_names = Vec::new();
    for (name, spec) in &config.jobs {
        registry.register(name, spec.clone()).await?;
        job_names.push(name.clone());
    }

    // ── Start the status surface ───────────────────────────────

    let router = kontrol_api::build_router(board, job_names, config.chaos);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "kontrol server listening");

    // Termination stops all schedules, then closes the listener.
    // In-flight job bodies run to completion.
    let shutdown_registry = registry.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("shutdown signal received, closing now");
        shutdown_registry.stop_all().await;
    });

    server.await?;
    info!("kontrol stopped");
    Ok(())
}

/// Completes on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
