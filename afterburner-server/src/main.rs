// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Afterburner Exporter
//
//  Scrape:  axum on tokio, one pipeline run per /metrics request
//  Source:  MSI Afterburner remote server, GET /mahm (basic auth)
//  Config:  YAML file + AFTERBURNER_* env + CLI flags
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use afterburner_core::config::ExporterConfig;
use afterburner_server::server::{self, AppState};
use afterburner_upstream::{Fetcher, HttpMonitorClient};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "afterburner-exporter",
    version,
    about = "Prometheus exporter for MSI Afterburner remote monitoring"
)]
struct Cli {
    /// Path to configuration file (optional)
    #[arg(short, long, default_value = "afterburner.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Afterburner Exporter listen address
    #[arg(long)]
    listen: Option<String>,

    /// MSI Afterburner Remote Server address
    #[arg(long)]
    target: Option<String>,

    /// MSI Afterburner Remote Server password
    #[arg(long)]
    password: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ExporterConfig) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(target) = &self.target {
            config.upstream.target = target.clone();
        }
        if let Some(password) = &self.password {
            config.upstream.password = password.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Afterburner Exporter starting");

    // ── Config ──
    if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
    } else {
        info!("No config file found, using defaults");
    }
    let mut config = ExporterConfig::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;

    // ── Upstream ──
    let client = HttpMonitorClient::new(config.upstream.timeout(), config.upstream.max_body_bytes)?;
    let fetcher = Fetcher::new(&config.upstream, Arc::new(client));
    info!(
        upstream = %fetcher.url(),
        timeout_ms = config.upstream.timeout_ms,
        attempts = config.upstream.max_attempts(),
        "Upstream configured"
    );

    let state = Arc::new(AppState { fetcher });

    server::start(config.server, state, shutdown_signal()).await?;

    info!("Afterburner Exporter stopped");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping...");
}
