//! # Lodge - Email Verification Service
//!
//! Issues short-lived, single-use numeric codes that confirm a guest owns an
//! email address before a booking payment is confirmed.
//!
//! ## Architecture
//! ```text
//! Booking flow ──► POST /verification/codes ──► CodeIssuer ──► Store
//!                                                   │
//!                                                   └──► CodeSink (email)
//! Guest ─────────► POST /verification/validate ─► CodeValidator ──► Store
//!                                                   Sweeper ───────► Store
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use axum::http::StatusCode;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod delivery;
mod routes;
mod state;
mod verification;

use config::AppConfig;
use delivery::LogSink;
use state::AppState;
use verification::sweeper_worker;

/// Lodge - email verification codes for booking confirmation
#[derive(Parser, Debug)]
#[command(name = "lodge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/lodge.toml")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before clap reads env-backed flags
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🏨 Starting Lodge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state (owns the verification store)
    let state = AppState::new(config.clone(), Arc::new(LogSink))?;
    tracing::warn!("Using the log delivery sink; codes are only visible at debug level");
    info!(
        shards = state.store.shard_count(),
        code_ttl_secs = config.verification.code_ttl_secs,
        "✅ Verification store ready"
    );

    // Spawn expired-code sweeper
    let sweeper = tokio::spawn(sweeper_worker(
        state.store.clone(),
        state.clock.clone(),
        state.stats.clone(),
        Duration::from_secs(config.verification.sweep_interval_secs),
        shutdown_tx.subscribe(),
    ));

    // Build router
    let app = routes::create_router(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Lodge listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    sweeper.await.context("Sweeper task failed")?;

    info!("👋 Lodge shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}
