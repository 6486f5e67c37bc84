//! Card Toss Server
//!
//! Entry point for the match server. It handles:
//! - HTTP endpoints for creating, tossing and resetting matches
//! - WebSocket feeds of round events
//! - Session statistics shared by every match

use std::net::SocketAddr;

use card_toss::app::AppState;
use card_toss::config::Config;
use card_toss::http::build_router;
use card_toss::util::time::init_server_time;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Card Toss Server");
    info!("Server address: {}", config.server_addr);
    info!(
        announce_ms = config.timings.announce.as_millis() as u64,
        resolve_ms = config.timings.resolve.as_millis() as u64,
        seeded = config.toss_seed.is_some(),
        "Toss timings loaded"
    );

    // Create application state
    let state = AppState::new(config.clone());

    // Spawn abandoned-match sweeper
    let _sweeper = state
        .engine
        .spawn_sweeper(config.sweep_interval, config.match_idle_ttl);

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Match feed: ws://{}/matches/:id/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
