use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use clap::Parser;
use signal_relay::{Switchboard, protocol};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::MakeSpan;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod config;
mod handlers;
mod metrics;
mod reaper;
#[cfg(test)]
mod test_helpers;
mod views;

use crate::config::{FileConfig, SignalingConfig};
use crate::metrics::ServerMetrics;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "signal-server")]
#[command(about = "Rendezvous relay for WebRTC peer signaling")]
struct Cli {
    /// Port to listen on (overrides [server].port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides [server].host)
    #[arg(long)]
    host: Option<String>,

    /// Config file (defaults to ./signal-server.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub switchboard: Arc<Switchboard>,
    pub signaling: Arc<SignalingConfig>,
    pub metrics: Arc<ServerMetrics>,
}

pub(crate) fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(protocol::ORIGIN_HEADER)])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .route("/", get(views::test_page))
        .route("/server_test.html", get(views::test_page))
        .route("/sign_in", get(handlers::sign_in))
        .route("/sign_out", get(handlers::sign_out))
        .route("/wait", get(handlers::wait))
        .route("/message", post(handlers::message))
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_directive = if cli.debug {
        "signal_server=debug,signal_relay=debug,tower_http=debug,info"
    } else {
        "signal_server=info,signal_relay=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let file_config: FileConfig = config::load_config(&config_path)
        .extract()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    let signaling = SignalingConfig::from_file(&file_config.signaling);
    info!(
        "Signaling: wait_timeout={:?}, reap_after={:?}",
        signaling.wait_timeout, signaling.reap_after
    );

    let state = AppState {
        switchboard: Arc::new(Switchboard::new()),
        signaling: Arc::new(signaling),
        metrics: Arc::new(ServerMetrics::new()),
    };

    let reaper = state.signaling.reap_after.map(|idle| {
        info!(
            "Reaping peers idle for more than {:?} (every {:?})",
            idle, state.signaling.reap_interval
        );
        reaper::spawn_reaper(
            state.switchboard.clone(),
            state.metrics.clone(),
            idle,
            state.signaling.reap_interval,
        )
    });

    let addr = config::listen_addr(&file_config.server, cli.host.as_deref(), cli.port)
        .context("Invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let actual_addr = listener.local_addr()?;

    info!("Signal server listening on http://{}", actual_addr);
    info!("");
    info!("Test page: http://{}/", actual_addr);
    info!("Endpoints:");
    info!("  GET    /sign_in?<name>            - Register and get the roster");
    info!("  GET    /sign_out?peer_id=<id>     - Leave");
    info!("  GET    /wait?peer_id=<id>         - Long-poll for the next delivery");
    info!("  POST   /message?peer_id=<id>&to=<id> - Relay a payload");
    info!("  GET    /health, /health/live, /metrics");

    // Parked waits keep connections open, so graceful shutdown gets a deadline
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, shutting down...");
        let _ = shutdown_tx.send(true);
    };
    let grace_elapsed = async move {
        if shutdown_rx.wait_for(|stopping| *stopping).await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    };

    let server = async move {
        axum::serve(listener, app(state))
            .with_graceful_shutdown(shutdown_signal)
            .await
    };
    let server_result = tokio::select! {
        result = server => result.context("Server error"),
        _ = grace_elapsed => {
            warn!("Grace period elapsed, dropping open long-polls");
            Ok(())
        }
    };

    if let Some(handle) = reaper {
        handle.abort();
    }

    info!("Shutdown complete");
    server_result
}
