//! FlowFi API Binary
//!
//! Starts the stream intake and event API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin flowfi-api
//! ```
//!
//! # Environment Variables
//!
//! - `FLOWFI_HOST`: Bind address (default: 0.0.0.0)
//! - `PORT`: HTTP port (default: 3001)
//! - `SANDBOX_MODE_ENABLED`: Allow sandbox requests (default: false)
//! - `SANDBOX_ALLOW_HEADER`: Honour the sandbox header (default: true)
//! - `SANDBOX_ALLOW_QUERY_PARAM`: Honour the sandbox query parameter (default: true)
//! - `SANDBOX_HEADER_NAME`: Sandbox header (default: X-Sandbox-Mode)
//! - `SANDBOX_QUERY_PARAM_NAME`: Sandbox query parameter (default: sandbox)
//! - `FLOWFI_SUBSCRIBER_BUFFER`: Events buffered per SSE client (default: 64)
//! - `FLOWFI_MAX_SUBSCRIBERS_PER_KEY`: SSE clients per stream or user (default: 256)
//! - `FLOWFI_SSE_KEEP_ALIVE_SECS`: SSE keep-alive interval (default: 15)
//! - `OTEL_ENABLED`: Export traces over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: flowfi-api)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use flowfi_api::infrastructure::telemetry;
use flowfi_api::{
    ApiConfig, AppState, BroadcastConfig, BroadcastRegistry, StreamStores, create_router,
    init_metrics,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Time allowed for open connections to finish after a shutdown signal.
///
/// Event streams never finish on their own, so this bounds the wait.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (tracing + optional OTLP export)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting FlowFi API");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let registry = Arc::new(BroadcastRegistry::new(BroadcastConfig::from(
        config.broadcast.clone(),
    )));
    let state = AppState::new(
        &config,
        registry,
        StreamStores::in_memory(),
        env!("CARGO_PKG_VERSION"),
    );
    let app = create_router(state);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    let server_shutdown = shutdown_token.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("server task panicked")??;
            tracing::info!("FlowFi API stopped");
            return Ok(());
        }
        () = await_shutdown(shutdown_token) => {}
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => result.context("server task panicked")??,
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Connections still open after shutdown timeout, exiting"
        ),
    }

    tracing::info!("FlowFi API stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ApiConfig) {
    tracing::info!(
        addr = %config.server.bind_addr(),
        sandbox_enabled = config.sandbox.enabled,
        subscriber_buffer = config.broadcast.subscriber_buffer,
        max_subscribers_per_key = config.broadcast.max_subscribers_per_key,
        "Configuration loaded"
    );
    tracing::debug!(
        header = %config.sandbox.header_name,
        query_param = %config.sandbox.query_param_name,
        allow_header = config.sandbox.allow_header,
        allow_query_param = config.sandbox.allow_query_param,
        "Sandbox resolution"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
