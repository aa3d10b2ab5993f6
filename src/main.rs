//! Space Proxy - caching proxy for NASA space-data APIs

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use space_proxy::api::create_router_for_origin;
use space_proxy::{spawn_cleanup_task, AppState, Config};

/// Main entry point for the proxy server.
///
/// # Startup Sequence
/// 1. Load configuration from environment variables
/// 2. Initialize tracing (JSON output in production)
/// 3. Build cache store, upstream client and rate limiters
/// 4. Start background TTL sweep task
/// 5. Create Axum router with all endpoints
/// 6. Serve with peer addresses available for rate limiting
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "space_proxy=info,tower_http=info".into());
    let production = config.as_ref().map(Config::is_production).unwrap_or(false);
    if production {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = config.context("invalid configuration")?;
    info!(
        "Configuration loaded: environment={}, port={}, default_ttl={}s, cleanup_interval={}s, upstream_timeout={}ms",
        config.environment,
        config.server_port,
        config.default_ttl,
        config.cleanup_interval,
        config.upstream_timeout_ms
    );

    let state = AppState::from_config(&config).context("failed to build application state")?;
    info!("Cache store and upstream client initialized");

    let cleanup_handle = spawn_cleanup_task(
        state.service.cache().clone(),
        state.limiters.clone(),
        config.cleanup_interval,
    );

    let app = create_router_for_origin(state, &config.frontend_url);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("NASA Explorer API server running on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cleanup_handle))
    .await
    .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep task.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
