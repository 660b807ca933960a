#![forbid(unsafe_code)]

use pm_server::{AppState, ServerConfig, build_router, open_store};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
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
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
                return;
            }
            Err(err) => warn!(error = %err, "SIGTERM handler unavailable"),
        }
    }
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = ServerConfig::load().map_err(|e| format!("config: {e}"))?;
    init_tracing(config.log_json);

    let store = open_store(&config).map_err(|e| {
        error!(error = %e, storage_dir = %config.storage_dir.display(), "store open failed");
        format!("store: {e}")
    })?;
    let app = build_router(AppState::new(store));

    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| format!("bind {}: {e}", config.bind))?;
    info!(
        bind = %config.bind,
        storage_dir = %config.storage_dir.display(),
        seed_users = config.seed_users.len(),
        "pm_server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received, draining requests");
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
