use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;

use crate::config::ServerSettings;
use crate::rest::app_router;
use crate::state::AppState;

/// Build the application state from `settings` and serve until Ctrl-C or
/// SIGTERM.
pub async fn run_server(settings: ServerSettings) -> anyhow::Result<()> {
    let state = AppState::from_settings(&settings).await?;
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .with_context(|| "invalid host/port for docvault server")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("docvault listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("docvault stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
