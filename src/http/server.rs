//! Server lifecycle: bind, serve, and shut down cleanly on Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::app_state::AppState;

/// Serve the HTTP surface on `addr` until a shutdown signal arrives.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let app = super::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "clinagent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl-C handler");
    tracing::info!("shutdown signal received");
}
