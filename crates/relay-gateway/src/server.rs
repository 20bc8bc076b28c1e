//! Listener setup and graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::routes::router;
use crate::state::GatewayState;

/// Bind `addr`.
///
/// # Errors
///
/// Returns [`GatewayError::Bind`] if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> GatewayResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| GatewayError::Bind { addr, source })
}

/// Serve the gateway on `listener` until `shutdown` resolves.
///
/// On shutdown, open SSE streams are ended so in-flight connections can
/// drain.
///
/// # Errors
///
/// Returns [`GatewayError::Serve`] if the server fails.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> GatewayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
        info!("  Health: http://{addr}/health");
        info!("  SSE:    http://{addr}/sse");
        info!("  Webhook: http://{addr}/webhook");
    }

    let closing = state.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutting down HTTP server");
            closing.close_sessions();
        })
        .await
        .map_err(GatewayError::Serve)?;

    info!("HTTP server stopped");
    Ok(())
}
