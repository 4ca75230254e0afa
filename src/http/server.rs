use std::future::Future;
use std::sync::Arc;

use super::router::build_router;
use crate::relay::Relay;

/// Serve the relay on `listen` until `shutdown` resolves, draining in-flight
/// requests before returning.
pub async fn run_http_server(
    relay: Arc<Relay>,
    listen: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let router = build_router(relay);
    let listener = tokio::net::TcpListener::bind(listen).await?;

    tracing::info!(address = %listener.local_addr()?, "Signals relay listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
