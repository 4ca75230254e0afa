use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use super::handlers::{
    deliberate_observables, health, observe_observables, refer_observables, version,
};
use crate::relay::Relay;

/// Build the relay router.
///
/// Every route answers 200; failures travel in the envelope's `errors`.
pub fn build_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/deliberate/observables", post(deliberate_observables))
        .route("/observe/observables", post(observe_observables))
        .route("/refer/observables", post(refer_observables))
        .route("/health", post(health))
        .route("/version", post(version))
        .with_state(relay)
}
