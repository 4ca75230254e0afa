use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::envelope::Envelope;
use crate::relay::Relay;

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

pub async fn deliberate_observables(
    State(relay): State<Arc<Relay>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Envelope> {
    Json(relay.deliberate(authorization(&headers), &body).await)
}

pub async fn observe_observables(
    State(relay): State<Arc<Relay>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Envelope> {
    Json(relay.observe(authorization(&headers), &body).await)
}

pub async fn refer_observables(
    State(relay): State<Arc<Relay>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Envelope> {
    Json(relay.refer(authorization(&headers), &body).await)
}

pub async fn health(State(relay): State<Arc<Relay>>, headers: HeaderMap) -> Json<Envelope> {
    Json(relay.health(authorization(&headers)).await)
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}
