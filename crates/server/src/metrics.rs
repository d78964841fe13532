//! `GET /metrics` (JSON) and `GET /metrics/prometheus` (§6).

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use llm::LlmState;
use telemetry::{MetricsSnapshot, render_prometheus};

pub async fn metrics_json(State(state): State<Arc<LlmState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics().snapshot())
}

pub async fn metrics_prometheus(State(state): State<Arc<LlmState>>) -> impl IntoResponse {
    let snapshot = state.metrics().snapshot();
    let provider = state.config().default_provider.kind.as_str();
    let body = render_prometheus(&snapshot, provider);

    ([("content-type", "text/plain; version=0.0.4")], body)
}
