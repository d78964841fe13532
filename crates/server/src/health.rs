//! `GET /health` (§6).

use std::sync::Arc;

use axum::{Json, extract::State};
use llm::LlmState;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: &'static str,
}

pub async fn health(State(state): State<Arc<LlmState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        provider: state.config().default_provider.kind.as_str(),
    })
}
