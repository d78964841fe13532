//! Translation proxy core: provider registry, routing, translation, the
//! streaming state machine, and admission control (§4). The HTTP app itself,
//! authentication, and process wiring belong to the `server` crate; this
//! crate only exposes the `/v1/messages` and `/v1/models` routes it owns.

mod admission;
mod alias;
mod cache;
mod error;
mod http_client;
mod messages;
mod provider;
mod request;
mod router;
mod stream;
mod translator;

pub use error::{LlmError, Result};
pub use messages::anthropic::{AnthropicChatRequest, AnthropicChatResponse, AnthropicContent, AnthropicModel, AnthropicModelsResponse};

use std::{
    convert::Infallible,
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response, Sse, sse::Event},
    routing::{get, post},
};
use futures::StreamExt;

use admission::{Admission, AdmissionQueue};
use cache::ResponseCache;
use provider::{Backend, EventStream};
use request::RequestContext;
use router::RouteDecision;

/// Shared state behind every `/v1/messages` call: configuration, the pooled
/// HTTP client, the response cache, admission control, and process metrics.
pub struct LlmState {
    config: config::Config,
    client: reqwest::Client,
    cache: ResponseCache,
    admission: Admission,
    queue: AdmissionQueue<Response>,
    metrics: telemetry::Metrics,
}

impl LlmState {
    pub fn new(config: config::Config) -> Arc<Self> {
        let queue = AdmissionQueue::spawn(config.admission.queue_capacity, config.admission.workers);
        let admission = Admission::new(&config.admission);

        Arc::new(Self {
            client: http_client::http_client(),
            cache: ResponseCache::default(),
            admission,
            queue,
            metrics: telemetry::Metrics::new(),
            config,
        })
    }

    pub fn config(&self) -> &config::Config {
        &self.config
    }

    pub fn metrics(&self) -> &telemetry::Metrics {
        &self.metrics
    }
}

/// The routes this crate owns, with `state` already bound. The caller
/// (`server`) merges this into its own router alongside health and metrics.
pub fn router(state: Arc<LlmState>) -> Router {
    Router::new()
        .route("/v1/messages", post(messages_handler))
        .route("/v1/models", get(models_handler))
        .with_state(state)
}

/// One attempt's result before it's turned into an HTTP response: either a
/// buffered Anthropic response or an already-translated event stream.
enum Outcome {
    Complete(AnthropicChatResponse),
    Stream(EventStream),
}

async fn messages_handler(
    State(state): State<Arc<LlmState>>,
    headers: HeaderMap,
    Json(request): Json<AnthropicChatRequest>,
) -> Result<Response> {
    if let Err(error) = state.admission.check_rate_limit() {
        state.metrics.record_rate_limited();
        return Err(error);
    }

    let ctx = request::extract_context(&state.config, &headers);
    let route = router::resolve(&state.config, &request.model);
    let streaming = request.stream.unwrap_or(false);

    ctx.dump_request(&route.model, &request);

    if !streaming && ResponseCache::is_cacheable(&request) {
        match state.cache.get(&request, &route.model) {
            Some(cached) => {
                state.metrics.record_cache_hit();
                log::debug!("cache hit for model {}", route.model);
                return Ok(Json(cached).into_response());
            }
            None => state.metrics.record_cache_miss(),
        }
    }

    let state_for_job = state.clone();
    let request_for_job = request.clone();
    let max_wait = state.config.admission.max_wait;

    state
        .queue
        .submit(max_wait, move || Box::pin(dispatch(state_for_job, request_for_job, route, streaming, ctx)))
        .await
}

async fn models_handler(State(state): State<Arc<LlmState>>) -> Json<AnthropicModelsResponse> {
    Json(models_response(&state.config))
}

/// Runs one admitted job: the primary attempt, a single fallback attempt on
/// a retryable failure, and response assembly (§4.6, §4.8).
async fn dispatch(state: Arc<LlmState>, request: AnthropicChatRequest, route: RouteDecision, streaming: bool, ctx: RequestContext) -> Result<Response> {
    let start = Instant::now();

    match attempt(&state, &request, &route.provider, &route.model, streaming).await {
        Ok(outcome) => {
            state.admission.record_success(route.provider.kind).await;
            Ok(finalize(&state, &request, &route.model, streaming, start, outcome, ctx))
        }
        Err(error) if error.is_retryable() => {
            state.admission.record_failure(route.provider.kind).await;

            let Some(fallback) = route.fallback else {
                state.metrics.record_request(streaming, 0, elapsed_ms(start), false);
                return Err(error);
            };

            log::warn!("primary attempt failed retryably, trying fallback: {error}");

            match attempt(&state, &request, &fallback.provider, &fallback.model, streaming).await {
                Ok(outcome) => {
                    state.admission.record_success(fallback.provider.kind).await;
                    Ok(finalize(&state, &request, &fallback.model, streaming, start, outcome, ctx))
                }
                Err(error) => {
                    state.admission.record_failure(fallback.provider.kind).await;
                    state.metrics.record_request(streaming, 0, elapsed_ms(start), false);
                    Err(error)
                }
            }
        }
        Err(error) => {
            state.admission.record_failure(route.provider.kind).await;
            state.metrics.record_request(streaming, 0, elapsed_ms(start), false);
            Err(error)
        }
    }
}

async fn attempt(
    state: &LlmState,
    request: &AnthropicChatRequest,
    provider: &config::ProviderConfig,
    model: &str,
    streaming: bool,
) -> Result<Outcome> {
    if !state.admission.permits_call(provider.kind).await {
        state.metrics.record_circuit_breaker_trip();
        return Err(admission::circuit_open_error());
    }

    let backend = Backend::new(provider, state.client.clone(), model.to_string());

    if streaming {
        backend.send_stream(request).await.map(Outcome::Stream)
    } else {
        backend.send(request).await.map(Outcome::Complete)
    }
}

fn finalize(
    state: &LlmState,
    request: &AnthropicChatRequest,
    model: &str,
    streaming: bool,
    start: Instant,
    outcome: Outcome,
    ctx: RequestContext,
) -> Response {
    match outcome {
        Outcome::Complete(response) => {
            let tool_calls = response
                .content
                .iter()
                .filter(|block| matches!(block, AnthropicContent::ToolUse { .. }))
                .count();

            state.metrics.record_request(false, tool_calls, elapsed_ms(start), true);
            ctx.dump_response(model, &response);

            if ResponseCache::is_cacheable(request) {
                state.cache.put(request, model, response.clone());
            }

            Json(response).into_response()
        }
        Outcome::Stream(stream) => {
            state.metrics.record_request(true, 0, elapsed_ms(start), true);

            let events = stream.map(|result| {
                let event = match result {
                    Ok(event) => sse_event(&event),
                    Err(error) => {
                        log::error!("stream error: {error}");
                        Event::default().event("error").data(format!(
                            r#"{{"type":"error","error":{{"type":"api_error","message":"{error}"}}}}"#
                        ))
                    }
                };

                Ok::<_, Infallible>(event)
            });

            let with_done = events.chain(futures::stream::once(async { Ok::<_, Infallible>(Event::default().data("[DONE]")) }));

            Sse::new(with_done).into_response()
        }
    }
}

fn sse_event(event: &messages::anthropic::AnthropicStreamEvent) -> Event {
    use messages::anthropic::AnthropicStreamEvent as E;

    let name = match event {
        E::MessageStart { .. } => "message_start",
        E::ContentBlockStart { .. } => "content_block_start",
        E::ContentBlockDelta { .. } => "content_block_delta",
        E::ContentBlockStop { .. } => "content_block_stop",
        E::MessageDelta { .. } => "message_delta",
        E::MessageStop => "message_stop",
        E::Ping => "ping",
        E::Error { .. } => "error",
    };

    let json = serde_json::to_string(event).unwrap_or_else(|e| {
        log::error!("failed to serialize stream event: {e}");
        r#"{"type":"error"}"#.to_string()
    });

    Event::default().event(name).data(json)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

const CANONICAL_MODELS: &[(&str, &str)] = &[
    ("claude-3-opus-20240229", "Claude 3 Opus"),
    ("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet"),
    ("claude-3-haiku-20240307", "Claude 3 Haiku"),
];

/// Static model listing assembled from canonical tier names plus any
/// per-tier model overrides; no live upstream discovery (§9).
fn models_response(config: &config::Config) -> AnthropicModelsResponse {
    let created_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

    let mut data: Vec<AnthropicModel> = CANONICAL_MODELS
        .iter()
        .map(|&(id, display_name)| AnthropicModel {
            id: id.to_string(),
            model_type: "model".to_string(),
            display_name: display_name.to_string(),
            created_at,
        })
        .collect();

    for model in config.tier_models.values() {
        if !data.iter().any(|existing| &existing.id == model) {
            data.push(AnthropicModel {
                id: model.clone(),
                model_type: "model".to_string(),
                display_name: model.clone(),
                created_at,
            });
        }
    }

    AnthropicModelsResponse { data, has_more: false }
}
