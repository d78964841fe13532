use axum::http::HeaderMap;
use serde::Serialize;

/// Per-request context threaded through translation and dispatch: just the
/// debug-dump flags for now, since auth and client identity are handled by
/// the server crate before this crate ever sees the request.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RequestContext {
    pub debug_requests: bool,
    pub debug_responses: bool,
}

impl RequestContext {
    pub fn new(config: &config::Config) -> Self {
        Self {
            debug_requests: config.debug.enabled && config.debug.requests,
            debug_responses: config.debug.enabled && config.debug.responses,
        }
    }

    pub fn dump_request(&self, model: &str, value: &impl Serialize) {
        if self.debug_requests {
            dump("request", model, value);
        }
    }

    pub fn dump_response(&self, model: &str, value: &impl Serialize) {
        if self.debug_responses {
            dump("response", model, value);
        }
    }
}

/// Credentials never reach these payloads (they live only in
/// `ProviderConfig`), so there is nothing left to strip before logging.
fn dump(kind: &str, model: &str, value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(json) => log::debug!("{kind} dump [{model}]: {json}"),
        Err(error) => log::warn!("failed to serialize {kind} dump: {error}"),
    }
}

/// Nothing in `headers` currently informs `RequestContext`; kept as a
/// typed parameter so future per-request overrides (e.g. BYOK) have a home.
pub(crate) fn extract_context(config: &config::Config, _headers: &HeaderMap) -> RequestContext {
    RequestContext::new(config)
}
