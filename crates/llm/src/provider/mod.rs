//! Outbound calls to configured backends (§4.1, §4.6).

mod anthropic;
mod openai;

use futures::stream::BoxStream;

use crate::{error::Result, messages::anthropic::AnthropicChatResponse};

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiBackend;

/// One event in a normalized, already-translated outbound stream: a ready
/// Anthropic stream event, serialized as the caller will forward it.
pub type EventStream = BoxStream<'static, Result<crate::messages::anthropic::AnthropicStreamEvent>>;

/// A resolved backend ready to serve one request, built from a
/// [`config::ProviderConfig`] plus the model name the router selected.
pub enum Backend {
    OpenAiCompatible(OpenAiBackend),
    AnthropicPassthrough(AnthropicBackend),
}

impl Backend {
    pub fn new(provider: &config::ProviderConfig, client: reqwest::Client, model: String) -> Self {
        match provider.kind {
            config::ProviderKind::Anthropic => Self::AnthropicPassthrough(AnthropicBackend::new(provider, client, model)),
            _ => Self::OpenAiCompatible(OpenAiBackend::new(provider, client, model)),
        }
    }

    /// `true` unless this backend is Anthropic passthrough (§4.3, §4.9).
    pub fn requires_translation(&self) -> bool {
        matches!(self, Self::OpenAiCompatible(_))
    }

    pub async fn send(&self, request: &crate::messages::anthropic::AnthropicChatRequest) -> Result<AnthropicChatResponse> {
        match self {
            Self::OpenAiCompatible(backend) => backend.send(request).await,
            Self::AnthropicPassthrough(backend) => backend.send(request).await,
        }
    }

    pub async fn send_stream(&self, request: &crate::messages::anthropic::AnthropicChatRequest) -> Result<EventStream> {
        match self {
            Self::OpenAiCompatible(backend) => backend.send_stream(request).await,
            Self::AnthropicPassthrough(backend) => backend.send_stream(request).await,
        }
    }
}

/// Maps a non-2xx HTTP status from any backend into the taxonomy of §7.
pub(crate) fn map_status_error(status: reqwest::StatusCode, body: String) -> crate::error::LlmError {
    use crate::error::LlmError;

    match status.as_u16() {
        401 => LlmError::AuthenticationFailed(body),
        404 => LlmError::NotFound(body),
        429 => LlmError::RateLimitExceeded {
            retry_after: std::time::Duration::from_secs(1),
        },
        400..=499 => LlmError::InvalidRequest(body),
        503 => LlmError::Overloaded(body),
        _ => LlmError::Backend(format!("upstream returned {status}: {body}")),
    }
}
