use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, Method};
use secrecy::ExposeSecret;

use crate::{
    error::{LlmError, Result},
    messages::anthropic::{AnthropicChatRequest, AnthropicChatResponse, AnthropicStreamEvent},
};

use super::{EventStream, map_status_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Forwards a request to a real Anthropic endpoint unmodified: no
/// translation, no identity filter (§4.9, §6).
pub struct AnthropicBackend {
    client: Client,
    url: String,
    api_key: Option<secrecy::SecretString>,
    model: String,
}

impl AnthropicBackend {
    pub fn new(provider: &config::ProviderConfig, client: Client, model: String) -> Self {
        let base = provider.base_url.as_str().trim_end_matches('/').to_string();

        Self {
            client,
            url: format!("{base}/v1/messages"),
            api_key: provider.api_key.clone(),
            model,
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(Method::POST, url)
            .header("anthropic-version", ANTHROPIC_VERSION);

        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        builder
    }

    pub async fn send(&self, request: &AnthropicChatRequest) -> Result<AnthropicChatResponse> {
        let mut request = request.clone();
        request.model = self.model.clone();
        request.stream = Some(false);

        let response = self
            .request(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("failed to parse Anthropic response: {e}")))
    }

    pub async fn send_stream(&self, request: &AnthropicChatRequest) -> Result<EventStream> {
        let mut request = request.clone();
        request.model = self.model.clone();
        request.stream = Some(true);

        let response = self
            .request(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let byte_stream = response.bytes_stream();
        let event_stream = byte_stream.eventsource();

        let chunk_stream = event_stream.filter_map(|event| async move {
            let Ok(event) = event else {
                log::warn!("SSE parsing error in Anthropic passthrough stream");
                return None;
            };

            if event.data == "[DONE]" {
                return None;
            }

            match serde_json::from_str::<AnthropicStreamEvent>(&event.data) {
                Ok(parsed) => Some(Ok(parsed)),
                Err(e) => {
                    log::warn!("failed to parse Anthropic passthrough event: {e}");
                    None
                }
            }
        });

        Ok(Box::pin(chunk_stream))
    }
}

fn connection_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Backend(error.to_string())
    }
}
