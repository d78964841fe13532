use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, Method, header::AUTHORIZATION};
use secrecy::ExposeSecret;

use crate::{
    error::{LlmError, Result},
    messages::{anthropic::AnthropicChatRequest, openai::OpenAiStreamChunk},
    stream::StreamState,
    translator::{translate_request, translate_response},
};

use super::{EventStream, map_status_error};

/// Every OpenAI-compatible backend: OpenAI itself, OpenRouter, Azure OpenAI,
/// and user-supplied Custom endpoints. They share one request/response shape
/// and differ only in URL construction and auth header (§4.1).
pub struct OpenAiBackend {
    client: Client,
    url: String,
    kind: config::ProviderKind,
    api_key: Option<secrecy::SecretString>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(provider: &config::ProviderConfig, client: Client, model: String) -> Self {
        let url = match provider.kind {
            config::ProviderKind::Azure => {
                let deployment = provider.azure_deployment.as_deref().unwrap_or(&model);
                let api_version = provider
                    .azure_api_version
                    .as_deref()
                    .unwrap_or("2024-02-15-preview");

                format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    provider.base_url.as_str().trim_end_matches('/'),
                    deployment,
                    api_version
                )
            }
            _ => format!("{}/chat/completions", provider.base_url.as_str().trim_end_matches('/')),
        };

        Self {
            client,
            url,
            kind: provider.kind,
            api_key: provider.api_key.clone(),
            model,
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let Some(key) = &self.api_key else { return builder };

        match self.kind {
            config::ProviderKind::Azure => builder.header("api-key", key.expose_secret()),
            _ => builder.header(AUTHORIZATION, format!("Bearer {}", key.expose_secret())),
        }
    }

    pub async fn send(&self, request: &AnthropicChatRequest) -> Result<crate::messages::anthropic::AnthropicChatResponse> {
        let openai_request = translate_request(request, &self.model, true);

        let builder = self.authorize(self.client.request(Method::POST, &self.url));
        let response = builder
            .json(&openai_request)
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let body: crate::messages::openai::OpenAiChatResponse = response.json().await.map_err(|e| {
            LlmError::Backend(format!("failed to parse upstream response: {e}"))
        })?;

        Ok(translate_response(&body, &request.model))
    }

    pub async fn send_stream(&self, request: &AnthropicChatRequest) -> Result<EventStream> {
        let mut openai_request = translate_request(request, &self.model, true);
        openai_request.stream = Some(true);

        let builder = self.authorize(self.client.request(Method::POST, &self.url));
        let response = builder
            .json(&openai_request)
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let requested_model = request.model.clone();
        let byte_stream = response.bytes_stream();
        let event_stream = byte_stream.eventsource();

        let chunk_stream = futures::stream::unfold(
            (Box::pin(event_stream), StreamState::new(requested_model), false),
            |(mut stream, mut state, finished)| async move {
                if finished {
                    return None;
                }

                loop {
                    let Some(event) = stream.next().await else {
                        let events = state.finish();
                        return Some((events, (stream, state, true)));
                    };

                    let Ok(event) = event else {
                        log::warn!("SSE parsing error in upstream stream");
                        continue;
                    };

                    if event.data == "[DONE]" {
                        let events = state.finish();
                        return Some((events, (stream, state, true)));
                    }

                    let Ok(chunk) = serde_json::from_str::<OpenAiStreamChunk>(&event.data) else {
                        log::warn!("failed to parse upstream streaming chunk");
                        continue;
                    };

                    let events = state.handle_chunk(chunk);
                    if !events.is_empty() {
                        return Some((events, (stream, state, false)));
                    }
                }
            },
        )
        .flat_map(|events| futures::stream::iter(events.into_iter().map(Ok)));

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
