use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

/// Taxonomy from §7, each variant carrying the Anthropic `error.type` string
/// and HTTP status it maps to.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    #[error("provider not found: {0}")]
    NotFound(String),

    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("backend request timed out")]
    Timeout,

    #[error("no backend available: {0}")]
    Overloaded(String),
}

impl LlmError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::AuthenticationFailed(_) => "authentication_error",
            Self::RateLimitExceeded { .. } => "rate_limit_error",
            Self::NotFound(_) => "not_found_error",
            Self::Backend(_) | Self::Timeout => "api_error",
            Self::Overloaded(_) => "overloaded_error",
        }
    }

    /// Whether a failure of this kind should trigger the router's fallback
    /// descriptor (§4.6, §7). 4xx-shaped errors never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Timeout | Self::Overloaded(_))
    }
}

#[derive(Debug, Serialize)]
pub struct AnthropicErrorBody {
    pub r#type: &'static str,
    pub error: AnthropicErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct AnthropicErrorDetail {
    pub r#type: &'static str,
    pub message: String,
}

impl From<&LlmError> for AnthropicErrorBody {
    fn from(error: &LlmError) -> Self {
        Self {
            r#type: "error",
            error: AnthropicErrorDetail {
                r#type: error.error_type(),
                message: error.to_string(),
            },
        }
    }
}

impl IntoResponse for LlmError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = AnthropicErrorBody::from(&self);

        let mut response = (status, Json(body)).into_response();

        match &self {
            Self::AuthenticationFailed(_) => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::RateLimitExceeded { retry_after } => {
                if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            _ => {}
        }

        response
    }
}
