use secrecy::SecretString;
use url::Url;

use crate::Error;

/// Backend kind a request can be routed to. Mirrors §4.1 of the provider registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Azure,
    Custom,
    Anthropic,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self, Error> {
        match value.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "azure" => Ok(Self::Azure),
            "custom" => Ok(Self::Custom),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(Error::UnknownProviderKind(other.to_string())),
        }
    }

    /// `true` for every kind except Anthropic passthrough.
    pub fn requires_translation(self) -> bool {
        !matches!(self, Self::Anthropic)
    }

    pub fn supports_streaming(self) -> bool {
        true
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Azure => "azure",
            Self::Custom => "custom",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Everything needed to reach one configured backend: where it lives and how to
/// authenticate to it. Immutable after startup (§5).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: Url,
    pub api_key: Option<SecretString>,
    /// Azure-only: the deployment name encoded in the URL path.
    pub azure_deployment: Option<String>,
    /// Azure-only: `api-version` query parameter, e.g. `2024-02-15-preview`.
    pub azure_api_version: Option<String>,
}

const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

impl ProviderConfig {
    /// Builds a provider configuration for `kind` by reading the environment
    /// variables named in spec §6 for that kind.
    pub fn from_env(kind: ProviderKind) -> Result<Self, Error> {
        match kind {
            ProviderKind::OpenAi => Ok(Self {
                kind,
                base_url: parse_url(
                    std::env::var("OPENAI_BASE_URL")
                        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                    "OPENAI_BASE_URL",
                )?,
                api_key: optional_secret("OPENAI_API_KEY"),
                azure_deployment: None,
                azure_api_version: None,
            }),
            ProviderKind::OpenRouter => Ok(Self {
                kind,
                base_url: parse_url("https://openrouter.ai/api/v1".to_string(), "OPENROUTER_BASE_URL")?,
                api_key: optional_secret("OPENROUTER_API_KEY"),
                azure_deployment: None,
                azure_api_version: None,
            }),
            ProviderKind::Azure => {
                let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT")
                    .map_err(|_| Error::MissingVar("AZURE_OPENAI_ENDPOINT"))?;

                Ok(Self {
                    kind,
                    base_url: parse_url(endpoint, "AZURE_OPENAI_ENDPOINT")?,
                    api_key: optional_secret("AZURE_API_KEY"),
                    azure_deployment: std::env::var("AZURE_DEPLOYMENT_NAME").ok(),
                    azure_api_version: Some(
                        std::env::var("AZURE_API_VERSION").unwrap_or_else(|_| DEFAULT_AZURE_API_VERSION.to_string()),
                    ),
                })
            }
            ProviderKind::Custom => {
                let base_url = std::env::var("CUSTOM_BASE_URL").map_err(|_| Error::MissingVar("CUSTOM_BASE_URL"))?;

                Ok(Self {
                    kind,
                    base_url: parse_url(base_url, "CUSTOM_BASE_URL")?,
                    api_key: optional_secret("CUSTOM_API_KEY"),
                    azure_deployment: None,
                    azure_api_version: None,
                })
            }
            ProviderKind::Anthropic => Ok(Self {
                kind,
                base_url: parse_url("https://api.anthropic.com".to_string(), "ANTHROPIC_BASE_URL")?,
                api_key: optional_secret("ANTHROPIC_API_KEY"),
                azure_deployment: None,
                azure_api_version: None,
            }),
        }
    }
}

fn optional_secret(var: &str) -> Option<SecretString> {
    std::env::var(var).ok().map(SecretString::from)
}

fn parse_url(value: String, var: &'static str) -> Result<Url, Error> {
    Url::parse(&value).map_err(|e| Error::InvalidValue {
        var,
        reason: e.to_string(),
    })
}
