//! Typed configuration for the proxy, bound once at startup.
//!
//! The loader here is deliberately minimal: environment variables only, no
//! profile files, no setup wizard. That fuller surface is an external
//! collaborator the core does not own.

mod admission;
mod alias;
mod auth;
mod error;
mod provider;
mod tier;

pub use admission::{AdmissionConfig, CircuitBreakerConfig, RateLimitConfig};
pub use alias::AliasTable;
pub use auth::{AuthConfig, DebugConfig};
pub use error::Error;
pub use provider::{ProviderConfig, ProviderKind};
pub use tier::{FallbackRoute, Tier, TierConfig, TierRoute};

use std::collections::HashMap;

/// Process-wide, immutable-after-construction configuration (§5).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub default_provider: ProviderConfig,
    pub default_model: String,
    /// Per-tier model name override while still using `default_provider`
    /// (`CLASP_MODEL_OPUS`/`_SONNET`/`_HAIKU`), independent of multi-provider mode.
    pub tier_models: HashMap<Tier, String>,
    pub multi_provider: bool,
    pub tiers: TierConfig,
    pub fallback: Option<FallbackRoute>,
    pub aliases: AliasTable,
    pub admission: AdmissionConfig,
    pub auth: AuthConfig,
    pub debug: DebugConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let default_kind = ProviderKind::parse(&std::env::var("PROVIDER").unwrap_or_else(|_| "openai".to_string()))?;
        let default_provider = ProviderConfig::from_env(default_kind)?;
        let default_model = std::env::var("CLASP_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let mut tier_models = HashMap::new();
        for (tier, var) in [
            (Tier::Opus, "CLASP_MODEL_OPUS"),
            (Tier::Sonnet, "CLASP_MODEL_SONNET"),
            (Tier::Haiku, "CLASP_MODEL_HAIKU"),
        ] {
            if let Ok(model) = std::env::var(var) {
                tier_models.insert(tier, model);
            }
        }

        let multi_provider = bool_var("CLASP_MULTI_PROVIDER", false);

        let tiers = if multi_provider {
            TierConfig {
                opus: tier_route("OPUS")?,
                sonnet: tier_route("SONNET")?,
                haiku: tier_route("HAIKU")?,
            }
        } else {
            TierConfig::default()
        };

        let fallback = global_fallback_route()?;

        let port = std::env::var("CLASP_PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| Error::InvalidValue {
                var: "CLASP_PORT",
                reason: e.to_string(),
            })?
            .unwrap_or(8080);

        let auth = AuthConfig {
            enabled: bool_var("AUTH_ENABLED", false),
            api_key: std::env::var("AUTH_API_KEY").ok().map(Into::into),
            require_for_health: bool_var("AUTH_REQUIRE_FOR_HEALTH", false),
            require_for_metrics: bool_var("AUTH_REQUIRE_FOR_METRICS", false),
        };

        let mut admission = AdmissionConfig::default();
        admission.rate_limit.enabled = bool_var("RATE_LIMIT_ENABLED", false);
        if let Ok(requests) = std::env::var("RATE_LIMIT_REQUESTS") {
            admission.rate_limit.requests =
                requests
                    .parse()
                    .map_err(|e: std::num::ParseIntError| Error::InvalidValue {
                        var: "RATE_LIMIT_REQUESTS",
                        reason: e.to_string(),
                    })?;
        }
        if let Ok(window) = std::env::var("RATE_LIMIT_WINDOW") {
            let secs: u64 = window
                .parse()
                .map_err(|e: std::num::ParseIntError| Error::InvalidValue {
                    var: "RATE_LIMIT_WINDOW",
                    reason: e.to_string(),
                })?;
            admission.rate_limit.window = std::time::Duration::from_secs(secs);
        }
        admission.circuit_breaker.enabled = bool_var("CIRCUIT_BREAKER_ENABLED", true);

        let debug = DebugConfig {
            enabled: bool_var("CLASP_DEBUG", false),
            requests: bool_var("CLASP_DEBUG_REQUESTS", false),
            responses: bool_var("CLASP_DEBUG_RESPONSES", false),
        };

        Ok(Self {
            port,
            default_provider,
            default_model,
            tier_models,
            multi_provider,
            tiers,
            fallback,
            aliases: AliasTable::from_env(),
            admission,
            auth,
            debug,
        })
    }
}

fn bool_var(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn tier_route(prefix: &str) -> Result<Option<TierRoute>, Error> {
    let Ok(provider_name) = std::env::var(format!("CLASP_{prefix}_PROVIDER")) else {
        return Ok(None);
    };
    let kind = ProviderKind::parse(&provider_name)?;
    let mut provider = ProviderConfig::from_env(kind)?;

    if let Ok(key) = std::env::var(format!("CLASP_{prefix}_API_KEY")) {
        provider.api_key = Some(key.into());
    }
    if let Ok(base_url) = std::env::var(format!("CLASP_{prefix}_BASE_URL")) {
        provider.base_url = url::Url::parse(&base_url).map_err(|e| Error::InvalidValue {
            var: "CLASP_*_BASE_URL",
            reason: e.to_string(),
        })?;
    }

    let model = std::env::var(format!("CLASP_{prefix}_MODEL")).unwrap_or_else(|_| "gpt-4o".to_string());

    let fallback = match std::env::var(format!("CLASP_{prefix}_FALLBACK_PROVIDER")) {
        Ok(fallback_provider) => {
            let fallback_kind = ProviderKind::parse(&fallback_provider)?;
            let fallback_provider = ProviderConfig::from_env(fallback_kind)?;
            let fallback_model =
                std::env::var(format!("CLASP_{prefix}_FALLBACK_MODEL")).unwrap_or_else(|_| model.clone());

            Some(FallbackRoute {
                provider: fallback_provider,
                model: fallback_model,
            })
        }
        Err(_) => None,
    };

    Ok(Some(TierRoute {
        provider,
        model,
        fallback,
    }))
}

fn global_fallback_route() -> Result<Option<FallbackRoute>, Error> {
    let Ok(provider_name) = std::env::var("CLASP_FALLBACK_PROVIDER").or_else(|_| std::env::var("CLASP_FALLBACK"))
    else {
        return Ok(None);
    };
    let kind = ProviderKind::parse(&provider_name)?;
    let mut provider = ProviderConfig::from_env(kind)?;

    if let Ok(key) = std::env::var("CLASP_FALLBACK_API_KEY") {
        provider.api_key = Some(key.into());
    }
    if let Ok(base_url) = std::env::var("CLASP_FALLBACK_BASE_URL") {
        provider.base_url = url::Url::parse(&base_url).map_err(|e| Error::InvalidValue {
            var: "CLASP_FALLBACK_BASE_URL",
            reason: e.to_string(),
        })?;
    }

    let model = std::env::var("CLASP_FALLBACK_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

    Ok(Some(FallbackRoute { provider, model }))
}
