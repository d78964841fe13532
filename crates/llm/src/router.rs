//! Multi-provider/tier routing with single-attempt fallback (§4.6).

use config::{Config, FallbackRoute, ProviderConfig, Tier};

use crate::alias;

/// One resolved route: which provider to call, under which model name, plus
/// an optional fallback to try once if the primary attempt fails retryably.
pub struct RouteDecision {
    pub provider: ProviderConfig,
    pub model: String,
    pub fallback: Option<FallbackRoute>,
}

/// Resolves a requested model to a route, following §4.6's four steps:
/// 1. alias resolution, 2. tier classification, 3. tier-specific route
/// lookup under multi-provider mode (falling back to the single configured
/// default provider otherwise), 4. attach any configured fallback.
pub fn resolve(config: &Config, requested_model: &str) -> RouteDecision {
    let (_, tier) = alias::resolve(&config.aliases, requested_model);

    if config.multi_provider
        && let Some(route) = config.tiers.get(tier)
    {
        return RouteDecision {
            provider: route.provider.clone(),
            model: route.model.clone(),
            fallback: route.fallback.clone(),
        };
    }

    let model = config
        .tier_models
        .get(&tier)
        .cloned()
        .unwrap_or_else(|| config.default_model.clone());

    RouteDecision {
        provider: config.default_provider.clone(),
        model,
        fallback: config.fallback.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_provider_when_not_multi_provider() {
        let config = Config {
            port: 8080,
            default_provider: ProviderConfig::from_env(config::ProviderKind::OpenAi).unwrap(),
            default_model: "gpt-4o".to_string(),
            tier_models: Default::default(),
            multi_provider: false,
            tiers: Default::default(),
            fallback: None,
            aliases: Default::default(),
            admission: Default::default(),
            auth: Default::default(),
            debug: Default::default(),
        };

        let decision = resolve(&config, "claude-3-5-sonnet-20241022");
        assert_eq!(decision.model, "gpt-4o");
    }
}
