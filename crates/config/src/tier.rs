use crate::ProviderConfig;

/// Coarse model class a request's model name buckets into for tier-based
/// routing (§4.2). Tie-break order when a name matches more than one
/// pattern: opus > haiku > sonnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Opus,
    Sonnet,
    Haiku,
}

impl Tier {
    /// Classifies a (already alias-resolved) model name, matching the glob-style
    /// patterns `*opus*`, `*haiku*`, `*sonnet*`. Anything Claude-like that
    /// matches neither opus nor haiku falls back to sonnet.
    pub fn classify(model: &str) -> Self {
        let lower = model.to_ascii_lowercase();

        if lower.contains("opus") {
            Tier::Opus
        } else if lower.contains("haiku") {
            Tier::Haiku
        } else {
            Tier::Sonnet
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Opus => "opus",
            Tier::Sonnet => "sonnet",
            Tier::Haiku => "haiku",
        }
    }
}

/// A fully-specified alternate route for one tier under multi-provider mode.
#[derive(Debug, Clone)]
pub struct TierRoute {
    pub provider: ProviderConfig,
    pub model: String,
    pub fallback: Option<FallbackRoute>,
}

/// A secondary (provider, model) attempted after a retryable primary failure.
#[derive(Debug, Clone)]
pub struct FallbackRoute {
    pub provider: ProviderConfig,
    pub model: String,
}

/// Per-tier routes, populated only when `CLASP_MULTI_PROVIDER=true`.
#[derive(Debug, Clone, Default)]
pub struct TierConfig {
    pub opus: Option<TierRoute>,
    pub sonnet: Option<TierRoute>,
    pub haiku: Option<TierRoute>,
}

impl TierConfig {
    pub fn get(&self, tier: Tier) -> Option<&TierRoute> {
        match tier {
            Tier::Opus => self.opus.as_ref(),
            Tier::Sonnet => self.sonnet.as_ref(),
            Tier::Haiku => self.haiku.as_ref(),
        }
    }
}
