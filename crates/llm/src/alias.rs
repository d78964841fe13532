//! Two-step model resolution: alias lookup, then tier classification (§4.2).

use config::{AliasTable, Tier};

/// Resolves a caller-supplied model name to the alias target (if any) and
/// the tier it classifies into once resolved.
pub fn resolve(aliases: &AliasTable, requested_model: &str) -> (String, Tier) {
    let resolved = aliases.resolve(requested_model).to_string();
    let tier = Tier::classify(&resolved);
    (resolved, tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_resolves_before_tier_classification() {
        let aliases = AliasTable::default();
        let (model, tier) = resolve(&aliases, "claude-3-opus-20240229");
        assert_eq!(model, "claude-3-opus-20240229");
        assert_eq!(tier, Tier::Opus);
    }
}
