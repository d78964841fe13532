use std::collections::HashMap;

const ALIAS_VAR_PREFIX: &str = "CLASP_ALIAS_";

/// User-defined model aliases, resolved case-insensitively on the key. Unknown
/// names pass through unchanged (§4.2, §8).
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn from_env() -> Self {
        let mut entries = HashMap::new();

        if let Ok(list) = std::env::var("CLASP_MODEL_ALIASES") {
            for pair in list.split(',') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                if let Some((name, model)) = pair.split_once(':') {
                    entries.insert(name.trim().to_ascii_lowercase(), model.trim().to_string());
                } else {
                    log::warn!("ignoring malformed CLASP_MODEL_ALIASES entry: {pair}");
                }
            }
        }

        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix(ALIAS_VAR_PREFIX) {
                entries.insert(name.to_ascii_lowercase(), value);
            }
        }

        Self { entries }
    }

    /// Returns the resolved model name, or `name` unchanged if no alias matches.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_passes_through() {
        let table = AliasTable::default();
        assert_eq!(table.resolve("claude-3-opus-20240229"), "claude-3-opus-20240229");
    }

    #[test]
    fn resolution_is_case_insensitive() {
        let mut entries = HashMap::new();
        entries.insert("fast".to_string(), "gpt-4o-mini".to_string());
        let table = AliasTable { entries };

        assert_eq!(table.resolve("FAST"), "gpt-4o-mini");
        assert_eq!(table.resolve("Fast"), "gpt-4o-mini");
    }
}
