use secrecy::SecretString;

/// Auth for the proxy's own `/v1/messages` surface, not to be confused with
/// the credentials used to reach a backend provider. `require_for_health`/
/// `require_for_metrics` let an operator lock down the observability
/// endpoints too; both default to anonymous access (§6).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub require_for_health: bool,
    pub require_for_metrics: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            require_for_health: false,
            require_for_metrics: false,
        }
    }
}

/// Gates the `CLASP_DEBUG*` request/response dumping. Credentials are always
/// redacted before a dump regardless of these flags (§9).
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub requests: bool,
    pub responses: bool,
}
