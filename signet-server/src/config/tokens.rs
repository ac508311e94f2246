use serde::Deserialize;

/// Access token configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// Lifetime of issued access tokens, in seconds (default: 1 hour)
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: u64,
}

fn default_access_ttl() -> u64 {
    3600
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: default_access_ttl(),
        }
    }
}
