use serde::Deserialize;

/// Email-link login configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EmailLinkConfig {
    /// How long an emailed login token stays redeemable, in seconds
    /// (default: 15 minutes)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Upper bound on outstanding login tokens held in memory
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: u64,
}

fn default_token_ttl() -> u64 {
    900
}

fn default_pending_capacity() -> u64 {
    10_000
}

impl Default for EmailLinkConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            pending_capacity: default_pending_capacity(),
        }
    }
}
