pub use crate::config::email_link::EmailLinkConfig;
pub use crate::config::sessions::SessionConfig;
pub use crate::config::tokens::TokenConfig;
use config::{Config as ConfigCrate, ConfigError};
use serde::Deserialize;

pub mod email_link;
pub mod sessions;
pub mod tokens;

/// Main configuration structure for the Signet authority
#[derive(Debug, Deserialize, Clone)]
pub struct SignetConfig {
    /// The issuer identity embedded in every signed token, scoping them to
    /// this deployment
    #[serde(default = "default_realm")]
    pub realm: String,

    /// Shared secret used to sign access and session tokens
    #[serde(default)]
    pub signing_secret: String,

    /// The port the server will listen to (default: 7465)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Access token configuration
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Session configuration
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Email-link login configuration
    #[serde(default)]
    pub email_link: EmailLinkConfig,
}

fn default_realm() -> String {
    "signet".to_string()
}

fn default_port() -> u16 {
    7465
}

impl Default for SignetConfig {
    fn default() -> Self {
        Self {
            realm: default_realm(),
            signing_secret: String::new(),
            port: default_port(),
            tokens: TokenConfig::default(),
            sessions: SessionConfig::default(),
            email_link: EmailLinkConfig::default(),
        }
    }
}

impl SignetConfig {
    /// Creates a new config instance from environment variables. Nested
    /// sections use a double underscore, e.g. `SIGNET_TOKENS__ACCESS_TTL_SECS`.
    pub fn new() -> Result<Self, String> {
        ConfigCrate::builder()
            .add_source(
                config::Environment::with_prefix("SIGNET")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            realm: "signet-test".to_string(),
            signing_secret: "test-signing-secret".to_string(),
            port: 0,
            tokens: TokenConfig::default(),
            sessions: SessionConfig::default(),
            email_link: EmailLinkConfig {
                token_ttl_secs: 60,
                pending_capacity: 64,
            },
        }
    }
}
