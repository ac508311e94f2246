use serde::Deserialize;

/// Session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Lifetime of a login session, in seconds (default: 1 day)
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Name of the session cookie
    #[serde(default = "default_cookie")]
    pub cookie: String,
}

fn default_session_ttl() -> u64 {
    86400
}

fn default_cookie() -> String {
    "signet_session".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            cookie: default_cookie(),
        }
    }
}
