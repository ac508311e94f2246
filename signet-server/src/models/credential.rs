use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Links a provider-side identity to a local user, one record per
/// (authority, subject) pair. Password authorities keep a digest of the
/// secret here; delegated authorities store no secret at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub authority_id: String,
    /// Provider-side identifier: a username, an email address, or an
    /// upstream subject claim
    pub subject: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_digest: Option<String>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
