use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signet_scopes::ScopeCollection;

/// A registered OAuth client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    /// Shared secret for the token endpoint, compared by literal equality
    pub secret: String,
    /// The maximum permission set this client may ever request, independent
    /// of any user
    pub scopes: ScopeCollection,
    /// Redirect target for authorization codes
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub created: DateTime<Utc>,
}
