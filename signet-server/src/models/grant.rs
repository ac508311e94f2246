use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signet_scopes::ScopeCollection;

/// The durable record of what scopes a user has authorized a client to act
/// with, keyed by the composite (user_id, client_id).
///
/// `nonce` proves a just-issued authorization code has not been exchanged
/// yet: it is set on every code issuance and cleared by an atomic
/// compare-and-clear on exchange. `refresh_token` is generated once when the
/// grant first appears and preserved across updates unless explicitly
/// rotated, so refresh sessions survive re-approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub user_id: String,
    pub client_id: String,
    /// Scopes the user explicitly authorized for this client
    pub scopes: ScopeCollection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub refresh_token: String,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Grant {
    pub fn key(&self) -> (String, String) {
        (self.user_id.clone(), self.client_id.clone())
    }
}
