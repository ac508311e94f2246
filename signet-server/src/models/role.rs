use serde::{Deserialize, Serialize};
use signet_scopes::ScopeCollection;
use std::collections::HashMap;

/// A named bundle of scopes assigned to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub scopes: ScopeCollection,
    /// user_id -> assigned; a missing key means not assigned
    #[serde(default)]
    pub assignments: HashMap<String, bool>,
}

impl Role {
    pub fn assigns(&self, user_id: &str) -> bool {
        self.assignments.get(user_id).copied().unwrap_or(false)
    }
}
