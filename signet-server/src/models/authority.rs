use serde::{Deserialize, Serialize};

/// Which credential strategy an authority dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityKind {
    Password,
    EmailLink,
    OAuth2,
    Saml,
}

/// A credential realm: one way users of this deployment prove who they are.
/// The `kind` tag selects the strategy at runtime; provider specifics live
/// in `settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authority {
    pub id: String,
    pub kind: AuthorityKind,
    #[serde(default)]
    pub settings: AuthoritySettings,
}

/// Provider endpoints and client registration for delegated authorities.
/// Password and email-link authorities leave all of this empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthoritySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}
