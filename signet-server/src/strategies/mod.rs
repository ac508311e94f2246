//! Pluggable credential strategies.
//!
//! Each authority record carries a kind tag; the tag selects one strategy
//! variant at runtime (tagged-union dispatch, no inheritance). A strategy's
//! only externally visible output is the `User` it resolves; everything
//! else about a provider stays behind this seam.

use crate::config::SignetConfig;
use crate::models::{Authority, AuthorityKind, Credential, User};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod email_link;
pub mod oauth2;
pub mod password;
pub mod saml;

pub use email_link::{EmailLinkStrategy, LogMailer, Mailer};
pub use oauth2::OAuth2Strategy;
pub use password::{PasswordStrategy, Sha256PasswordHasher};
pub use saml::{AssertionValidator, RejectAllAssertions, SamlStrategy};

/// The credential material a login request may carry. Which fields are
/// required depends on the authority's kind.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// The authority to authenticate against
    pub authority: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Emailed single-use login token
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Upstream authorization code (oauth2 authorities)
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Raw assertion document (saml authorities)
    #[serde(default)]
    pub assertion: Option<String>,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("missing credential field: {0}")]
    MissingField(&'static str),
    #[error("credentials rejected")]
    Rejected,
    #[error("authority misconfigured: {0}")]
    Misconfigured(String),
    #[error("upstream identity provider error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authenticates end users and manages the credential records backing them.
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    async fn authenticate(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        request: &LoginRequest,
    ) -> Result<User, StrategyError>;

    async fn create_credential(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        user: &User,
        request: &LoginRequest,
    ) -> Result<Credential, StrategyError>;

    async fn update_credential(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        credential: Credential,
        request: &LoginRequest,
    ) -> Result<Credential, StrategyError>;
}

/// One strategy instance per supported authority kind, constructed at
/// startup and shared through the application state.
pub struct StrategyRegistry {
    pub password: PasswordStrategy,
    pub email_link: EmailLinkStrategy,
    pub oauth2: OAuth2Strategy,
    pub saml: SamlStrategy,
}

impl StrategyRegistry {
    pub fn new(config: &SignetConfig) -> Self {
        Self {
            password: PasswordStrategy::default(),
            email_link: EmailLinkStrategy::new(
                &config.email_link,
                std::sync::Arc::new(LogMailer),
            ),
            oauth2: OAuth2Strategy::default(),
            saml: SamlStrategy::new(std::sync::Arc::new(RejectAllAssertions)),
        }
    }

    pub fn select(&self, kind: AuthorityKind) -> &dyn CredentialStrategy {
        match kind {
            AuthorityKind::Password => &self.password,
            AuthorityKind::EmailLink => &self.email_link,
            AuthorityKind::OAuth2 => &self.oauth2,
            AuthorityKind::Saml => &self.saml,
        }
    }
}

/// Find-or-create the (credential, user) pair behind a provider-side
/// identity. Shared by the delegated strategies.
pub(crate) async fn link_identity(
    store: &dyn RecordStore,
    authority: &Authority,
    subject: &str,
    email: Option<String>,
    display_name: Option<String>,
) -> Result<User, StrategyError> {
    if let Some(credential) = store.find_credential(&authority.id, subject).await? {
        return match store.get_user(&credential.user_id).await {
            Ok(user) => Ok(user),
            // A credential pointing at a deleted user reads as a rejection,
            // not as a server fault.
            Err(StoreError::NotFound) => Err(StrategyError::Rejected),
            Err(other) => Err(other.into()),
        };
    }

    let now = Utc::now();
    let user = store
        .create_user(User {
            id: Uuid::new_v4().to_string(),
            email: email.unwrap_or_else(|| format!("{subject}@{}", authority.id)),
            display_name,
            created: now,
        })
        .await?;
    store
        .create_credential(Credential {
            authority_id: authority.id.clone(),
            subject: subject.to_string(),
            user_id: user.id.clone(),
            secret_digest: None,
            created: now,
            last_updated: now,
        })
        .await?;
    Ok(user)
}
