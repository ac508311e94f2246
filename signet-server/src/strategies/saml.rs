use super::{link_identity, CredentialStrategy, LoginRequest, StrategyError};
use crate::models::{Authority, Credential, User};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// The identity attributes extracted from a validated assertion.
pub struct SamlIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Seam for assertion validation. XML signature checking belongs to the
/// deployment's SAML toolkit, not to this server.
pub trait AssertionValidator: Send + Sync {
    fn validate(&self, assertion: &str) -> Result<SamlIdentity, String>;
}

/// Default validator for deployments without a SAML integration.
pub struct RejectAllAssertions;

impl AssertionValidator for RejectAllAssertions {
    fn validate(&self, _assertion: &str) -> Result<SamlIdentity, String> {
        Err("no assertion validator configured".to_string())
    }
}

/// SSO login through externally validated assertions.
pub struct SamlStrategy {
    validator: Arc<dyn AssertionValidator>,
}

impl SamlStrategy {
    pub fn new(validator: Arc<dyn AssertionValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl CredentialStrategy for SamlStrategy {
    async fn authenticate(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        request: &LoginRequest,
    ) -> Result<User, StrategyError> {
        let assertion = request
            .assertion
            .as_deref()
            .ok_or(StrategyError::MissingField("assertion"))?;
        let identity = self
            .validator
            .validate(assertion)
            .map_err(|_| StrategyError::Rejected)?;
        link_identity(
            store,
            authority,
            &identity.subject,
            identity.email,
            identity.display_name,
        )
        .await
    }

    async fn create_credential(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        user: &User,
        request: &LoginRequest,
    ) -> Result<Credential, StrategyError> {
        let subject = request
            .username
            .as_deref()
            .ok_or(StrategyError::MissingField("username"))?;
        let now = Utc::now();
        Ok(store
            .create_credential(Credential {
                authority_id: authority.id.clone(),
                subject: subject.to_string(),
                user_id: user.id.clone(),
                secret_digest: None,
                created: now,
                last_updated: now,
            })
            .await?)
    }

    async fn update_credential(
        &self,
        _authority: &Authority,
        store: &dyn RecordStore,
        mut credential: Credential,
        _request: &LoginRequest,
    ) -> Result<Credential, StrategyError> {
        credential.last_updated = Utc::now();
        Ok(store.update_credential(credential).await?)
    }
}
