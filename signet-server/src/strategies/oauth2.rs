use super::{link_identity, CredentialStrategy, LoginRequest, StrategyError};
use crate::models::{Authority, Credential, User};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct UpstreamToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamProfile {
    #[serde(alias = "id")]
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Delegated login through a third-party OAuth2/OIDC provider.
///
/// The strategy exchanges the browser-supplied authorization code at the
/// provider's token endpoint, reads the identity document, and links it to a
/// local user. Provider endpoints and client registration come from the
/// authority's settings.
pub struct OAuth2Strategy {
    http: reqwest::Client,
}

impl Default for OAuth2Strategy {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl OAuth2Strategy {
    fn setting<'a>(
        authority: &'a Authority,
        value: &'a Option<String>,
        name: &str,
    ) -> Result<&'a str, StrategyError> {
        value.as_deref().ok_or_else(|| {
            StrategyError::Misconfigured(format!(
                "authority {} is missing {name}",
                authority.id
            ))
        })
    }

    async fn fetch_profile(
        &self,
        authority: &Authority,
        request: &LoginRequest,
    ) -> Result<UpstreamProfile, StrategyError> {
        let code = request
            .code
            .as_deref()
            .ok_or(StrategyError::MissingField("code"))?;
        let settings = &authority.settings;
        let token_url = Self::setting(authority, &settings.token_url, "token_url")?;
        let profile_url = Self::setting(authority, &settings.profile_url, "profile_url")?;
        let client_id = Self::setting(authority, &settings.client_id, "client_id")?;
        let client_secret = Self::setting(authority, &settings.client_secret, "client_secret")?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(redirect_uri) = request.redirect_uri.as_deref() {
            form.push(("redirect_uri", redirect_uri));
        }

        let token_response = self
            .http
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| StrategyError::Upstream(e.to_string()))?;
        if !token_response.status().is_success() {
            // The provider did not accept the code; that is the caller's
            // credential failing, not ours.
            debug!(
                "upstream code exchange failed with status {}",
                token_response.status()
            );
            return Err(StrategyError::Rejected);
        }
        let token: UpstreamToken = token_response
            .json()
            .await
            .map_err(|e| StrategyError::Upstream(e.to_string()))?;

        let profile_response = self
            .http
            .get(profile_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| StrategyError::Upstream(e.to_string()))?;
        if !profile_response.status().is_success() {
            return Err(StrategyError::Upstream(format!(
                "profile endpoint returned {}",
                profile_response.status()
            )));
        }
        profile_response
            .json()
            .await
            .map_err(|e| StrategyError::Upstream(e.to_string()))
    }
}

#[async_trait]
impl CredentialStrategy for OAuth2Strategy {
    async fn authenticate(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        request: &LoginRequest,
    ) -> Result<User, StrategyError> {
        let profile = self.fetch_profile(authority, request).await?;
        debug!(
            "upstream identity {} resolved on authority {}",
            profile.sub, authority.id
        );
        link_identity(store, authority, &profile.sub, profile.email, profile.name).await
    }

    async fn create_credential(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        user: &User,
        request: &LoginRequest,
    ) -> Result<Credential, StrategyError> {
        // Links an already-known upstream subject to an existing account.
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
