use super::{CredentialStrategy, LoginRequest, StrategyError};
use crate::config::EmailLinkConfig;
use crate::models::{Authority, Credential, User};
use crate::store::{RecordStore, StoreError};
use crate::tokens::generate_secret;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use log::{debug, info};
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Delivery seam for login links. Outbound mail transport is not this
/// server's concern; deployments plug their own sender in here.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_login_link(&self, email: &str, token: &str);
}

/// Development mailer that only writes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_login_link(&self, email: &str, token: &str) {
        info!("login link issued for {email}");
        debug!("login token for {email}: {token}");
    }
}

/// Passwordless login through emailed single-use tokens.
///
/// Only a digest of each outstanding token is held, in a TTL'd cache, so an
/// unredeemed link expires on its own and a leaked cache dump is useless.
/// Redemption removes the entry, which is what makes each link single-use.
pub struct EmailLinkStrategy {
    pending: Cache<String, String>,
    mailer: Arc<dyn Mailer>,
}

impl EmailLinkStrategy {
    pub fn new(config: &EmailLinkConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pending: Cache::builder()
                .time_to_live(Duration::from_secs(config.token_ttl_secs))
                .max_capacity(config.pending_capacity)
                .build(),
            mailer,
        }
    }

    /// Issue a login token for the account behind `email`, if one exists.
    /// Succeeds either way: responses must not reveal which addresses have
    /// accounts.
    pub async fn begin(
        &self,
        store: &dyn RecordStore,
        email: &str,
    ) -> Result<(), StrategyError> {
        let Some(user) = store.find_user_by_email(email).await? else {
            debug!("login link requested for unknown address");
            return Ok(());
        };
        let token = generate_secret();
        self.pending.insert(digest(&token), user.id).await;
        self.mailer.send_login_link(email, &token).await;
        Ok(())
    }
}

#[async_trait]
impl CredentialStrategy for EmailLinkStrategy {
    async fn authenticate(
        &self,
        _authority: &Authority,
        store: &dyn RecordStore,
        request: &LoginRequest,
    ) -> Result<User, StrategyError> {
        let token = request
            .token
            .as_deref()
            .ok_or(StrategyError::MissingField("token"))?;

        // remove() both checks and consumes; a second redemption of the same
        // link finds nothing.
        let user_id = self
            .pending
            .remove(&digest(token))
            .await
            .ok_or(StrategyError::Rejected)?;
        match store.get_user(&user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(StrategyError::Rejected),
            Err(other) => Err(other.into()),
        }
    }

    async fn create_credential(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        user: &User,
        request: &LoginRequest,
    ) -> Result<Credential, StrategyError> {
        let email = request.email.as_deref().unwrap_or(&user.email);
        let now = Utc::now();
        Ok(store
            .create_credential(Credential {
                authority_id: authority.id.clone(),
                subject: email.to_string(),
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
        // Nothing secret to rotate; just record the touch.
        credential.last_updated = Utc::now();
        Ok(store.update_credential(credential).await?)
    }
}

fn digest(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}
