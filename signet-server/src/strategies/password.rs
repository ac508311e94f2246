use super::{CredentialStrategy, LoginRequest, StrategyError};
use crate::models::{Authority, Credential, User};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use log::debug;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Seam for the password hashing primitive. The digest format is
/// self-describing so a deployment can swap in a stronger primitive without
/// migrating stored credentials up front.
pub trait PasswordHasher: Send + Sync {
    fn digest(&self, password: &str) -> String;
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Salted, iterated SHA-256. Digest format: `sha256$<iters>$<salt>$<hash>`.
pub struct Sha256PasswordHasher {
    iterations: u32,
}

impl Default for Sha256PasswordHasher {
    fn default() -> Self {
        Self { iterations: 10_000 }
    }
}

impl Sha256PasswordHasher {
    fn digest_with(&self, password: &str, salt: &str, iterations: u32) -> String {
        let mut hash = Sha256::new()
            .chain_update(salt.as_bytes())
            .chain_update(password.as_bytes())
            .finalize();
        for _ in 1..iterations {
            hash = Sha256::digest(hash);
        }
        URL_SAFE_NO_PAD.encode(hash)
    }
}

impl PasswordHasher for Sha256PasswordHasher {
    fn digest(&self, password: &str) -> String {
        let mut rng = rand::thread_rng();
        let salt_bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
        let salt = URL_SAFE_NO_PAD.encode(salt_bytes);
        let hash = self.digest_with(password, &salt, self.iterations);
        format!("sha256${}${salt}${hash}", self.iterations)
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let parts: Vec<&str> = stored.split('$').collect();
        let [scheme, iterations, salt, hash] = parts.as_slice() else {
            return false;
        };
        if *scheme != "sha256" {
            return false;
        }
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        self.digest_with(password, salt, iterations) == *hash
    }
}

/// Username/password authentication against stored credential digests.
pub struct PasswordStrategy {
    hasher: Box<dyn PasswordHasher>,
}

impl Default for PasswordStrategy {
    fn default() -> Self {
        Self {
            hasher: Box::new(Sha256PasswordHasher::default()),
        }
    }
}

#[async_trait]
impl CredentialStrategy for PasswordStrategy {
    async fn authenticate(
        &self,
        authority: &Authority,
        store: &dyn RecordStore,
        request: &LoginRequest,
    ) -> Result<User, StrategyError> {
        let username = request
            .username
            .as_deref()
            .ok_or(StrategyError::MissingField("username"))?;
        let password = request
            .password
            .as_deref()
            .ok_or(StrategyError::MissingField("password"))?;

        // Unknown username, missing digest and bad password all collapse to
        // the same rejection so responses carry no account oracle.
        let credential = store
            .find_credential(&authority.id, username)
            .await?
            .ok_or(StrategyError::Rejected)?;
        let stored = credential
            .secret_digest
            .as_deref()
            .ok_or(StrategyError::Rejected)?;
        if !self.hasher.verify(password, stored) {
            debug!("password rejected for {username:?} on authority {}", authority.id);
            return Err(StrategyError::Rejected);
        }

        match store.get_user(&credential.user_id).await {
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
        let username = request
            .username
            .as_deref()
            .ok_or(StrategyError::MissingField("username"))?;
        let password = request
            .password
            .as_deref()
            .ok_or(StrategyError::MissingField("password"))?;

        let now = Utc::now();
        Ok(store
            .create_credential(Credential {
                authority_id: authority.id.clone(),
                subject: username.to_string(),
                user_id: user.id.clone(),
                secret_digest: Some(self.hasher.digest(password)),
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
        request: &LoginRequest,
    ) -> Result<Credential, StrategyError> {
        let password = request
            .password
            .as_deref()
            .ok_or(StrategyError::MissingField("password"))?;
        credential.secret_digest = Some(self.hasher.digest(password));
        credential.last_updated = Utc::now();
        Ok(store.update_credential(credential).await?)
    }
}
