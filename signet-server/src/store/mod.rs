use crate::models::{Authority, Client, Credential, Grant, Role, User};
use thiserror::Error;

pub mod memory;

/// Errors surfaced by a record store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate record: {0}")]
    Conflict(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// The narrow record-access interface the engine consumes.
///
/// How records are stored is irrelevant here; the only structural demand on
/// a backend is that `consume_grant_nonce` is a single conditional update.
/// A read followed by a write is not an acceptable implementation: two
/// concurrent exchanges of one authorization code would both pass the read.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<User, StoreError>;
    async fn create_user(&self, user: User) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn get_client(&self, id: &str) -> Result<Client, StoreError>;
    async fn create_client(&self, client: Client) -> Result<Client, StoreError>;

    async fn get_authority(&self, id: &str) -> Result<Authority, StoreError>;
    async fn create_authority(&self, authority: Authority) -> Result<Authority, StoreError>;

    async fn find_credential(
        &self,
        authority_id: &str,
        subject: &str,
    ) -> Result<Option<Credential>, StoreError>;
    async fn create_credential(&self, credential: Credential) -> Result<Credential, StoreError>;
    async fn update_credential(&self, credential: Credential) -> Result<Credential, StoreError>;

    async fn create_role(&self, role: Role) -> Result<Role, StoreError>;
    /// Every role whose assignments map marks this user true.
    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<Role>, StoreError>;

    async fn grant_for(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<Grant>, StoreError>;
    /// Insert or replace the grant for its (user_id, client_id) key. Racing
    /// upserts for the same key resolve last-writer-wins, which is the
    /// intended one-live-code-per-grant policy.
    async fn upsert_grant(&self, grant: Grant) -> Result<Grant, StoreError>;
    async fn delete_grant(&self, user_id: &str, client_id: &str) -> Result<(), StoreError>;
    /// Atomically clear the grant's nonce if and only if it currently equals
    /// `expected_nonce`, returning the updated grant. `NotFound` covers both
    /// an absent grant and a mismatched nonce, so a consumed code is
    /// indistinguishable from one that never existed.
    async fn consume_grant_nonce(
        &self,
        user_id: &str,
        client_id: &str,
        expected_nonce: &str,
    ) -> Result<Grant, StoreError>;
}
