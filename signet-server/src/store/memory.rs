use super::{RecordStore, StoreError};
use crate::models::{Authority, Client, Credential, Grant, Role, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    clients: HashMap<String, Client>,
    authorities: HashMap<String, Authority>,
    credentials: HashMap<(String, String), Credential>,
    roles: HashMap<String, Role>,
    grants: HashMap<(String, String), Grant>,
}

/// In-process record store.
///
/// All tables live behind one async lock; `consume_grant_nonce` does its
/// compare-and-clear under a single write guard, which is what makes a code
/// single-use even when two exchanges race. Deployments with durable
/// storage provide their own `RecordStore` over the same contract.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .users
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {}", user.id)));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_client(&self, id: &str) -> Result<Client, StoreError> {
        self.tables
            .read()
            .await
            .clients
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_client(&self, client: Client) -> Result<Client, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.clients.contains_key(&client.id) {
            return Err(StoreError::Conflict(format!("client {}", client.id)));
        }
        tables.clients.insert(client.id.clone(), client.clone());
        Ok(client)
    }

    async fn get_authority(&self, id: &str) -> Result<Authority, StoreError> {
        self.tables
            .read()
            .await
            .authorities
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_authority(&self, authority: Authority) -> Result<Authority, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.authorities.contains_key(&authority.id) {
            return Err(StoreError::Conflict(format!("authority {}", authority.id)));
        }
        tables
            .authorities
            .insert(authority.id.clone(), authority.clone());
        Ok(authority)
    }

    async fn find_credential(
        &self,
        authority_id: &str,
        subject: &str,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .credentials
            .get(&(authority_id.to_string(), subject.to_string()))
            .cloned())
    }

    async fn create_credential(&self, credential: Credential) -> Result<Credential, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (credential.authority_id.clone(), credential.subject.clone());
        if tables.credentials.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "credential {}/{}",
                key.0, key.1
            )));
        }
        tables.credentials.insert(key, credential.clone());
        Ok(credential)
    }

    async fn update_credential(&self, credential: Credential) -> Result<Credential, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (credential.authority_id.clone(), credential.subject.clone());
        if !tables.credentials.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        tables.credentials.insert(key, credential.clone());
        Ok(credential)
    }

    async fn create_role(&self, role: Role) -> Result<Role, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.roles.contains_key(&role.id) {
            return Err(StoreError::Conflict(format!("role {}", role.id)));
        }
        tables.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<Role>, StoreError> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables
            .roles
            .values()
            .filter(|role| role.assigns(user_id))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(roles)
    }

    async fn grant_for(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<Grant>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .grants
            .get(&(user_id.to_string(), client_id.to_string()))
            .cloned())
    }

    async fn upsert_grant(&self, grant: Grant) -> Result<Grant, StoreError> {
        let mut tables = self.tables.write().await;
        tables.grants.insert(grant.key(), grant.clone());
        Ok(grant)
    }

    async fn delete_grant(&self, user_id: &str, client_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .grants
            .remove(&(user_id.to_string(), client_id.to_string()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn consume_grant_nonce(
        &self,
        user_id: &str,
        client_id: &str,
        expected_nonce: &str,
    ) -> Result<Grant, StoreError> {
        let mut tables = self.tables.write().await;
        let grant = tables
            .grants
            .get_mut(&(user_id.to_string(), client_id.to_string()))
            .ok_or(StoreError::NotFound)?;
        if grant.nonce.as_deref() != Some(expected_nonce) {
            return Err(StoreError::NotFound);
        }
        grant.nonce = None;
        grant.last_updated = Utc::now();
        Ok(grant.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signet_scopes::ScopeCollection;

    fn grant(user: &str, client: &str, nonce: Option<&str>) -> Grant {
        Grant {
            user_id: user.to_string(),
            client_id: client.to_string(),
            scopes: ScopeCollection::new(),
            nonce: nonce.map(str::to_string),
            refresh_token: "refresh-secret".to_string(),
            created: Utc::now(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_get_user() {
        let store = MemoryStore::new();
        store
            .create_user(User::new("u-1", "ada@example.com"))
            .await
            .unwrap();

        let user = store.get_user("u-1").await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert!(matches!(
            store.get_user("missing").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let store = MemoryStore::new();
        store
            .create_user(User::new("u-1", "ada@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            store.create_user(User::new("u-1", "other@example.com")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn roles_for_user_honors_assignments() {
        let store = MemoryStore::new();
        let mut role = Role {
            id: "admins".to_string(),
            scopes: "app:**:*".parse().unwrap(),
            assignments: HashMap::new(),
        };
        role.assignments.insert("u-1".to_string(), true);
        role.assignments.insert("u-2".to_string(), false);
        store.create_role(role).await.unwrap();

        assert_eq!(store.roles_for_user("u-1").await.unwrap().len(), 1);
        assert!(store.roles_for_user("u-2").await.unwrap().is_empty());
        assert!(store.roles_for_user("u-3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_removes_grants() {
        let store = MemoryStore::new();
        store
            .upsert_grant(grant("u-1", "c-1", Some("nonce-a")))
            .await
            .unwrap();
        store
            .upsert_grant(grant("u-1", "c-1", Some("nonce-b")))
            .await
            .unwrap();

        let current = store.grant_for("u-1", "c-1").await.unwrap().unwrap();
        assert_eq!(current.nonce.as_deref(), Some("nonce-b"));

        store.delete_grant("u-1", "c-1").await.unwrap();
        assert!(store.grant_for("u-1", "c-1").await.unwrap().is_none());
        assert!(matches!(
            store.delete_grant("u-1", "c-1").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn consume_nonce_clears_exactly_once() {
        let store = MemoryStore::new();
        store
            .upsert_grant(grant("u-1", "c-1", Some("nonce-a")))
            .await
            .unwrap();

        let consumed = store
            .consume_grant_nonce("u-1", "c-1", "nonce-a")
            .await
            .unwrap();
        assert_eq!(consumed.nonce, None);

        // The second attempt sees a cleared nonce and cannot distinguish it
        // from a grant that never existed.
        assert!(matches!(
            store.consume_grant_nonce("u-1", "c-1", "nonce-a").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn consume_nonce_rejects_mismatch() {
        let store = MemoryStore::new();
        store
            .upsert_grant(grant("u-1", "c-1", Some("nonce-a")))
            .await
            .unwrap();

        assert!(matches!(
            store.consume_grant_nonce("u-1", "c-1", "nonce-b").await,
            Err(StoreError::NotFound)
        ));
        // A mismatched attempt must not burn the live nonce.
        let current = store.grant_for("u-1", "c-1").await.unwrap().unwrap();
        assert_eq!(current.nonce.as_deref(), Some("nonce-a"));
    }

    #[tokio::test]
    async fn concurrent_consumes_admit_one_winner() {
        let store = MemoryStore::new();
        store
            .upsert_grant(grant("u-1", "c-1", Some("nonce-a")))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.consume_grant_nonce("u-1", "c-1", "nonce-a").await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
