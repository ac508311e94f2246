//! The grant lifecycle: authorization-code issuance and token exchange for
//! one (user, client) pair.
//!
//! A grant moves through no-grant, pending-approval, code-issued and
//! exchanged states. The engine is request-scoped and keeps no state of its
//! own; everything durable lives in the grant record. Making a code
//! single-use rides entirely on the store's atomic nonce consumption, and
//! issuing a new code over an unconsumed one simply overwrites the nonce,
//! which is the intended one-live-code-per-grant policy.

use crate::errors::ServiceError;
use crate::models::{Grant, User};
use crate::store::{RecordStore, StoreError};
use crate::tokens::{self, TokenIssuer};
use chrono::Utc;
use log::{debug, info};
use signet_scopes::{Scope, ScopeCollection};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// A validated authorization request (`response_type=code`).
#[derive(Debug)]
pub struct AuthorizeRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Space-separated scope list, possibly empty
    pub scope: String,
    pub state: Option<String>,
}

/// A token endpoint request.
#[derive(Debug)]
pub struct ExchangeRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub code: Option<String>,
    pub refresh_token: Option<String>,
}

/// Where an authorization request ends up.
#[derive(Debug)]
pub enum AuthorizeOutcome {
    /// A code was issued; send the browser back to the client.
    Issued { redirect: Url },
    /// User approval is required before a code can exist. Not an error;
    /// the flow halts for an external step.
    ApprovalRequired {
        client_id: String,
        redirect_uri: String,
        requested: ScopeCollection,
        state: Option<String>,
    },
}

/// The result of a successful token exchange.
#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub scopes: ScopeCollection,
    pub expires_in: u64,
    /// Embedded when the granted scopes permit reading one's own profile;
    /// a convenience for clients, not part of the protocol.
    pub user: Option<User>,
}

/// Request-scoped memo of each user's role-derived scope set, owned by the
/// flow that needs it rather than hidden on the entity.
pub struct RoleScopeCache {
    cached: HashMap<String, ScopeCollection>,
}

impl RoleScopeCache {
    pub fn new() -> Self {
        Self {
            cached: HashMap::new(),
        }
    }

    /// The union of scopes from every role assigned to the user.
    pub async fn effective_scopes(
        &mut self,
        store: &dyn RecordStore,
        user_id: &str,
    ) -> Result<ScopeCollection, StoreError> {
        if let Some(hit) = self.cached.get(user_id) {
            return Ok(hit.clone());
        }
        let roles = store.roles_for_user(user_id).await?;
        let merged = roles
            .iter()
            .fold(ScopeCollection::new(), |acc, role| acc.union(&role.scopes))
            .simplified();
        self.cached.insert(user_id.to_string(), merged.clone());
        Ok(merged)
    }
}

#[derive(Clone)]
pub struct GrantLifecycle {
    store: Arc<dyn RecordStore>,
    issuer: Arc<TokenIssuer>,
}

impl GrantLifecycle {
    pub fn new(store: Arc<dyn RecordStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self { store, issuer }
    }

    /// Handle an authorization request for an authenticated user.
    ///
    /// `approval` carries the scope set the user just consented to, when the
    /// request arrived through the approval form. Without it, a previously
    /// stored grant speaks for the user; with neither, the flow halts for
    /// approval.
    pub async fn authorize(
        &self,
        user: &User,
        request: &AuthorizeRequest,
        approval: Option<&ScopeCollection>,
    ) -> Result<AuthorizeOutcome, ServiceError> {
        if request.response_type != "code" {
            return Err(ServiceError::validation(format!(
                "unsupported response_type {:?}, expected \"code\"",
                request.response_type
            )));
        }
        let requested: ScopeCollection = request.scope.parse()?;

        let client = self
            .store
            .get_client(&request.client_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    ServiceError::NotFound(format!("client {} does not exist", request.client_id))
                }
                other => other.into(),
            })?;

        let redirect = Url::parse(&request.redirect_uri)
            .map_err(|_| ServiceError::validation("redirect_uri is not a valid URL"))?;
        if request.redirect_uri != client.redirect_uri {
            return Err(ServiceError::validation(
                "redirect_uri does not match the client registration",
            ));
        }

        let existing = self.store.grant_for(&user.id, &client.id).await?;

        // What this user/client pair may be issued: the client's registered
        // maximum plus whatever the user has explicitly authorized.
        let (authorized, user_scopes) = match approval {
            Some(approved) => (
                client.scopes.union(approved).simplified(),
                approved.clone(),
            ),
            None => match &existing {
                Some(grant) => (
                    client.scopes.union(&grant.scopes).simplified(),
                    grant.scopes.clone(),
                ),
                None => {
                    debug!(
                        "no grant for user {} and client {}, approval required",
                        user.id, client.id
                    );
                    return Ok(AuthorizeOutcome::ApprovalRequired {
                        client_id: client.id,
                        redirect_uri: request.redirect_uri.clone(),
                        requested,
                        state: request.state.clone(),
                    });
                }
            },
        };

        let denied = requested
            .iter()
            .find(|scope| !authorized.admits(scope))
            .map(|scope| scope.to_string());
        if let Some(denied) = denied {
            debug!(
                "scope {denied} not covered for user {} and client {}, approval required",
                user.id, client.id
            );
            return Ok(AuthorizeOutcome::ApprovalRequired {
                client_id: client.id,
                redirect_uri: request.redirect_uri.clone(),
                requested,
                state: request.state.clone(),
            });
        }

        // One live code per grant: a fresh nonce invalidates any unconsumed
        // predecessor. The refresh secret outlives all of this.
        let nonce = tokens::generate_secret();
        let now = Utc::now();
        let grant = Grant {
            user_id: user.id.clone(),
            client_id: client.id.clone(),
            scopes: user_scopes,
            nonce: Some(nonce.clone()),
            refresh_token: existing
                .as_ref()
                .map(|g| g.refresh_token.clone())
                .unwrap_or_else(tokens::generate_secret),
            created: existing.as_ref().map(|g| g.created).unwrap_or(now),
            last_updated: now,
        };
        self.store.upsert_grant(grant).await?;

        let mut redirect = redirect;
        {
            let mut pairs = redirect.query_pairs_mut();
            pairs.append_pair("code", &tokens::encode_authorization_code(&user.id, &nonce));
            if let Some(state) = &request.state {
                pairs.append_pair("state", state);
            }
        }
        info!(
            "authorization code issued for user {} and client {}",
            user.id, client.id
        );
        Ok(AuthorizeOutcome::Issued { redirect })
    }

    /// Exchange an authorization code or refresh token for an access token.
    pub async fn exchange(&self, request: &ExchangeRequest) -> Result<IssuedTokens, ServiceError> {
        let client = self
            .store
            .get_client(&request.client_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    ServiceError::NotFound(format!("client {} does not exist", request.client_id))
                }
                other => other.into(),
            })?;
        if client.secret != request.client_secret {
            return Err(ServiceError::Forbidden("client secret mismatch".to_string()));
        }

        let grant = match request.grant_type.as_str() {
            "authorization_code" => {
                let code = request
                    .code
                    .as_deref()
                    .ok_or_else(|| ServiceError::validation("code is required"))?;
                let (user_id, nonce) = tokens::decode_authorization_code(code)
                    .map_err(|_| ServiceError::validation("malformed authorization code"))?;
                // Atomic compare-and-clear; a replayed or superseded code is
                // indistinguishable from one that never existed.
                self.store
                    .consume_grant_nonce(&user_id, &client.id, &nonce)
                    .await
                    .map_err(|e| match e {
                        StoreError::NotFound => ServiceError::NotFound(
                            "grant does not exist, or the code was already used".to_string(),
                        ),
                        other => other.into(),
                    })?
            }
            "refresh_token" => {
                let wire = request
                    .refresh_token
                    .as_deref()
                    .ok_or_else(|| ServiceError::validation("refresh_token is required"))?;
                let (user_id, secret) = tokens::decode_refresh_token(wire)
                    .map_err(|_| ServiceError::validation("malformed refresh token"))?;
                let grant = self
                    .store
                    .grant_for(&user_id, &client.id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("grant does not exist".to_string()))?;
                if grant.refresh_token != secret {
                    return Err(ServiceError::validation("refresh token does not match"));
                }
                grant
            }
            other => {
                return Err(ServiceError::validation(format!(
                    "unsupported grant_type {other:?}"
                )));
            }
        };

        let user = self
            .store
            .get_user(&grant.user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    ServiceError::NotFound(format!("user {} does not exist", grant.user_id))
                }
                other => other.into(),
            })?;

        // The three-way intersection: client-granted, user-granted and
        // role-granted permissions, with the roles read fresh rather than
        // baked into any earlier token.
        let mut role_cache = RoleScopeCache::new();
        let role_scopes = role_cache
            .effective_scopes(self.store.as_ref(), &user.id)
            .await?;
        let authorized = client.scopes.combine_with(&grant.scopes);
        let total = authorized.combine_with(&role_scopes);

        let access_token = self.issuer.sign_access(&user.id, &client.id, &total)?;
        // The wire value is re-derived from the stored secret; exchange
        // itself never rotates it.
        let refresh_token = tokens::encode_refresh_token(&user.id, &grant.refresh_token);

        let embedded = profile_scope(&user.id)
            .filter(|scope| total.allows(scope))
            .map(|_| user.clone());

        info!(
            "access token issued for user {} and client {} with {} scopes",
            user.id,
            client.id,
            total.len()
        );
        Ok(IssuedTokens {
            access_token,
            refresh_token,
            scopes: total,
            expires_in: self.issuer.access_ttl_secs(),
            user: embedded,
        })
    }

    /// Overwrite the grant's refresh secret, invalidating every refresh
    /// token previously derived from it.
    pub async fn rotate_refresh_token(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Grant, ServiceError> {
        let mut grant = self
            .store
            .grant_for(user_id, client_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("grant does not exist".to_string()))?;
        grant.refresh_token = tokens::generate_secret();
        grant.last_updated = Utc::now();
        let grant = self.store.upsert_grant(grant).await?;
        info!("refresh secret rotated for user {user_id} and client {client_id}");
        Ok(grant)
    }
}

/// The scope that permits reading one's own profile. Users with ids outside
/// the scope grammar simply never get the embedded-profile shortcut.
fn profile_scope(user_id: &str) -> Option<Scope> {
    Scope::parse(&format!("signet:users.{user_id}:read")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Role};
    use crate::store::memory::MemoryStore;
    use crate::tokens::TokenIssuer;
    use std::collections::HashMap;

    struct Harness {
        store: MemoryStore,
        lifecycle: GrantLifecycle,
    }

    fn harness() -> Harness {
        let store = MemoryStore::new();
        let issuer = Arc::new(TokenIssuer::new(
            b"test-signing-secret",
            "signet-test",
            3600,
            86400,
        ));
        let lifecycle = GrantLifecycle::new(Arc::new(store.clone()), issuer);
        Harness { store, lifecycle }
    }

    async fn seed_user(store: &MemoryStore, id: &str) -> User {
        store
            .create_user(User::new(id, &format!("{id}@example.com")))
            .await
            .unwrap()
    }

    async fn seed_client(store: &MemoryStore, id: &str, scopes: &str) -> Client {
        store
            .create_client(Client {
                id: id.to_string(),
                secret: "s3cret".to_string(),
                scopes: scopes.parse().unwrap(),
                redirect_uri: "https://app.example.com/callback".to_string(),
                base_url: None,
                created: Utc::now(),
            })
            .await
            .unwrap()
    }

    async fn seed_role(store: &MemoryStore, id: &str, scopes: &str, user_ids: &[&str]) {
        let mut assignments = HashMap::new();
        for user_id in user_ids {
            assignments.insert(user_id.to_string(), true);
        }
        store
            .create_role(Role {
                id: id.to_string(),
                scopes: scopes.parse().unwrap(),
                assignments,
            })
            .await
            .unwrap();
    }

    fn authorize_request(client_id: &str, scope: &str) -> AuthorizeRequest {
        AuthorizeRequest {
            response_type: "code".to_string(),
            client_id: client_id.to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            scope: scope.to_string(),
            state: Some("xyz".to_string()),
        }
    }

    fn exchange_request(client_id: &str, code: &str) -> ExchangeRequest {
        ExchangeRequest {
            grant_type: "authorization_code".to_string(),
            client_id: client_id.to_string(),
            client_secret: "s3cret".to_string(),
            code: Some(code.to_string()),
            refresh_token: None,
        }
    }

    fn code_from(outcome: &AuthorizeOutcome) -> String {
        match outcome {
            AuthorizeOutcome::Issued { redirect } => redirect
                .query_pairs()
                .find(|(k, _)| k == "code")
                .map(|(_, v)| v.into_owned())
                .expect("redirect carries a code"),
            other => panic!("expected an issued code, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_authorization_halts_for_approval() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;

        let outcome = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", "app:widgets:read"), None)
            .await
            .unwrap();
        assert!(matches!(outcome, AuthorizeOutcome::ApprovalRequired { .. }));
        // Halting is not an upsert: still no grant.
        assert!(h.store.grant_for("u-1", "c-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn approval_issues_a_code_and_persists_the_grant() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;

        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        let outcome = h
            .lifecycle
            .authorize(
                &user,
                &authorize_request("c-1", "app:widgets:read"),
                Some(&approval),
            )
            .await
            .unwrap();

        let AuthorizeOutcome::Issued { redirect } = &outcome else {
            panic!("expected an issued code");
        };
        assert!(redirect.as_str().starts_with("https://app.example.com/callback?"));
        assert!(redirect.query_pairs().any(|(k, v)| k == "state" && v == "xyz"));

        let grant = h.store.grant_for("u-1", "c-1").await.unwrap().unwrap();
        assert_eq!(grant.scopes, approval);
        assert!(grant.nonce.is_some());
    }

    #[tokio::test]
    async fn out_of_policy_scopes_halt_for_approval() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:widgets:*").await;
        // The user previously authorized widget reads only.
        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        h.lifecycle
            .authorize(
                &user,
                &authorize_request("c-1", "app:widgets:read"),
                Some(&approval),
            )
            .await
            .unwrap();

        let outcome = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", "app:secrets:read"), None)
            .await
            .unwrap();
        assert!(matches!(outcome, AuthorizeOutcome::ApprovalRequired { .. }));
    }

    #[tokio::test]
    async fn rejects_bad_requests() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;

        let mut bad_type = authorize_request("c-1", "");
        bad_type.response_type = "token".to_string();
        assert!(matches!(
            h.lifecycle.authorize(&user, &bad_type, None).await,
            Err(ServiceError::Validation { .. })
        ));

        let bad_scope = authorize_request("c-1", "not a scope!");
        assert!(matches!(
            h.lifecycle.authorize(&user, &bad_scope, None).await,
            Err(ServiceError::Validation { .. })
        ));

        let mut bad_redirect = authorize_request("c-1", "");
        bad_redirect.redirect_uri = "https://elsewhere.example.com/cb".to_string();
        assert!(matches!(
            h.lifecycle.authorize(&user, &bad_redirect, None).await,
            Err(ServiceError::Validation { .. })
        ));

        assert!(matches!(
            h.lifecycle
                .authorize(&user, &authorize_request("ghost", ""), None)
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn exchange_intersects_client_grant_and_role_scopes() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;
        seed_role(&h.store, "r-1", "app:widgets:* app:reports:read", &["u-1"]).await;

        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        let outcome = h
            .lifecycle
            .authorize(
                &user,
                &authorize_request("c-1", "app:widgets:read"),
                Some(&approval),
            )
            .await
            .unwrap();

        let issued = h
            .lifecycle
            .exchange(&exchange_request("c-1", &code_from(&outcome)))
            .await
            .unwrap();
        let expected: ScopeCollection = "app:widgets:read".parse().unwrap();
        assert_eq!(issued.scopes, expected);
        assert_eq!(issued.expires_in, 3600);
        // No profile-reading scope in the set, so no embedded user.
        assert!(issued.user.is_none());
    }

    #[tokio::test]
    async fn a_code_cannot_be_exchanged_twice() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;
        seed_role(&h.store, "r-1", "app:**:*", &["u-1"]).await;

        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        let outcome = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", ""), Some(&approval))
            .await
            .unwrap();
        let code = code_from(&outcome);

        assert!(h.lifecycle.exchange(&exchange_request("c-1", &code)).await.is_ok());
        assert!(matches!(
            h.lifecycle.exchange(&exchange_request("c-1", &code)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_exchanges_admit_one_winner() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;
        seed_role(&h.store, "r-1", "app:**:*", &["u-1"]).await;

        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        let outcome = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", ""), Some(&approval))
            .await
            .unwrap();
        let code = code_from(&outcome);

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let lifecycle = h.lifecycle.clone();
            let code = code.clone();
            tasks.push(tokio::spawn(async move {
                lifecycle.exchange(&exchange_request("c-1", &code)).await
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

    #[tokio::test]
    async fn a_newer_code_invalidates_the_previous_one() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;
        seed_role(&h.store, "r-1", "app:**:*", &["u-1"]).await;

        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        let first = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", ""), Some(&approval))
            .await
            .unwrap();
        let second = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", ""), None)
            .await
            .unwrap();

        assert!(matches!(
            h.lifecycle
                .exchange(&exchange_request("c-1", &code_from(&first)))
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(h
            .lifecycle
            .exchange(&exchange_request("c-1", &code_from(&second)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn refresh_reuses_the_stored_secret() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;
        seed_role(&h.store, "r-1", "app:**:*", &["u-1"]).await;

        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        let outcome = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", ""), Some(&approval))
            .await
            .unwrap();
        let issued = h
            .lifecycle
            .exchange(&exchange_request("c-1", &code_from(&outcome)))
            .await
            .unwrap();

        let refresh = ExchangeRequest {
            grant_type: "refresh_token".to_string(),
            client_id: "c-1".to_string(),
            client_secret: "s3cret".to_string(),
            code: None,
            refresh_token: Some(issued.refresh_token.clone()),
        };
        let refreshed = h.lifecycle.exchange(&refresh).await.unwrap();
        // Exchange never rotates the underlying secret, so the wire value
        // is stable and stays redeemable.
        assert_eq!(refreshed.refresh_token, issued.refresh_token);
        assert!(h.lifecycle.exchange(&refresh).await.is_ok());
    }

    #[tokio::test]
    async fn stale_refresh_tokens_fail_after_rotation() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;
        seed_role(&h.store, "r-1", "app:**:*", &["u-1"]).await;

        let approval: ScopeCollection = "app:widgets:read".parse().unwrap();
        let outcome = h
            .lifecycle
            .authorize(&user, &authorize_request("c-1", ""), Some(&approval))
            .await
            .unwrap();
        let issued = h
            .lifecycle
            .exchange(&exchange_request("c-1", &code_from(&outcome)))
            .await
            .unwrap();

        h.lifecycle.rotate_refresh_token("u-1", "c-1").await.unwrap();

        let stale = ExchangeRequest {
            grant_type: "refresh_token".to_string(),
            client_id: "c-1".to_string(),
            client_secret: "s3cret".to_string(),
            code: None,
            refresh_token: Some(issued.refresh_token),
        };
        assert!(matches!(
            h.lifecycle.exchange(&stale).await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn secret_mismatch_is_forbidden() {
        let h = harness();
        seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;

        let mut request = exchange_request("c-1", "whatever");
        request.client_secret = "wrong".to_string();
        assert!(matches!(
            h.lifecycle.exchange(&request).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn malformed_codes_are_validation_errors() {
        let h = harness();
        seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "app:*:*").await;

        for bad in ["%%%", "bm90IGpzb24"] {
            assert!(matches!(
                h.lifecycle.exchange(&exchange_request("c-1", bad)).await,
                Err(ServiceError::Validation { .. })
            ));
        }

        assert!(matches!(
            h.lifecycle
                .exchange(&ExchangeRequest {
                    grant_type: "password".to_string(),
                    client_id: "c-1".to_string(),
                    client_secret: "s3cret".to_string(),
                    code: None,
                    refresh_token: None,
                })
                .await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn profile_scope_embeds_the_user() {
        let h = harness();
        let user = seed_user(&h.store, "u-1").await;
        seed_client(&h.store, "c-1", "signet:**:*").await;
        seed_role(&h.store, "r-1", "signet:users.**:read", &["u-1"]).await;

        let approval: ScopeCollection = "signet:users.u-1:read".parse().unwrap();
        let outcome = h
            .lifecycle
            .authorize(
                &user,
                &authorize_request("c-1", "signet:users.u-1:read"),
                Some(&approval),
            )
            .await
            .unwrap();
        let issued = h
            .lifecycle
            .exchange(&exchange_request("c-1", &code_from(&outcome)))
            .await
            .unwrap();

        assert_eq!(issued.user.as_ref().map(|u| u.id.as_str()), Some("u-1"));
    }
}
