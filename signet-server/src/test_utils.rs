//! Shared fixture for endpoint tests: an app wired to a fresh in-memory
//! store, seeding helpers, and oneshot request plumbing.

use crate::create_app;
use crate::models::{Authority, AuthorityKind, Client, Role, User};
use crate::state::AppState;
use crate::strategies::{CredentialStrategy, LoginRequest};
use axum::body::Body;
use axum::Router;
use chrono::Utc;
use http::header::{CONTENT_TYPE, COOKIE, LOCATION};
use http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use tower::ServiceExt;

pub struct TestFixture {
    pub state: AppState,
    pub app: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn location(&self) -> Option<String> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

impl TestFixture {
    pub async fn new() -> Self {
        let state = AppState::for_testing();
        let app = create_app(state.clone()).await;
        Self { state, app }
    }

    pub async fn seed_user(&self, id: &str) -> User {
        self.state
            .store
            .create_user(User::new(id, format!("{id}@example.com")))
            .await
            .expect("seed user")
    }

    pub async fn seed_client(&self, id: &str, scopes: &str) -> Client {
        self.state
            .store
            .create_client(Client {
                id: id.to_string(),
                secret: "s3cret".to_string(),
                scopes: scopes.parse().expect("seed client scopes"),
                redirect_uri: "https://app.example.com/callback".to_string(),
                base_url: None,
                created: Utc::now(),
            })
            .await
            .expect("seed client")
    }

    pub async fn seed_role(&self, id: &str, scopes: &str, user_ids: &[&str]) -> Role {
        let mut assignments = HashMap::new();
        for user_id in user_ids {
            assignments.insert(user_id.to_string(), true);
        }
        self.state
            .store
            .create_role(Role {
                id: id.to_string(),
                scopes: scopes.parse().expect("seed role scopes"),
                assignments,
            })
            .await
            .expect("seed role")
    }

    /// A password authority named "local" plus a credential on it.
    pub async fn seed_password_credential(&self, user_id: &str, username: &str, password: &str) {
        let authority = self
            .state
            .store
            .create_authority(Authority {
                id: "local".to_string(),
                kind: AuthorityKind::Password,
                settings: Default::default(),
            })
            .await
            .expect("seed authority");
        let user = self.state.store.get_user(user_id).await.expect("seeded user");
        let request = LoginRequest {
            authority: authority.id.clone(),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Default::default()
        };
        self.state
            .strategies
            .password
            .create_credential(&authority, self.state.store.as_ref(), &user, &request)
            .await
            .expect("seed credential");
    }

    pub async fn seed_email_authority(&self) -> Authority {
        self.state
            .store
            .create_authority(Authority {
                id: "email".to_string(),
                kind: AuthorityKind::EmailLink,
                settings: Default::default(),
            })
            .await
            .expect("seed authority")
    }

    /// A signed session token for an already-seeded user.
    pub fn session_for(&self, user_id: &str) -> String {
        self.state
            .issuer
            .sign_session(user_id)
            .expect("session token")
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> TestResponse {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(token) = session {
            request = request.header(COOKIE, format!("signet_session={token}"));
        }
        self.send(request.body(Body::empty()).expect("request")).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: &Value,
        session: Option<&str>,
    ) -> TestResponse {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = session {
            request = request.header(COOKIE, format!("signet_session={token}"));
        }
        self.send(
            request
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, session: Option<&str>) -> TestResponse {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = session {
            request = request.header(COOKIE, format!("signet_session={token}"));
        }
        self.send(
            request
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }

    pub async fn post_form_with_session(
        &self,
        uri: &str,
        body: &str,
        session: &str,
    ) -> TestResponse {
        self.post_form(uri, body, Some(session)).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}
