//! Session establishment: strategy-backed login and email-link requests.

use crate::errors::ServiceError;
use crate::models::{AuthorityKind, User};
use crate::sessions;
use crate::state::AppState;
use crate::store::StoreError;
use crate::strategies::LoginRequest;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http::header::SET_COOKIE;
use http::StatusCode;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Signed session token; also delivered as a cookie
    pub session_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkRequest {
    pub authority: String,
    pub email: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/login/link", post(request_link))
}

/// Authenticate against an authority and establish a session
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = LoginResponse),
        (status = 401, description = "Credentials rejected"),
        (status = 404, description = "Unknown authority")
    ),
    tag = "Session"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Response {
    let authority = match state.store.get_authority(&request.authority).await {
        Ok(authority) => authority,
        Err(StoreError::NotFound) => {
            return ServiceError::NotFound(format!(
                "authority {} does not exist",
                request.authority
            ))
            .into_response();
        }
        Err(other) => return ServiceError::from(other).into_response(),
    };

    let strategy = state.strategies.select(authority.kind);
    let user = match strategy
        .authenticate(&authority, state.store.as_ref(), &request)
        .await
    {
        Ok(user) => user,
        Err(err) => return ServiceError::from(err).into_response(),
    };

    let token = match state.issuer.sign_session(&user.id) {
        Ok(token) => token,
        Err(err) => return ServiceError::from(err).into_response(),
    };

    info!(
        "session established for user {} via authority {}",
        user.id, authority.id
    );
    let cookie = sessions::session_cookie(
        &state.config.sessions.cookie,
        &token,
        state.config.sessions.ttl_secs,
    );
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            session_token: token,
            user,
        }),
    )
        .into_response()
}

/// Request a single-use login link by email
#[utoipa::path(
    post,
    path = "/login/link",
    request_body = LinkRequest,
    responses(
        (status = 202, description = "A link was sent if the account exists"),
        (status = 400, description = "The authority does not do email-link login"),
        (status = 404, description = "Unknown authority")
    ),
    tag = "Session"
)]
pub(crate) async fn request_link(
    State(state): State<AppState>,
    Json(request): Json<LinkRequest>,
) -> Response {
    let authority = match state.store.get_authority(&request.authority).await {
        Ok(authority) => authority,
        Err(StoreError::NotFound) => {
            return ServiceError::NotFound(format!(
                "authority {} does not exist",
                request.authority
            ))
            .into_response();
        }
        Err(other) => return ServiceError::from(other).into_response(),
    };
    if authority.kind != AuthorityKind::EmailLink {
        return ServiceError::validation(format!(
            "authority {} does not issue login links",
            authority.id
        ))
        .into_response();
    }

    match state
        .strategies
        .email_link
        .begin(state.store.as_ref(), &request.email)
        .await
    {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "message": "a login link was sent if the account exists" })),
        )
            .into_response(),
        Err(err) => ServiceError::from(err).into_response(),
    }
}
