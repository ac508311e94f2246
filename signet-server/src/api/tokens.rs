//! The `/tokens` endpoint: authorization requests and token exchange.
//!
//! `GET /tokens` starts the authorization-code flow. `POST /tokens` serves
//! two shapes, told apart by `grant_type`: a token exchange when it is
//! present, otherwise an authorization request carrying the user's approval
//! payload.

use crate::errors::ServiceError;
use crate::grants::{AuthorizeOutcome, AuthorizeRequest, ExchangeRequest};
use crate::models::User;
use crate::sessions;
use crate::state::AppState;
use axum::extract::{FromRequest, Query, Request, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use signet_scopes::ScopeCollection;
use utoipa::ToSchema;

/// Query parameters of an authorization request. Presence is validated by
/// the handler so that failures come back in the standard error shape.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuthorizeParams {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    /// Space-separated scope list
    pub scope: Option<String>,
    /// Opaque value echoed back to the client
    pub state: Option<String>,
    /// The user the client expects to be acting for
    pub username: Option<String>,
}

/// Body of `POST /tokens`, accepted as JSON or form encoding.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TokensPostBody {
    // Token exchange fields
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code: Option<String>,
    pub refresh_token: Option<String>,
    // Authorization fields
    pub response_type: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub username: Option<String>,
    /// Scopes the user consented to on the approval page
    pub approved_scopes: Option<String>,
}

impl<S> FromRequest<S> for TokensPostBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        if content_type.starts_with("application/json") {
            match Json::<TokensPostBody>::from_request(req, state).await {
                Ok(Json(body)) => Ok(body),
                Err(_) => Err(ServiceError::validation("invalid JSON request body")
                    .into_response()),
            }
        } else {
            match Form::<TokensPostBody>::from_request(req, state).await {
                Ok(Form(body)) => Ok(body),
                Err(_) => Err(ServiceError::validation("invalid form request body")
                    .into_response()),
            }
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IntrospectRequest {
    pub token: String,
}

/// Introspection result for resource servers (RFC 7662 shape).
#[derive(Debug, Serialize, ToSchema)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl IntrospectionResponse {
    fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            sub: None,
            iss: None,
            exp: None,
            iat: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
    /// Granted scopes, space-separated
    pub scope: String,
    /// Present when the granted scopes permit reading one's own profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tokens", get(authorize).post(token))
        .route("/introspect", axum::routing::post(introspect))
}

/// Token introspection for resource servers
#[utoipa::path(
    post,
    path = "/introspect",
    request_body = IntrospectRequest,
    responses(
        (status = 200, description = "Introspection result", body = IntrospectionResponse),
        (status = 400, description = "Missing token")
    ),
    tag = "Tokens"
)]
pub(crate) async fn introspect(
    State(state): State<AppState>,
    Form(request): Form<IntrospectRequest>,
) -> Response {
    if request.token.is_empty() {
        return ServiceError::validation("token is required").into_response();
    }
    match state.issuer.verify_access(&request.token) {
        Ok(claims) => Json(IntrospectionResponse {
            active: true,
            scope: Some(claims.scopes.to_string()),
            client_id: Some(claims.aud),
            sub: Some(claims.sub),
            iss: Some(claims.iss),
            exp: Some(claims.exp),
            iat: Some(claims.iat),
        })
        .into_response(),
        // Invalid, expired and foreign tokens are all simply inactive.
        Err(_) => Json(IntrospectionResponse::inactive()).into_response(),
    }
}

/// Authorization request (`response_type=code`)
#[utoipa::path(
    get,
    path = "/tokens",
    params(
        ("response_type" = Option<String>, Query, description = "Must be 'code'"),
        ("client_id" = Option<String>, Query, description = "Client identifier"),
        ("redirect_uri" = Option<String>, Query, description = "Registered redirect URI"),
        ("scope" = Option<String>, Query, description = "Requested scopes, space-separated"),
        ("state" = Option<String>, Query, description = "Opaque value echoed on the redirect"),
        ("username" = Option<String>, Query, description = "The user the client expects")
    ),
    responses(
        (status = 303, description = "Redirect with a code, or to login/approval"),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "Unknown client")
    ),
    tag = "Tokens"
)]
pub(crate) async fn authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    run_authorize(state, headers, params, None).await
}

/// Token exchange, or an authorization request with an approval payload
#[utoipa::path(
    post,
    path = "/tokens",
    request_body = TokensPostBody,
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 303, description = "Authorization redirect"),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Client secret mismatch"),
        (status = 404, description = "Grant absent or code already used")
    ),
    tag = "Tokens"
)]
pub(crate) async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: TokensPostBody,
) -> Response {
    if body.grant_type.is_some() {
        return run_exchange(state, body).await;
    }
    let params = AuthorizeParams {
        response_type: body.response_type,
        client_id: body.client_id,
        redirect_uri: body.redirect_uri,
        scope: body.scope,
        state: body.state,
        username: body.username,
    };
    run_authorize(state, headers, params, body.approved_scopes).await
}

async fn run_authorize(
    state: AppState,
    headers: HeaderMap,
    params: AuthorizeParams,
    approval: Option<String>,
) -> Response {
    let user = match sessions::resolve(&state, &headers).await {
        Ok(Some(user)) => user,
        // No session: the flow restarts after login, out of band.
        Ok(None) => return Redirect::to("/login").into_response(),
        Err(err) => return err.into_response(),
    };
    if let Some(expected) = &params.username {
        if *expected != user.id && *expected != user.email {
            debug!(
                "session user {} is not the expected user, redirecting to login",
                user.id
            );
            return Redirect::to("/login").into_response();
        }
    }

    let (Some(response_type), Some(client_id), Some(redirect_uri)) = (
        params.response_type,
        params.client_id,
        params.redirect_uri,
    ) else {
        return ServiceError::validation(
            "response_type, client_id and redirect_uri are required",
        )
        .into_response();
    };

    let approval = match approval.as_deref().map(str::parse::<ScopeCollection>) {
        Some(Ok(scopes)) => Some(scopes),
        Some(Err(err)) => return ServiceError::from(err).into_response(),
        None => None,
    };

    let request = AuthorizeRequest {
        response_type,
        client_id,
        redirect_uri,
        scope: params.scope.unwrap_or_default(),
        state: params.state,
    };
    match state.grants.authorize(&user, &request, approval.as_ref()).await {
        Ok(AuthorizeOutcome::Issued { redirect }) => {
            Redirect::to(redirect.as_str()).into_response()
        }
        Ok(AuthorizeOutcome::ApprovalRequired {
            client_id,
            redirect_uri,
            requested,
            state: flow_state,
        }) => {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("client_id", &client_id);
            query.append_pair("redirect_uri", &redirect_uri);
            query.append_pair("scope", &requested.to_string());
            if let Some(flow_state) = &flow_state {
                query.append_pair("state", flow_state);
            }
            Redirect::to(&format!("/approve?{}", query.finish())).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn run_exchange(state: AppState, body: TokensPostBody) -> Response {
    let (Some(grant_type), Some(client_id), Some(client_secret)) =
        (body.grant_type, body.client_id, body.client_secret)
    else {
        return ServiceError::validation(
            "grant_type, client_id and client_secret are required",
        )
        .into_response();
    };
    info!("token request from client {client_id} with grant_type {grant_type}");

    let request = ExchangeRequest {
        grant_type,
        client_id,
        client_secret,
        code: body.code,
        refresh_token: body.refresh_token,
    };
    match state.grants.exchange(&request).await {
        Ok(issued) => Json(TokenResponse {
            access_token: issued.access_token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
            refresh_token: issued.refresh_token,
            scope: issued.scopes.to_string(),
            user: issued.user,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
