//! Login sessions.
//!
//! A session is a signed token carried as a bearer header or cookie. There
//! is no session table: the token itself is the capability, scoped to this
//! realm and bounded by its expiry.

use crate::errors::ServiceError;
use crate::models::User;
use crate::state::AppState;
use crate::store::StoreError;
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;

/// Resolve the user behind the request's session, if any. An invalid or
/// expired token reads as "not logged in", never as a server error.
pub async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ServiceError> {
    let token = match bearer_token(headers)
        .or_else(|| cookie_token(headers, &state.config.sessions.cookie))
    {
        Some(token) => token,
        None => return Ok(None),
    };
    let claims = match state.issuer.verify_session(&token) {
        Ok(claims) => claims,
        Err(_) => return Ok(None),
    };
    match state.store.get_user(&claims.sub).await {
        Ok(user) => Ok(Some(user)),
        Err(StoreError::NotFound) => Ok(None),
        Err(other) => Err(other.into()),
    }
}

/// The Set-Cookie value for a fresh session token.
pub fn session_cookie(name: &str, token: &str, ttl_secs: u64) -> String {
    format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_secs}")
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
