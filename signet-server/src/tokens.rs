//! Signing and verification of access/session tokens, plus the opaque wire
//! encodings for authorization codes and refresh tokens.
//!
//! Access tokens and sessions are signed claims; codes and refresh tokens
//! are base64 JSON pairs reconstructable only from grant state. The server
//! keeps no session table for any of them: they are capability tokens over
//! the records they reference.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use signet_scopes::ScopeCollection;
use thiserror::Error;

const ACCESS_TOKEN_TYPE: &str = "access_token";
const SESSION_TOKEN_TYPE: &str = "session_token";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token payload")]
    MalformedWireToken,
    #[error("token rejected")]
    Invalid,
    #[error("token is not of the expected type")]
    WrongType,
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub typ: String,
    pub scopes: ScopeCollection,
    /// The client the token was issued to
    pub aud: String,
    /// The user the token acts for
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

/// Claims carried by a login session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub typ: String,
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

/// Signs and verifies every token this deployment emits, bound to one realm.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    realm: String,
    access_ttl_secs: u64,
    session_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], realm: &str, access_ttl_secs: u64, session_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            realm: realm.to_string(),
            access_ttl_secs,
            session_ttl_secs,
        }
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    pub fn sign_access(
        &self,
        user_id: &str,
        client_id: &str,
        scopes: &ScopeCollection,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            typ: ACCESS_TOKEN_TYPE.to_string(),
            scopes: scopes.clone(),
            aud: client_id.to_string(),
            sub: user_id.to_string(),
            iss: self.realm.clone(),
            exp: now + self.access_ttl_secs as i64,
            iat: now,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|_| TokenError::Invalid)?
            .claims;
        if claims.typ != ACCESS_TOKEN_TYPE {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    pub fn sign_session(&self, user_id: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            typ: SESSION_TOKEN_TYPE.to_string(),
            sub: user_id.to_string(),
            iss: self.realm.clone(),
            exp: now + self.session_ttl_secs as i64,
            iat: now,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|_| TokenError::Invalid)?
            .claims;
        if claims.typ != SESSION_TOKEN_TYPE {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.realm]);
        // Audience is checked by the flow that knows which client to expect.
        validation.validate_aud = false;
        validation
    }
}

/// `base64url(json([user_id, nonce]))`
pub fn encode_authorization_code(user_id: &str, nonce: &str) -> String {
    encode_pair(user_id, nonce)
}

pub fn decode_authorization_code(code: &str) -> Result<(String, String), TokenError> {
    decode_pair(code)
}

/// `base64url(json([user_id, refresh_secret]))`
pub fn encode_refresh_token(user_id: &str, secret: &str) -> String {
    encode_pair(user_id, secret)
}

pub fn decode_refresh_token(token: &str) -> Result<(String, String), TokenError> {
    decode_pair(token)
}

/// 256 bits of randomness, base64url-encoded. Used for nonces, refresh
/// secrets and email-link tokens.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn encode_pair(a: &str, b: &str) -> String {
    // Serializing two strings cannot fail.
    let json = serde_json::to_vec(&(a, b)).expect("wire pair serialization");
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_pair(encoded: &str) -> Result<(String, String), TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| TokenError::MalformedWireToken)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::MalformedWireToken)
}
