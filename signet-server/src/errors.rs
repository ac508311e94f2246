use crate::store::StoreError;
use crate::strategies::StrategyError;
use crate::tokens::TokenError;
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::{json, Value};
use signet_scopes::ScopeError;
use thiserror::Error;

/// The request-level error taxonomy. Every variant maps to one HTTP status
/// and serializes as `{message, validation?}`; nothing here is fatal to the
/// process and nothing is silently recovered.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input the caller can fix and retry.
    #[error("{message}")]
    Validation {
        message: String,
        validation: Option<Value>,
    },
    /// Credentials rejected by a strategy.
    #[error("{0}")]
    Authentication(String),
    /// Secret mismatch or a scope the caller does not hold.
    #[error("{0}")]
    Forbidden(String),
    /// Entity absent. Consumed codes and unknown refresh secrets land here
    /// too, indistinguishable from records that never existed.
    #[error("{0}")]
    NotFound(String),
    /// Duplicate primary key on create.
    #[error("{0}")]
    Conflict(String),
    /// Upstream identity provider failure.
    #[error("upstream provider error: {0}")]
    Upstream(String),
    /// Storage or signing failure; retry policy belongs to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation<S: ToString>(message: S) -> Self {
        Self::Validation {
            message: message.to_string(),
            validation: None,
        }
    }

    /// A validation error carrying a field-level detail object.
    pub fn validation_with<S: ToString>(message: S, detail: Value) -> Self {
        Self::Validation {
            message: message.to_string(),
            validation: Some(detail),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = match &self {
            Self::Validation {
                message,
                validation: Some(detail),
            } => json!({ "message": message, "validation": detail }),
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("record not found".to_string()),
            StoreError::Conflict(key) => Self::Conflict(format!("record already exists: {key}")),
            StoreError::Backend(detail) => Self::Internal(detail),
        }
    }
}

impl From<StrategyError> for ServiceError {
    fn from(err: StrategyError) -> Self {
        match err {
            StrategyError::MissingField(field) => Self::validation_with(
                "missing credential field",
                json!({ "field": field, "detail": "required for this authority" }),
            ),
            StrategyError::Rejected => Self::Authentication("credentials rejected".to_string()),
            StrategyError::Misconfigured(detail) => Self::Internal(detail),
            StrategyError::Upstream(detail) => Self::Upstream(detail),
            StrategyError::Store(inner) => inner.into(),
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MalformedWireToken => Self::validation(err.to_string()),
            TokenError::Invalid | TokenError::WrongType => {
                Self::Authentication(err.to_string())
            }
            TokenError::Signing(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<ScopeError> for ServiceError {
    fn from(err: ScopeError) -> Self {
        Self::validation_with("invalid scope", json!({ "scope": err.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ServiceError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Authentication("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_detail_is_preserved() {
        let err = ServiceError::validation_with("bad scope list", json!({ "scope": "oops" }));
        match err {
            ServiceError::Validation { validation, .. } => {
                assert_eq!(validation, Some(json!({ "scope": "oops" })));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
