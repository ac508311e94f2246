use thiserror::Error;

/// Errors produced while parsing scope strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("invalid scope {0:?}: expected three colon-separated, dot-segmented domains")]
    Malformed(String),
}
