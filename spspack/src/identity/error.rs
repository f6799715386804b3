//! Error types for document identity resolution.

use std::fmt;

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors raised while resolving a document's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The document has no `front/article-meta` to read from.
    NoArticleMeta,

    /// No usable order value: both identifier sources are absent, or the
    /// candidate value is not a number in `0..=99999`.
    InvalidOrder(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::NoArticleMeta => {
                write!(f, "document carries no front/article-meta")
            }
            IdentityError::InvalidOrder(value) => {
                write!(f, "invalid value for order: {}", value)
            }
        }
    }
}

impl std::error::Error for IdentityError {}
