//! Auth error types.

use thiserror::Error;

/// Auth error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Signing, parsing, or validating a token failed. Covers bad
    /// signatures, malformed tokens, and expiry.
    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
