//! JWT session tokens.

use crate::AuthResult;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signing configuration, constructed once at startup and passed to the
/// session subsystem. Never read from ambient global state.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256 signing.
    pub signing_secret: String,
    /// Lifetime of issued tokens.
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(signing_secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            token_ttl,
        }
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject user id.
    pub sub: Uuid,
    pub username: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Token id, for consumer-side dedupe or a future denylist.
    pub jti: Uuid,
}

/// Issue a signed token for a user.
pub fn issue_token(config: &AuthConfig, user: Uuid, username: &str) -> AuthResult<String> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user,
        username: username.to_string(),
        iat: now.timestamp(),
        exp: (now + config.token_ttl).timestamp(),
        jti: Uuid::new_v4(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.signing_secret.as_bytes()),
    )?;
    Ok(token)
}

/// Validate a token and return its claims.
///
/// Fails closed: malformed input, a signature made with a different
/// secret, and an expired token are all rejected. No leeway is granted
/// on expiry.
pub fn verify_token(config: &AuthConfig, token: &str) -> AuthResult<TokenClaims> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.signing_secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
