//! Auth/session subsystem.
//!
//! Issues and validates session tokens and drives the login/logout
//! controllers. Login verifies credentials, issues a signed token, and
//! records a `auth.user_logged_in` audit event in one transactional unit.
//! Logout is audit-only: no server-side token state exists, so tokens
//! remain cryptographically valid until natural expiry.
//!
//! The surrounding transport layer maps [`LoginOutcome::Denied`] and
//! [`GatewayError::Unauthorized`] to an unauthorized response and other
//! errors to a generic failure, without internal detail.

mod controller;
mod error;
mod notifier;
mod store;

pub use controller::{IssuedToken, LoginOutcome, RequestMetadata, SessionController};
pub use error::{GatewayError, GatewayResult};
pub use notifier::SessionNotifier;
pub use store::{SessionStore, SqliteSessionStore};
