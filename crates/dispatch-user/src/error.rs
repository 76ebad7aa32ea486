//! User aggregate errors.

use dispatch_database::StoreError;
use dispatch_outbox::OutboxError;
use thiserror::Error;

/// User aggregate error type. `NotFound` and `UsernameTaken` are domain
/// outcomes the caller can map outward; the other variants are system
/// failures carrying the failing step.
#[derive(Error, Debug)]
pub enum UserError {
    /// No user matched the given id or username
    #[error("User not found: {0}")]
    NotFound(String),

    /// The username is already in use
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// A store operation failed
    #[error("Store failed at {step}")]
    Store {
        step: &'static str,
        #[source]
        source: StoreError,
    },

    /// Recording a domain event failed
    #[error("Recording {event} event failed")]
    Notify {
        event: &'static str,
        #[source]
        source: OutboxError,
    },
}

impl UserError {
    pub(crate) fn store(step: &'static str, source: StoreError) -> Self {
        Self::Store { step, source }
    }

    pub(crate) fn notify(event: &'static str, source: OutboxError) -> Self {
        Self::Notify { event, source }
    }
}

/// Result type alias using UserError.
pub type UserResult<T> = Result<T, UserError>;
