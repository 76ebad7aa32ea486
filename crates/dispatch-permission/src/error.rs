//! Permission aggregate errors.

use dispatch_database::StoreError;
use dispatch_outbox::OutboxError;
use thiserror::Error;
use uuid::Uuid;

/// Permission aggregate error type.
#[derive(Error, Debug)]
pub enum PermissionError {
    /// The subject user does not exist
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

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

impl PermissionError {
    pub(crate) fn store(step: &'static str, source: StoreError) -> Self {
        Self::Store { step, source }
    }

    pub(crate) fn notify(event: &'static str, source: OutboxError) -> Self {
        Self::Notify { event, source }
    }
}

/// Result type alias using PermissionError.
pub type PermissionResult<T> = Result<T, PermissionError>;
