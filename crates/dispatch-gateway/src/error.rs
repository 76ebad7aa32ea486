//! Gateway errors.

use dispatch_auth::AuthError;
use dispatch_database::StoreError;
use dispatch_outbox::OutboxError;
use thiserror::Error;

/// Gateway error type. `Unauthorized` is the only variant callers map to
/// an unauthorized outward response; everything else is a system failure.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Token missing, malformed, expired, or signed with another secret
    #[error("Unauthorized")]
    Unauthorized,

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

    /// Issuing a token failed
    #[error("Token error: {0}")]
    Token(#[from] AuthError),
}

impl GatewayError {
    pub(crate) fn store(step: &'static str, source: StoreError) -> Self {
        Self::Store { step, source }
    }

    pub(crate) fn notify(event: &'static str, source: OutboxError) -> Self {
        Self::Notify { event, source }
    }
}

/// Result type alias using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;
