//! Notifier façade over the outbox store.
//!
//! Controllers record domain events through this type inside their own
//! transactional unit. The notifier serializes the payload and appends an
//! outbox row; it performs no broker I/O, so a notifier failure aborts
//! the unit and the broker never sees an event for an uncommitted change.

use crate::OutboxResult;
use dispatch_database::{outbox, NewOutboxMessage, Unit};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Builds outbox rows from domain event payloads.
#[derive(Debug, Clone, Default)]
pub struct OutboxNotifier;

impl OutboxNotifier {
    pub fn new() -> Self {
        Self
    }

    /// Record one event in the caller's unit, keyed by the subject user.
    pub fn record<T: Serialize>(
        &self,
        unit: &Unit,
        topic: &str,
        subject: Uuid,
        event_type: &str,
        payload: &T,
    ) -> OutboxResult<()> {
        let payload = serde_json::to_vec(payload)?;
        outbox::add_outbox_messages(
            unit,
            &[NewOutboxMessage {
                topic: topic.to_string(),
                partition_key: subject.to_string(),
                event_type: event_type.to_string(),
                payload,
            }],
        )?;
        debug!(topic, event_type, subject = %subject, "Recorded outbox event");
        Ok(())
    }
}
