//! Transactional outbox delivery.
//!
//! This crate provides:
//! - [`OutboxNotifier`]: the façade controllers use to record domain
//!   events inside their transactional unit; it never talks to the broker
//! - [`OutboxRelay`]: the background loop that claims pending rows,
//!   publishes them, and marks them delivered
//! - [`BrokerPublisher`]: the publishing seam, with an HTTP bridge
//!   implementation and an in-memory double for tests
//!
//! Delivery is at-least-once with per-partition-key ordering. A crash
//! between publish and mark-delivered republishes the row after its lease
//! expires; consumers deduplicate.

mod backoff;
mod error;
mod notifier;
mod publisher;
mod relay;

pub use backoff::compute_backoff;
pub use error::{OutboxError, OutboxResult};
pub use notifier::OutboxNotifier;
pub use publisher::{
    BrokerPublisher, HttpPublisher, MemoryBroker, PublishedMessage, PublisherConfig,
};
pub use relay::{OutboxRelay, RelayConfig, RelayCycle};
