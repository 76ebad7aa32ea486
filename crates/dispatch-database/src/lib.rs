//! SQLite storage layer for the dispatch services.
//!
//! This crate provides:
//! - Connection pool with WAL mode (`Database`)
//! - Transactional units with rollback-on-drop (`Unit`)
//! - Database migrations
//! - Model types for all tables
//! - Query helpers for users, permissions, and the event outbox
//!
//! Every business operation runs against exactly one [`Unit`]; entity and
//! outbox writes inside the same unit become durable together or not at
//! all. The outbox table is additionally read and updated outside of
//! units by the relay, through short autocommit statements.

mod error;
mod migrations;
mod models;
mod pool;
mod unit;

pub mod outbox;
pub mod permissions;
pub mod users;

pub use error::{StoreError, StoreResult};
pub use migrations::run_migrations;
pub use models::*;
pub use pool::{Database, PoolConfig, PoolState};
pub use unit::Unit;

use chrono::{DateTime, Utc};

/// Serialize a timestamp for storage. All comparable columns use this
/// single format so string comparison in SQL matches time order.
pub(crate) fn to_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse an RFC3339 timestamp from storage, falling back to the current
/// time on malformed input.
pub(crate) fn parse_ts(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
