//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User record without credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user. The credential is already hashed by the
/// caller; plaintext passwords never reach the storage layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub credential: Credential,
}

/// Stored credential material: a random salt and the derived hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

/// A row in the event outbox.
///
/// Rows are appended inside the transactional unit of the business
/// mutation they describe and are mutated afterwards only by the relay.
/// A row with non-null `delivered_at` is never republished under normal
/// operation; rows are never deleted by the relay.
#[derive(Debug, Clone)]
pub struct OutboxMessage {
    /// Generation order across all topics.
    pub id: i64,
    pub topic: String,
    /// Subject entity id; delivery order is preserved per key.
    pub partition_key: String,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub claimed_by: Option<String>,
    pub claim_expires_at: Option<DateTime<Utc>>,
    pub retry_count: i64,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// Input for appending an outbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxMessage {
    pub topic: String,
    pub partition_key: String,
    pub event_type: String,
    pub payload: Vec<u8>,
}
