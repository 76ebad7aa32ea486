//! Event outbox queries.
//!
//! Appends happen inside the transactional unit of the business mutation
//! they describe, through [`add_outbox_messages`]. Everything else here is
//! the relay's side of the table: claiming due rows under a lease,
//! marking them delivered, and recording failures for backoff.
//!
//! SQLite has no `SELECT ... FOR UPDATE SKIP LOCKED`, so claiming uses a
//! lease pair (`claimed_by`, `claim_expires_at`): a single UPDATE takes
//! the oldest due rows that are unclaimed or whose lease expired, and a
//! relay that dies simply lets its leases lapse.

use crate::{parse_ts, to_ts, NewOutboxMessage, OutboxMessage, StoreResult, Unit};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

fn map_message(row: &Row<'_>) -> rusqlite::Result<OutboxMessage> {
    Ok(OutboxMessage {
        id: row.get(0)?,
        topic: row.get(1)?,
        partition_key: row.get(2)?,
        event_type: row.get(3)?,
        payload: row.get(4)?,
        created_at: parse_ts(row.get::<_, String>(5)?),
        delivered_at: row.get::<_, Option<String>>(6)?.map(parse_ts),
        claimed_by: row.get(7)?,
        claim_expires_at: row.get::<_, Option<String>>(8)?.map(parse_ts),
        retry_count: row.get(9)?,
        next_attempt_at: parse_ts(row.get::<_, String>(10)?),
        last_error: row.get(11)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, topic, partition_key, event_type, payload, created_at, \
     delivered_at, claimed_by, claim_expires_at, retry_count, next_attempt_at, last_error";

/// Append outbox rows inside the caller's unit.
///
/// A failure here aborts the whole unit, so a business mutation can never
/// commit without its events and the events can never commit without the
/// mutation.
pub fn add_outbox_messages(unit: &Unit, messages: &[NewOutboxMessage]) -> StoreResult<()> {
    if messages.is_empty() {
        return Ok(());
    }

    let conn = unit.conn()?;
    let now = to_ts(Utc::now());
    let mut stmt = conn.prepare(
        "INSERT INTO outbox_messages (topic, partition_key, event_type, payload, created_at, next_attempt_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )?;

    for message in messages {
        stmt.execute(params![
            message.topic,
            message.partition_key,
            message.event_type,
            message.payload,
            now,
        ])?;
    }

    Ok(())
}

/// Claim a batch of due rows for one relay instance.
///
/// Takes the oldest undelivered rows, in generation order, that are due
/// (`next_attempt_at` reached) and unclaimed or lease-expired. A row is
/// skipped while any earlier undelivered row with the same partition key
/// is held by another instance or still backing off; this head-of-line
/// blocking is what preserves per-key delivery order across concurrent
/// relays.
pub fn claim_due(
    conn: &Connection,
    claim_token: &str,
    now: DateTime<Utc>,
    lease_until: DateTime<Utc>,
    limit: usize,
) -> StoreResult<Vec<OutboxMessage>> {
    let now = to_ts(now);
    conn.execute(
        "UPDATE outbox_messages
         SET claimed_by = ?1, claim_expires_at = ?2
         WHERE id IN (
             SELECT o.id FROM outbox_messages o
             WHERE o.delivered_at IS NULL
               AND (o.claimed_by IS NULL OR o.claim_expires_at <= ?3)
               AND o.next_attempt_at <= ?3
               AND NOT EXISTS (
                   SELECT 1 FROM outbox_messages p
                   WHERE p.partition_key = o.partition_key
                     AND p.id < o.id
                     AND p.delivered_at IS NULL
                     AND ((p.claimed_by IS NOT NULL AND p.claim_expires_at > ?3)
                          OR p.next_attempt_at > ?3)
               )
             ORDER BY o.id ASC
             LIMIT ?4
         )",
        params![claim_token, to_ts(lease_until), now, limit as i64],
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM outbox_messages
         WHERE claimed_by = ?1 AND delivered_at IS NULL
         ORDER BY id ASC"
    ))?;

    let messages = stmt
        .query_map(params![claim_token], map_message)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(messages)
}

/// Mark a row as delivered and release its claim.
pub fn mark_delivered(conn: &Connection, id: i64, now: DateTime<Utc>) -> StoreResult<()> {
    conn.execute(
        "UPDATE outbox_messages
         SET delivered_at = ?2, claimed_by = NULL, claim_expires_at = NULL, last_error = NULL
         WHERE id = ?1",
        params![id, to_ts(now)],
    )?;
    Ok(())
}

/// Record a publish failure: bump the retry count, store the error, push
/// the next attempt out, and release the claim.
pub fn mark_failed(
    conn: &Connection,
    id: i64,
    error: &str,
    next_attempt_at: DateTime<Utc>,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE outbox_messages
         SET retry_count = retry_count + 1, last_error = ?2, next_attempt_at = ?3,
             claimed_by = NULL, claim_expires_at = NULL
         WHERE id = ?1",
        params![id, error, to_ts(next_attempt_at)],
    )?;
    Ok(())
}

/// Release all claims held by one relay instance. Returns the number of
/// rows released.
pub fn release_claims(conn: &Connection, claim_token: &str) -> StoreResult<usize> {
    let count = conn.execute(
        "UPDATE outbox_messages
         SET claimed_by = NULL, claim_expires_at = NULL
         WHERE claimed_by = ?1 AND delivered_at IS NULL",
        params![claim_token],
    )?;
    Ok(count)
}

/// Release an instance's remaining claims on one partition key, used when
/// an earlier row of the key failed and the rest must wait their turn.
pub fn release_claims_for_key(
    conn: &Connection,
    claim_token: &str,
    partition_key: &str,
) -> StoreResult<usize> {
    let count = conn.execute(
        "UPDATE outbox_messages
         SET claimed_by = NULL, claim_expires_at = NULL
         WHERE claimed_by = ?1 AND partition_key = ?2 AND delivered_at IS NULL",
        params![claim_token, partition_key],
    )?;
    Ok(count)
}

/// Count undelivered rows.
pub fn pending_count(conn: &Connection) -> StoreResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM outbox_messages WHERE delivered_at IS NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// List undelivered rows in generation order.
pub fn pending_messages(conn: &Connection, limit: usize) -> StoreResult<Vec<OutboxMessage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM outbox_messages
         WHERE delivered_at IS NULL
         ORDER BY id ASC
         LIMIT ?1"
    ))?;

    let messages = stmt
        .query_map(params![limit as i64], map_message)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(messages)
}

/// Get a single row by id.
pub fn message_by_id(conn: &Connection, id: i64) -> StoreResult<Option<OutboxMessage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM outbox_messages WHERE id = ?1"
    ))?;

    match stmt.query_row(params![id], map_message) {
        Ok(message) => Ok(Some(message)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
