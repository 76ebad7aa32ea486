//! Transactional units.
//!
//! A [`Unit`] is one atomic unit of work against the store. Every entity
//! and outbox operation takes a unit parameter; nothing inside a unit is
//! visible to other connections until the unit commits. A unit that is
//! dropped without being committed rolls back, which covers early returns,
//! `?` propagation, cancellation, and panics alike.
//!
//! Units do not nest: a controller operation owns exactly one unit for its
//! whole execution, on its own pooled connection.

use crate::{StoreError, StoreResult};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::warn;

/// An open transaction on a dedicated pooled connection.
pub struct Unit {
    conn: PooledConnection<SqliteConnectionManager>,
    open: bool,
}

impl Unit {
    pub(crate) fn begin(conn: PooledConnection<SqliteConnectionManager>) -> StoreResult<Self> {
        // IMMEDIATE takes the write lock up front; combined with
        // busy_timeout this serializes writers without lock upgrades.
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self { conn, open: true })
    }

    /// Access the unit's connection. Fails if the unit is no longer
    /// active, so a stale handle can never write outside its transaction.
    pub fn conn(&self) -> StoreResult<&Connection> {
        if !self.open {
            return Err(StoreError::UnitClosed);
        }
        Ok(&self.conn)
    }

    /// Whether the unit is still active.
    pub fn is_active(&self) -> bool {
        self.open
    }

    /// Commit the unit, making all writes durable together.
    pub fn commit(mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }

    /// Roll back the unit explicitly.
    pub fn rollback(mut self) -> StoreResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for Unit {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %err, "rollback on drop failed");
            }
        }
    }
}
