//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::StoreResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_users_and_permissions(conn)?;
    }
    if current_version < 2 {
        migrate_v2_outbox_messages(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: users and per-user permission sets.
fn migrate_v1_users_and_permissions(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v1: users and permissions");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            is_admin INTEGER NOT NULL DEFAULT 0,
            pass_salt BLOB NOT NULL,
            pass_hash BLOB NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_users_username
            ON users(username);

        CREATE TABLE IF NOT EXISTS user_permissions (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            PRIMARY KEY (user_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_user_permissions_user_id
            ON user_permissions(user_id);
        ",
    )?;

    record_migration(conn, 1, "users_and_permissions")?;
    Ok(())
}

/// V2: event outbox for relay delivery.
///
/// `id` is the generation order. `claimed_by`/`claim_expires_at` form a
/// lease so concurrent relay instances divide pending rows without
/// publishing the same row twice; an expired lease is reclaimable, which
/// bounds lock leakage when a relay dies mid-batch.
fn migrate_v2_outbox_messages(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v2: outbox messages");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS outbox_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic TEXT NOT NULL,
            partition_key TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload BLOB NOT NULL,
            created_at TEXT NOT NULL,
            delivered_at TEXT,
            claimed_by TEXT,
            claim_expires_at TEXT,
            retry_count INTEGER NOT NULL DEFAULT 0,
            next_attempt_at TEXT NOT NULL,
            last_error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_outbox_pending
            ON outbox_messages(delivered_at, next_attempt_at);
        CREATE INDEX IF NOT EXISTS idx_outbox_partition_key
            ON outbox_messages(partition_key);
        CREATE INDEX IF NOT EXISTS idx_outbox_claimed_by
            ON outbox_messages(claimed_by);
        ",
    )?;

    record_migration(conn, 2, "outbox_messages")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"user_permissions".to_string()));
        assert!(tables.contains(&"outbox_messages".to_string()));
        assert!(tables.contains(&"migrations".to_string()));
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_username_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (id, username, pass_salt, pass_hash, created_at, updated_at)
             VALUES ('u1', 'alice', x'00', x'00', 't', 't')",
            [],
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO users (id, username, pass_salt, pass_hash, created_at, updated_at)
             VALUES ('u2', 'alice', x'00', x'00', 't', 't')",
            [],
        );
        assert!(dup.is_err());
    }
}
