//! Connection pool for concurrent database access.
//!
//! This module provides a thread-safe connection pool using r2d2 and SQLite
//! WAL mode. WAL mode allows concurrent readers while writes are serialized.
//! Each request-handling worker and each relay instance draws its own
//! connection from the pool.

use crate::{migrations, unit::Unit, StoreError, StoreResult};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the database pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum connections in the pool.
    pub max_size: u32,
    /// Minimum idle connections to maintain.
    pub min_idle: Option<u32>,
    /// Connection acquisition timeout.
    pub connection_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone)]
pub struct PoolState {
    /// Total connections (active + idle).
    pub connections: u32,
    /// Currently idle connections.
    pub idle_connections: u32,
}

/// Thread-safe database handle backed by a connection pool.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    path: String,
}

impl Database {
    /// Open a database at the given path, running migrations if needed.
    ///
    /// This will:
    /// - Create the database file if it doesn't exist
    /// - Enable WAL mode and performance pragmas on every connection
    /// - Run any pending migrations
    /// - Initialize the connection pool
    pub fn open(path: &Path, config: PoolConfig) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA cache_size = -64000;
                PRAGMA temp_store = MEMORY;
                PRAGMA busy_timeout = 5000;
            ",
            )?;
            Ok(())
        });

        let db = Self::from_manager(manager, config, path_str.clone())?;
        info!(path = %path_str, "Database opened");
        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// Uses a uniquely named shared-cache memory database so every pooled
    /// connection sees the same store. WAL mode does not apply in memory.
    pub fn open_in_memory() -> StoreResult<Self> {
        let name = format!(
            "file:dispatch-mem-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4()
        );
        let manager = SqliteConnectionManager::file(&name).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA foreign_keys = ON;
                PRAGMA cache_size = -64000;
                PRAGMA temp_store = MEMORY;
                PRAGMA busy_timeout = 5000;
            ",
            )?;
            Ok(())
        });

        Self::from_manager(manager, PoolConfig::default(), name)
    }

    fn from_manager(
        manager: SqliteConnectionManager,
        config: PoolConfig,
        path: String,
    ) -> StoreResult<Self> {
        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // Run migrations on a dedicated connection
        {
            let conn = pool
                .get()
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            migrations::run_migrations(&conn)?;
        }

        Ok(Self { pool, path })
    }

    /// Get a connection from the pool.
    ///
    /// Connections are automatically returned to the pool when dropped.
    pub fn get(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    /// Begin a transactional unit on its own pooled connection.
    ///
    /// The unit takes the write lock immediately, so two units never
    /// deadlock upgrading read locks. The unit rolls back on drop unless
    /// committed.
    pub fn begin(&self) -> StoreResult<Unit> {
        Unit::begin(self.get()?)
    }

    /// Get pool statistics for monitoring.
    pub fn state(&self) -> PoolState {
        let state = self.pool.state();
        PoolState {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check health by acquiring a connection and running a trivial query.
    pub fn health_check(&self) -> StoreResult<()> {
        let conn = self.get()?;
        conn.execute_batch("SELECT 1")?;
        debug!("Database health check passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.max_size, 10);
        assert_eq!(config.min_idle, Some(2));
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_open_on_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path, PoolConfig::default()).unwrap();
        assert!(db.health_check().is_ok());

        let state = db.state();
        assert!(state.connections >= 1);
    }

    #[test]
    fn test_open_in_memory_shares_state_across_connections() {
        let db = Database::open_in_memory().unwrap();

        {
            let conn = db.get().unwrap();
            conn.execute_batch(
                "CREATE TABLE scratch (id INTEGER PRIMARY KEY, val TEXT);
                 INSERT INTO scratch (val) VALUES ('one');",
            )
            .unwrap();
        }

        // A different pooled connection must observe the same data.
        let conn = db.get().unwrap();
        let val: String = conn
            .query_row("SELECT val FROM scratch WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(val, "one");
    }

    #[test]
    fn test_concurrent_access() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test_concurrent.db");

        let db = Arc::new(Database::open(&db_path, PoolConfig::default()).unwrap());

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    let conn = db.get().unwrap();
                    let result: i32 = conn
                        .query_row("SELECT ?1", [i], |row| row.get(0))
                        .unwrap();
                    assert_eq!(result, i);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
