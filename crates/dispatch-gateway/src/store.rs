//! Entity store seam for the session subsystem.

use dispatch_database::{users, Credential, StoreResult, Unit, User};

/// Store operations the session controller needs.
pub trait SessionStore: Send + Sync {
    /// Look up a user and its credential material by username.
    fn credential_by_username(
        &self,
        unit: &Unit,
        username: &str,
    ) -> StoreResult<Option<(User, Credential)>>;
}

/// SQLite-backed store.
#[derive(Debug, Clone, Default)]
pub struct SqliteSessionStore;

impl SessionStore for SqliteSessionStore {
    fn credential_by_username(
        &self,
        unit: &Unit,
        username: &str,
    ) -> StoreResult<Option<(User, Credential)>> {
        users::credential_by_username(unit, username)
    }
}
