//! Entity store seam for the user aggregate.

use dispatch_database::{permissions, users, Credential, NewUser, StoreResult, Unit, User};
use uuid::Uuid;

/// Store operations the user controller orchestrates. All take the
/// controller's transactional unit.
pub trait UserStore: Send + Sync {
    fn create_user(&self, unit: &Unit, user: &NewUser) -> StoreResult<User>;
    fn user_by_id(&self, unit: &Unit, id: Uuid) -> StoreResult<Option<User>>;
    fn user_by_username(&self, unit: &Unit, username: &str) -> StoreResult<Option<User>>;
    fn list_users(&self, unit: &Unit) -> StoreResult<Vec<User>>;
    fn update_user(&self, unit: &Unit, user: &User) -> StoreResult<bool>;
    fn update_user_pass(&self, unit: &Unit, id: Uuid, credential: &Credential)
        -> StoreResult<bool>;
    fn delete_user(&self, unit: &Unit, id: Uuid) -> StoreResult<bool>;
    /// Replace the user's permission set; the delete cascade clears it
    /// before the user row goes away.
    fn replace_permissions(
        &self,
        unit: &Unit,
        user_id: Uuid,
        permissions: &[String],
    ) -> StoreResult<()>;
}

/// SQLite-backed store.
#[derive(Debug, Clone, Default)]
pub struct SqliteUserStore;

impl UserStore for SqliteUserStore {
    fn create_user(&self, unit: &Unit, user: &NewUser) -> StoreResult<User> {
        users::create_user(unit, user)
    }

    fn user_by_id(&self, unit: &Unit, id: Uuid) -> StoreResult<Option<User>> {
        users::user_by_id(unit, id)
    }

    fn user_by_username(&self, unit: &Unit, username: &str) -> StoreResult<Option<User>> {
        users::user_by_username(unit, username)
    }

    fn list_users(&self, unit: &Unit) -> StoreResult<Vec<User>> {
        users::list_users(unit)
    }

    fn update_user(&self, unit: &Unit, user: &User) -> StoreResult<bool> {
        users::update_user(unit, user)
    }

    fn update_user_pass(
        &self,
        unit: &Unit,
        id: Uuid,
        credential: &Credential,
    ) -> StoreResult<bool> {
        users::update_user_pass(unit, id, credential)
    }

    fn delete_user(&self, unit: &Unit, id: Uuid) -> StoreResult<bool> {
        users::delete_user(unit, id)
    }

    fn replace_permissions(
        &self,
        unit: &Unit,
        user_id: Uuid,
        permissions: &[String],
    ) -> StoreResult<()> {
        permissions::replace_permissions(unit, user_id, permissions)
    }
}
