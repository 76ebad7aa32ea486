//! Entity store seam for the permission aggregate.

use dispatch_database::{permissions, users, StoreResult, Unit};
use uuid::Uuid;

/// Store operations the permission controller orchestrates.
pub trait PermissionStore: Send + Sync {
    fn user_exists(&self, unit: &Unit, user_id: Uuid) -> StoreResult<bool>;
    fn permissions_by_user(&self, unit: &Unit, user_id: Uuid) -> StoreResult<Vec<String>>;
    fn replace_permissions(
        &self,
        unit: &Unit,
        user_id: Uuid,
        permissions: &[String],
    ) -> StoreResult<()>;
}

/// SQLite-backed store.
#[derive(Debug, Clone, Default)]
pub struct SqlitePermissionStore;

impl PermissionStore for SqlitePermissionStore {
    fn user_exists(&self, unit: &Unit, user_id: Uuid) -> StoreResult<bool> {
        Ok(users::user_by_id(unit, user_id)?.is_some())
    }

    fn permissions_by_user(&self, unit: &Unit, user_id: Uuid) -> StoreResult<Vec<String>> {
        permissions::permissions_by_user(unit, user_id)
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
