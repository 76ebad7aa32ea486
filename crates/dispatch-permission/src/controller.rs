//! Permission controller.

use crate::{PermissionError, PermissionNotifier, PermissionResult, PermissionStore};
use dispatch_database::Database;
use dispatch_events as events;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Orchestrates permission operations for a user.
pub struct PermissionController {
    db: Arc<Database>,
    store: Arc<dyn PermissionStore>,
    notifier: Arc<dyn PermissionNotifier>,
}

impl PermissionController {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn PermissionStore>,
        notifier: Arc<dyn PermissionNotifier>,
    ) -> Self {
        Self { db, store, notifier }
    }

    /// Replace a user's permission set and record `permissions.updated`.
    /// Returns the normalized set that was stored.
    pub fn update_permissions_by_user(
        &self,
        user_id: Uuid,
        permissions: Vec<String>,
    ) -> PermissionResult<Vec<String>> {
        let mut set = permissions;
        set.sort();
        set.dedup();

        let unit = self
            .db
            .begin()
            .map_err(|e| PermissionError::store("begin unit", e))?;
        let exists = self
            .store
            .user_exists(&unit, user_id)
            .map_err(|e| PermissionError::store("check user", e))?;
        if !exists {
            return Err(PermissionError::UserNotFound(user_id));
        }

        self.store
            .replace_permissions(&unit, user_id, &set)
            .map_err(|e| PermissionError::store("replace permissions", e))?;
        self.notifier
            .notify_permissions_updated(&unit, user_id, &set)
            .map_err(|e| PermissionError::notify(events::TYPE_PERMISSIONS_UPDATED, e))?;
        unit.commit()
            .map_err(|e| PermissionError::store("commit", e))?;

        info!(user = %user_id, count = set.len(), "Permissions updated");
        Ok(set)
    }

    /// Get a user's permission set.
    pub fn permissions_by_user(&self, user_id: Uuid) -> PermissionResult<Vec<String>> {
        let unit = self
            .db
            .begin()
            .map_err(|e| PermissionError::store("begin unit", e))?;
        let exists = self
            .store
            .user_exists(&unit, user_id)
            .map_err(|e| PermissionError::store("check user", e))?;
        if !exists {
            return Err(PermissionError::UserNotFound(user_id));
        }

        let permissions = self
            .store
            .permissions_by_user(&unit, user_id)
            .map_err(|e| PermissionError::store("get permissions", e))?;
        unit.commit()
            .map_err(|e| PermissionError::store("commit", e))?;
        Ok(permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqlitePermissionStore;
    use dispatch_auth::hash_pass;
    use dispatch_database::{outbox, users, Credential, NewUser};
    use dispatch_outbox::OutboxNotifier;

    fn setup() -> (Arc<Database>, PermissionController, Uuid) {
        let db = Arc::new(Database::open_in_memory().unwrap());

        let (salt, hash) = hash_pass("pass");
        let unit = db.begin().unwrap();
        let user = users::create_user(
            &unit,
            &NewUser {
                id: Uuid::new_v4(),
                username: "ada".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                is_admin: false,
                credential: Credential { salt, hash },
            },
        )
        .unwrap();
        unit.commit().unwrap();

        let controller = PermissionController::new(
            db.clone(),
            Arc::new(SqlitePermissionStore),
            Arc::new(OutboxNotifier::new()),
        );
        (db, controller, user.id)
    }

    #[test]
    fn test_update_permissions_stores_set_and_records_event() {
        let (db, controller, user_id) = setup();

        let stored = controller
            .update_permissions_by_user(
                user_id,
                vec!["users.view".to_string(), "users.create".to_string()],
            )
            .unwrap();
        assert_eq!(stored, vec!["users.create", "users.view"]);

        assert_eq!(
            controller.permissions_by_user(user_id).unwrap(),
            vec!["users.create", "users.view"]
        );

        let conn = db.get().unwrap();
        let pending = outbox::pending_messages(&conn, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, events::TYPE_PERMISSIONS_UPDATED);
        assert_eq!(pending[0].topic, events::TOPIC_PERMISSIONS);
        assert_eq!(pending[0].partition_key, user_id.to_string());

        let payload: events::PermissionsUpdated =
            serde_json::from_slice(&pending[0].payload).unwrap();
        assert_eq!(payload.user, user_id);
        assert_eq!(payload.permissions, vec!["users.create", "users.view"]);
    }

    #[test]
    fn test_update_permissions_dedupes_tags() {
        let (_db, controller, user_id) = setup();

        let stored = controller
            .update_permissions_by_user(
                user_id,
                vec!["a".to_string(), "a".to_string(), "b".to_string()],
            )
            .unwrap();
        assert_eq!(stored, vec!["a", "b"]);
    }

    #[test]
    fn test_update_permissions_unknown_user() {
        let (db, controller, _) = setup();

        let ghost = Uuid::new_v4();
        let err = controller
            .update_permissions_by_user(ghost, vec!["a".to_string()])
            .unwrap_err();
        assert!(matches!(err, PermissionError::UserNotFound(id) if id == ghost));

        // Nothing recorded for a rejected update.
        let conn = db.get().unwrap();
        assert_eq!(outbox::pending_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_permissions_for_user_without_grants_is_empty() {
        let (_db, controller, user_id) = setup();
        assert!(controller.permissions_by_user(user_id).unwrap().is_empty());
    }

    #[test]
    fn test_permissions_unknown_user() {
        let (_db, controller, _) = setup();
        let err = controller.permissions_by_user(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, PermissionError::UserNotFound(_)));
    }

    #[test]
    fn test_update_replaces_previous_set_atomically() {
        let (_db, controller, user_id) = setup();

        controller
            .update_permissions_by_user(user_id, vec!["a".to_string(), "b".to_string()])
            .unwrap();
        controller
            .update_permissions_by_user(user_id, vec!["c".to_string()])
            .unwrap();

        // Only the last committed set is visible; never old and new mixed.
        assert_eq!(
            controller.permissions_by_user(user_id).unwrap(),
            vec!["c"]
        );
    }
}
