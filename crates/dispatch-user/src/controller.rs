//! User controller.

use crate::{UserError, UserNotifier, UserResult, UserStore};
use dispatch_auth::hash_pass;
use dispatch_database::{Credential, Database, NewUser, User};
use dispatch_events as events;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Input for creating a user. The plaintext pass is hashed before it
/// reaches the store.
#[derive(Debug, Clone)]
pub struct NewUserRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub pass: String,
}

/// Orchestrates user operations: one transactional unit per operation,
/// entity writes and event records inside it, commit last.
pub struct UserController {
    db: Arc<Database>,
    store: Arc<dyn UserStore>,
    notifier: Arc<dyn UserNotifier>,
}

impl UserController {
    pub fn new(db: Arc<Database>, store: Arc<dyn UserStore>, notifier: Arc<dyn UserNotifier>) -> Self {
        Self { db, store, notifier }
    }

    /// Create a user and record `user.created`.
    pub fn create_user(&self, request: NewUserRequest) -> UserResult<User> {
        let (salt, hash) = hash_pass(&request.pass);
        let new_user = NewUser {
            id: Uuid::new_v4(),
            username: request.username.clone(),
            first_name: request.first_name,
            last_name: request.last_name,
            is_admin: request.is_admin,
            credential: Credential { salt, hash },
        };

        let unit = self.db.begin().map_err(|e| UserError::store("begin unit", e))?;
        let user = match self.store.create_user(&unit, &new_user) {
            Ok(user) => user,
            Err(e) if e.is_constraint_violation() => {
                return Err(UserError::UsernameTaken(request.username));
            }
            Err(e) => return Err(UserError::store("create user", e)),
        };
        self.notifier
            .notify_user_created(&unit, &user)
            .map_err(|e| UserError::notify(events::TYPE_USER_CREATED, e))?;
        unit.commit().map_err(|e| UserError::store("commit", e))?;

        info!(user = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Get a user by id.
    pub fn user_by_id(&self, id: Uuid) -> UserResult<User> {
        let unit = self.db.begin().map_err(|e| UserError::store("begin unit", e))?;
        let user = self
            .store
            .user_by_id(&unit, id)
            .map_err(|e| UserError::store("get user", e))?
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;
        unit.commit().map_err(|e| UserError::store("commit", e))?;
        Ok(user)
    }

    /// Get a user by username.
    pub fn user_by_username(&self, username: &str) -> UserResult<User> {
        let unit = self.db.begin().map_err(|e| UserError::store("begin unit", e))?;
        let user = self
            .store
            .user_by_username(&unit, username)
            .map_err(|e| UserError::store("get user by username", e))?
            .ok_or_else(|| UserError::NotFound(username.to_string()))?;
        unit.commit().map_err(|e| UserError::store("commit", e))?;
        Ok(user)
    }

    /// List all users.
    pub fn users(&self) -> UserResult<Vec<User>> {
        let unit = self.db.begin().map_err(|e| UserError::store("begin unit", e))?;
        let users = self
            .store
            .list_users(&unit)
            .map_err(|e| UserError::store("list users", e))?;
        unit.commit().map_err(|e| UserError::store("commit", e))?;
        Ok(users)
    }

    /// Update a user's profile fields and record `user.updated`.
    pub fn update_user(&self, user: User) -> UserResult<User> {
        let unit = self.db.begin().map_err(|e| UserError::store("begin unit", e))?;
        let updated = match self.store.update_user(&unit, &user) {
            Ok(updated) => updated,
            Err(e) if e.is_constraint_violation() => {
                return Err(UserError::UsernameTaken(user.username));
            }
            Err(e) => return Err(UserError::store("update user", e)),
        };
        if !updated {
            return Err(UserError::NotFound(user.id.to_string()));
        }
        self.notifier
            .notify_user_updated(&unit, &user)
            .map_err(|e| UserError::notify(events::TYPE_USER_UPDATED, e))?;
        unit.commit().map_err(|e| UserError::store("commit", e))?;

        info!(user = %user.id, "User updated");
        Ok(user)
    }

    /// Rotate a user's credential and record `user.pass_updated`.
    pub fn update_user_pass_by_user_id(&self, id: Uuid, new_pass: &str) -> UserResult<()> {
        let (salt, hash) = hash_pass(new_pass);
        let credential = Credential { salt, hash };

        let unit = self.db.begin().map_err(|e| UserError::store("begin unit", e))?;
        let updated = self
            .store
            .update_user_pass(&unit, id, &credential)
            .map_err(|e| UserError::store("update user pass", e))?;
        if !updated {
            return Err(UserError::NotFound(id.to_string()));
        }
        self.notifier
            .notify_user_pass_updated(&unit, id)
            .map_err(|e| UserError::notify(events::TYPE_USER_PASS_UPDATED, e))?;
        unit.commit().map_err(|e| UserError::store("commit", e))?;

        info!(user = %id, "User pass updated");
        Ok(())
    }

    /// Delete a user and record the full cascade.
    ///
    /// The permission set is cleared and `permissions.updated` recorded
    /// before the user row is deleted and `user.deleted` recorded. If any
    /// step fails the whole unit rolls back, so a `user.deleted` event
    /// can never exist for a deletion that did not commit.
    pub fn delete_user_by_id(&self, id: Uuid) -> UserResult<()> {
        let unit = self.db.begin().map_err(|e| UserError::store("begin unit", e))?;

        self.store
            .replace_permissions(&unit, id, &[])
            .map_err(|e| UserError::store("clear permissions", e))?;
        self.notifier
            .notify_permissions_updated(&unit, id, &[])
            .map_err(|e| UserError::notify(events::TYPE_PERMISSIONS_UPDATED, e))?;

        let deleted = self
            .store
            .delete_user(&unit, id)
            .map_err(|e| UserError::store("delete user", e))?;
        if !deleted {
            return Err(UserError::NotFound(id.to_string()));
        }
        self.notifier
            .notify_user_deleted(&unit, id)
            .map_err(|e| UserError::notify(events::TYPE_USER_DELETED, e))?;

        unit.commit().map_err(|e| UserError::store("commit", e))?;

        info!(user = %id, "User deleted");
        Ok(())
    }
}
