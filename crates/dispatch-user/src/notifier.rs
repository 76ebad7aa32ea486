//! Event notification seam for the user aggregate.

use dispatch_database::{Unit, User};
use dispatch_events as events;
use dispatch_outbox::{OutboxNotifier, OutboxResult};
use uuid::Uuid;

/// Events the user controller records. Implementations append to the
/// outbox inside the caller's unit and never talk to the broker.
pub trait UserNotifier: Send + Sync {
    fn notify_user_created(&self, unit: &Unit, user: &User) -> OutboxResult<()>;
    fn notify_user_updated(&self, unit: &Unit, user: &User) -> OutboxResult<()>;
    fn notify_user_pass_updated(&self, unit: &Unit, user: Uuid) -> OutboxResult<()>;
    fn notify_user_deleted(&self, unit: &Unit, user: Uuid) -> OutboxResult<()>;
    fn notify_permissions_updated(
        &self,
        unit: &Unit,
        user: Uuid,
        permissions: &[String],
    ) -> OutboxResult<()>;
}

impl UserNotifier for OutboxNotifier {
    fn notify_user_created(&self, unit: &Unit, user: &User) -> OutboxResult<()> {
        self.record(
            unit,
            events::TOPIC_USERS,
            user.id,
            events::TYPE_USER_CREATED,
            &events::UserCreated {
                user: user.id,
                username: user.username.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                is_admin: user.is_admin,
            },
        )
    }

    fn notify_user_updated(&self, unit: &Unit, user: &User) -> OutboxResult<()> {
        self.record(
            unit,
            events::TOPIC_USERS,
            user.id,
            events::TYPE_USER_UPDATED,
            &events::UserUpdated {
                user: user.id,
                username: user.username.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                is_admin: user.is_admin,
            },
        )
    }

    fn notify_user_pass_updated(&self, unit: &Unit, user: Uuid) -> OutboxResult<()> {
        self.record(
            unit,
            events::TOPIC_USERS,
            user,
            events::TYPE_USER_PASS_UPDATED,
            &events::UserPassUpdated { user },
        )
    }

    fn notify_user_deleted(&self, unit: &Unit, user: Uuid) -> OutboxResult<()> {
        self.record(
            unit,
            events::TOPIC_USERS,
            user,
            events::TYPE_USER_DELETED,
            &events::UserDeleted { user },
        )
    }

    fn notify_permissions_updated(
        &self,
        unit: &Unit,
        user: Uuid,
        permissions: &[String],
    ) -> OutboxResult<()> {
        self.record(
            unit,
            events::TOPIC_PERMISSIONS,
            user,
            events::TYPE_PERMISSIONS_UPDATED,
            &events::PermissionsUpdated {
                user,
                permissions: permissions.to_vec(),
            },
        )
    }
}
