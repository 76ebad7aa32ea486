//! Event notification seam for the permission aggregate.

use dispatch_database::Unit;
use dispatch_events as events;
use dispatch_outbox::{OutboxNotifier, OutboxResult};
use uuid::Uuid;

/// Events the permission controller records.
pub trait PermissionNotifier: Send + Sync {
    fn notify_permissions_updated(
        &self,
        unit: &Unit,
        user: Uuid,
        permissions: &[String],
    ) -> OutboxResult<()>;
}

impl PermissionNotifier for OutboxNotifier {
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
