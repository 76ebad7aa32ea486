//! Event notification seam for the session subsystem.

use crate::RequestMetadata;
use dispatch_database::{Unit, User};
use dispatch_events as events;
use dispatch_outbox::{OutboxNotifier, OutboxResult};
use uuid::Uuid;

/// Audit events the session controller records.
pub trait SessionNotifier: Send + Sync {
    fn notify_user_logged_in(
        &self,
        unit: &Unit,
        user: &User,
        metadata: &RequestMetadata,
    ) -> OutboxResult<()>;

    fn notify_user_logged_out(
        &self,
        unit: &Unit,
        user: Uuid,
        username: &str,
        metadata: &RequestMetadata,
    ) -> OutboxResult<()>;
}

impl SessionNotifier for OutboxNotifier {
    fn notify_user_logged_in(
        &self,
        unit: &Unit,
        user: &User,
        metadata: &RequestMetadata,
    ) -> OutboxResult<()> {
        self.record(
            unit,
            events::TOPIC_AUTH,
            user.id,
            events::TYPE_USER_LOGGED_IN,
            &events::UserLoggedIn {
                user: user.id,
                username: user.username.clone(),
                host: metadata.host.clone(),
                user_agent: metadata.user_agent.clone(),
                remote_addr: metadata.remote_addr.clone(),
            },
        )
    }

    fn notify_user_logged_out(
        &self,
        unit: &Unit,
        user: Uuid,
        username: &str,
        metadata: &RequestMetadata,
    ) -> OutboxResult<()> {
        self.record(
            unit,
            events::TOPIC_AUTH,
            user,
            events::TYPE_USER_LOGGED_OUT,
            &events::UserLoggedOut {
                user,
                username: username.to_string(),
                host: metadata.host.clone(),
                user_agent: metadata.user_agent.clone(),
                remote_addr: metadata.remote_addr.clone(),
            },
        )
    }
}
