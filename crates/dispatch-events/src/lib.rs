//! Domain event catalogue.
//!
//! These payload shapes are the contract consumed by downstream services;
//! changing a field is a breaking change. Every event is partitioned by
//! the subject user's id, so consumers see changes to one user in order.
//! Delivery is at-least-once: consumers deduplicate by (event type, key)
//! or their own idempotency key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic for user lifecycle events.
pub const TOPIC_USERS: &str = "dispatch.users";
/// Topic for permission set changes.
pub const TOPIC_PERMISSIONS: &str = "dispatch.permissions";
/// Topic for authentication audit events.
pub const TOPIC_AUTH: &str = "dispatch.auth";

pub const TYPE_USER_CREATED: &str = "user.created";
pub const TYPE_USER_UPDATED: &str = "user.updated";
pub const TYPE_USER_PASS_UPDATED: &str = "user.pass_updated";
pub const TYPE_USER_DELETED: &str = "user.deleted";
pub const TYPE_PERMISSIONS_UPDATED: &str = "permissions.updated";
pub const TYPE_USER_LOGGED_IN: &str = "auth.user_logged_in";
pub const TYPE_USER_LOGGED_OUT: &str = "auth.user_logged_out";

/// A user was created. Credential material is never part of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

/// A user's profile fields changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUpdated {
    pub user: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

/// A user's credential was rotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPassUpdated {
    pub user: Uuid,
}

/// A user was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDeleted {
    pub user: Uuid,
}

/// A user's permission set was replaced. Carries the full new set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionsUpdated {
    pub user: Uuid,
    pub permissions: Vec<String>,
}

/// A user logged in. Request metadata is carried for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLoggedIn {
    pub user: Uuid,
    pub username: String,
    pub host: String,
    pub user_agent: String,
    pub remote_addr: String,
}

/// A user logged out. Audit only: the token itself stays valid until its
/// natural expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLoggedOut {
    pub user: Uuid,
    pub username: String,
    pub host: String,
    pub user_agent: String,
    pub remote_addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payloads_roundtrip_as_json() {
        let event = UserLoggedIn {
            user: Uuid::new_v4(),
            username: "ada".to_string(),
            host: "api.example.com".to_string(),
            user_agent: "curl/8".to_string(),
            remote_addr: "10.0.0.1:4242".to_string(),
        };

        let bytes = serde_json::to_vec(&event).unwrap();
        let back: UserLoggedIn = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_permission_payload_field_names() {
        let event = PermissionsUpdated {
            user: Uuid::nil(),
            permissions: vec!["users.view".to_string()],
        };

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("user").is_some());
        assert_eq!(json["permissions"][0], "users.view");
    }
}
