//! Session controller: login and logout.

use crate::{GatewayError, GatewayResult, SessionNotifier, SessionStore};
use dispatch_auth::{issue_token, verify_pass, verify_token, AuthConfig, TokenClaims};
use dispatch_database::Database;
use dispatch_events as events;
use std::sync::Arc;
use tracing::info;

/// Request context carried on auth audit events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMetadata {
    pub host: String,
    pub user_agent: String,
    pub remote_addr: String,
}

/// A freshly issued session token.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
}

impl IssuedToken {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// Outcome of a login attempt. `Denied` is a first-class outcome, not an
/// error: wrong credentials and unknown usernames both land here so the
/// login path does not enumerate users.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Granted(IssuedToken),
    Denied,
}

/// Drives login and logout.
pub struct SessionController {
    db: Arc<Database>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn SessionNotifier>,
    auth: AuthConfig,
}

impl SessionController {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn SessionNotifier>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            db,
            store,
            notifier,
            auth,
        }
    }

    /// Verify credentials and, on success, issue a token and record a
    /// `auth.user_logged_in` event in one unit. A credential mismatch is
    /// `Ok(Denied)`; only system failures are errors.
    pub fn login(
        &self,
        username: &str,
        pass: &str,
        metadata: &RequestMetadata,
    ) -> GatewayResult<LoginOutcome> {
        let unit = self
            .db
            .begin()
            .map_err(|e| GatewayError::store("begin unit", e))?;

        let Some((user, credential)) = self
            .store
            .credential_by_username(&unit, username)
            .map_err(|e| GatewayError::store("get credential", e))?
        else {
            return Ok(LoginOutcome::Denied);
        };

        if !verify_pass(pass, &credential.salt, &credential.hash) {
            return Ok(LoginOutcome::Denied);
        }

        let token = issue_token(&self.auth, user.id, &user.username)?;
        self.notifier
            .notify_user_logged_in(&unit, &user, metadata)
            .map_err(|e| GatewayError::notify(events::TYPE_USER_LOGGED_IN, e))?;
        unit.commit().map_err(|e| GatewayError::store("commit", e))?;

        info!(user = %user.id, username = %user.username, "User logged in");
        Ok(LoginOutcome::Granted(IssuedToken::bearer(token)))
    }

    /// Verify the token and record a `auth.user_logged_out` audit event.
    ///
    /// This does not invalidate the token: there is no server-side session
    /// state, so the token stays valid until expiry. Known limitation.
    pub fn logout(&self, token: &str, metadata: &RequestMetadata) -> GatewayResult<()> {
        let claims = verify_token(&self.auth, token).map_err(|_| GatewayError::Unauthorized)?;

        let unit = self
            .db
            .begin()
            .map_err(|e| GatewayError::store("begin unit", e))?;
        self.notifier
            .notify_user_logged_out(&unit, claims.sub, &claims.username, metadata)
            .map_err(|e| GatewayError::notify(events::TYPE_USER_LOGGED_OUT, e))?;
        unit.commit().map_err(|e| GatewayError::store("commit", e))?;

        info!(user = %claims.sub, username = %claims.username, "User logged out");
        Ok(())
    }

    /// Validate a token and return its claims. Stateless and side-effect
    /// free; rejects anything malformed, unsigned, or expired.
    pub fn validate_token(&self, token: &str) -> GatewayResult<TokenClaims> {
        verify_token(&self.auth, token).map_err(|_| GatewayError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteSessionStore;
    use chrono::Duration;
    use dispatch_auth::hash_pass;
    use dispatch_database::{outbox, users, Credential, NewUser, StoreError, StoreResult, Unit, User};
    use dispatch_outbox::OutboxNotifier;
    use uuid::Uuid;

    fn metadata() -> RequestMetadata {
        RequestMetadata {
            host: "api.example.com".to_string(),
            user_agent: "curl/8".to_string(),
            remote_addr: "10.0.0.1:4242".to_string(),
        }
    }

    fn auth_config() -> AuthConfig {
        AuthConfig::new("test-secret", Duration::hours(8))
    }

    fn seed_user(db: &Database, username: &str, pass: &str) -> User {
        let (salt, hash) = hash_pass(pass);
        let unit = db.begin().unwrap();
        let user = users::create_user(
            &unit,
            &NewUser {
                id: Uuid::new_v4(),
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                is_admin: false,
                credential: Credential { salt, hash },
            },
        )
        .unwrap();
        unit.commit().unwrap();
        user
    }

    fn controller(db: &Arc<Database>) -> SessionController {
        SessionController::new(
            db.clone(),
            Arc::new(SqliteSessionStore),
            Arc::new(OutboxNotifier::new()),
            auth_config(),
        )
    }

    #[test]
    fn test_login_with_valid_credentials() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = seed_user(&db, "ada", "correct horse");
        let controller = controller(&db);

        let outcome = controller
            .login("ada", "correct horse", &metadata())
            .unwrap();
        let LoginOutcome::Granted(token) = outcome else {
            panic!("expected granted login");
        };
        assert!(!token.access_token.is_empty());
        assert_eq!(token.token_type, "Bearer");

        // The token validates back to the user's identity.
        let claims = controller.validate_token(&token.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ada");

        // Exactly one login event was recorded, carrying the audit fields.
        let conn = db.get().unwrap();
        let pending = outbox::pending_messages(&conn, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, events::TYPE_USER_LOGGED_IN);
        assert_eq!(pending[0].topic, events::TOPIC_AUTH);
        assert_eq!(pending[0].partition_key, user.id.to_string());

        let payload: events::UserLoggedIn = serde_json::from_slice(&pending[0].payload).unwrap();
        assert_eq!(payload.user, user.id);
        assert_eq!(payload.host, "api.example.com");
        assert_eq!(payload.user_agent, "curl/8");
        assert_eq!(payload.remote_addr, "10.0.0.1:4242");
    }

    #[test]
    fn test_login_with_wrong_pass_is_denied_without_event() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_user(&db, "ada", "correct horse");
        let controller = controller(&db);

        let outcome = controller.login("ada", "wrong horse", &metadata()).unwrap();
        assert_eq!(outcome, LoginOutcome::Denied);

        let conn = db.get().unwrap();
        assert_eq!(outbox::pending_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_login_with_unknown_username_is_denied() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let controller = controller(&db);

        let outcome = controller.login("nobody", "pass", &metadata()).unwrap();
        assert_eq!(outcome, LoginOutcome::Denied);
    }

    #[test]
    fn test_login_store_failure_is_error_without_event() {
        struct FailingStore;
        impl SessionStore for FailingStore {
            fn credential_by_username(
                &self,
                _unit: &Unit,
                _username: &str,
            ) -> StoreResult<Option<(User, Credential)>> {
                Err(StoreError::Connection("store down".to_string()))
            }
        }

        let db = Arc::new(Database::open_in_memory().unwrap());
        let controller = SessionController::new(
            db.clone(),
            Arc::new(FailingStore),
            Arc::new(OutboxNotifier::new()),
            auth_config(),
        );

        let err = controller.login("ada", "pass", &metadata()).unwrap_err();
        assert!(matches!(err, GatewayError::Store { .. }));

        let conn = db.get().unwrap();
        assert_eq!(outbox::pending_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_logout_records_audit_event() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = seed_user(&db, "ada", "correct horse");
        let controller = controller(&db);

        let LoginOutcome::Granted(token) = controller
            .login("ada", "correct horse", &metadata())
            .unwrap()
        else {
            panic!("expected granted login");
        };

        controller.logout(&token.access_token, &metadata()).unwrap();

        let conn = db.get().unwrap();
        let pending = outbox::pending_messages(&conn, 10).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].event_type, events::TYPE_USER_LOGGED_OUT);

        let payload: events::UserLoggedOut = serde_json::from_slice(&pending[1].payload).unwrap();
        assert_eq!(payload.user, user.id);
        assert_eq!(payload.username, "ada");
    }

    #[test]
    fn test_logout_with_invalid_token_is_unauthorized() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let controller = controller(&db);

        let err = controller.logout("not-a-token", &metadata()).unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));

        let conn = db.get().unwrap();
        assert_eq!(outbox::pending_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_logout_does_not_revoke_token() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_user(&db, "ada", "correct horse");
        let controller = controller(&db);

        let LoginOutcome::Granted(token) = controller
            .login("ada", "correct horse", &metadata())
            .unwrap()
        else {
            panic!("expected granted login");
        };

        controller.logout(&token.access_token, &metadata()).unwrap();

        // Stateless tokens stay valid until expiry.
        assert!(controller.validate_token(&token.access_token).is_ok());
    }

    #[test]
    fn test_validate_token_rejects_foreign_signature() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_user(&db, "ada", "correct horse");

        let foreign = SessionController::new(
            db.clone(),
            Arc::new(SqliteSessionStore),
            Arc::new(OutboxNotifier::new()),
            AuthConfig::new("other-secret", Duration::hours(8)),
        );
        let LoginOutcome::Granted(token) =
            foreign.login("ada", "correct horse", &metadata()).unwrap()
        else {
            panic!("expected granted login");
        };

        let controller = controller(&db);
        assert!(matches!(
            controller.validate_token(&token.access_token).unwrap_err(),
            GatewayError::Unauthorized
        ));
    }
}
