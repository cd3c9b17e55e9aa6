//! Session Manager - login, session issuance and resolution

use super::pending::PendingRegistrations;
use super::token::{generate_token, hash_token};
use crate::auth::otp::CredentialVerifier;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use usta_core::{
    timestamp_now, Account, IdentityStore, NewAccount, PhoneNumber, Role, Session, UstaError,
    UstaResult,
};
use uuid::Uuid;

const COMPONENT: &str = "session";

/// A freshly issued bearer token; the raw token is never stored
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub session: IssuedSession,
    /// Whether this login registered the account
    pub registered: bool,
}

/// Issues, resolves and invalidates sessions
pub struct SessionManager {
    identities: Arc<dyn IdentityStore>,
    verifier: Arc<dyn CredentialVerifier>,
    pending: PendingRegistrations,
    session_ttl: Duration,
}

impl SessionManager {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        verifier: Arc<dyn CredentialVerifier>,
        session_ttl: Duration,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            identities,
            verifier,
            pending: PendingRegistrations::new(pending_ttl),
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Start a login: remember the intended role and send a code
    pub async fn request_otp(&self, phone: &str, role: Option<Role>) -> UstaResult<()> {
        let phone = PhoneNumber::parse(phone)?;
        if let Some(role) = role {
            ensure_self_registrable(role)?;
            self.pending.record(&phone, role, Utc::now()).await;
        }

        self.verifier.request_code(&phone).await
    }

    /// Create a session for an account with the configured absolute expiry
    pub async fn issue_session(&self, account_id: Uuid) -> UstaResult<IssuedSession> {
        self.issue_session_at(account_id, timestamp_now()).await
    }

    pub async fn issue_session_at(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> UstaResult<IssuedSession> {
        let expires_at = now.checked_add_signed(self.session_ttl).ok_or_else(|| {
            UstaError::internal("session expiry out of range", COMPONENT)
                .in_operation("issue_session")
        })?;

        let token = generate_token();
        let session = Session {
            token_hash: hash_token(&token),
            account_id,
            created_at: now,
            expires_at,
        };

        self.identities.insert_session(&session).await?;

        debug!(account_id = %account_id, expires_at = %session.expires_at, "Session issued");
        Ok(IssuedSession {
            token,
            expires_at: session.expires_at,
        })
    }

    /// Resolve a bearer token to its account
    pub async fn resolve_session(&self, token: &str) -> UstaResult<Account> {
        self.resolve_session_at(token, Utc::now()).await
    }

    pub async fn resolve_session_at(&self, token: &str, now: DateTime<Utc>) -> UstaResult<Account> {
        let token = token.trim();
        if token.is_empty() {
            return Err(UstaError::unauthenticated("missing session token", COMPONENT));
        }

        let session = self
            .identities
            .find_session_by_hash(&hash_token(token))
            .await?
            .ok_or_else(|| UstaError::unauthenticated("unknown session", COMPONENT))?;

        if !session.is_active_at(now) {
            debug!(account_id = %session.account_id, "Session expired");
            return Err(UstaError::unauthenticated("session expired", COMPONENT));
        }

        self.identities
            .find_account(session.account_id)
            .await?
            .ok_or_else(|| {
                warn!(account_id = %session.account_id, "Session references a missing account");
                UstaError::unauthenticated("unknown session", COMPONENT)
            })
    }

    /// Return the account for `phone`, creating it with `role_if_new` if absent.
    ///
    /// The role of an existing account is never changed.
    pub async fn register_or_get_account(
        &self,
        phone: &PhoneNumber,
        role_if_new: Option<Role>,
    ) -> UstaResult<(Account, bool)> {
        if let Some(account) = self.identities.find_account_by_phone(phone).await? {
            if role_if_new.is_some_and(|role| role != account.role) {
                debug!(account_id = %account.id, "Ignoring role for existing account");
            }
            return Ok((account, false));
        }

        let role = role_if_new.ok_or_else(|| {
            UstaError::invalid_input("role is required for a new account", "role", COMPONENT)
        })?;
        ensure_self_registrable(role)?;

        let outcome = self
            .identities
            .create_account(NewAccount {
                phone: phone.clone(),
                role,
                name: None,
            })
            .await?;

        let created = outcome.was_created();
        let account = outcome.into_account();
        if created {
            info!(account_id = %account.id, role = %account.role, "Account registered");
        }
        Ok((account, created))
    }

    /// Verify a code, register or load the account and issue a new session
    pub async fn login(
        &self,
        phone: &str,
        code: &str,
        role: Option<Role>,
    ) -> UstaResult<LoginOutcome> {
        let phone = PhoneNumber::parse(phone)?;
        if code.trim().is_empty() {
            return Err(UstaError::invalid_input("code is required", "code", COMPONENT));
        }

        if !self.verifier.verify(&phone, code).await? {
            warn!(phone = %phone, "Verification code rejected");
            return Err(
                UstaError::invalid_input("invalid verification code", "code", COMPONENT)
                    .in_operation("login"),
            );
        }

        let now = timestamp_now();
        let role = match role {
            Some(role) => Some(role),
            None => self.pending.role_for(&phone, now).await,
        };

        let (account, registered) = self.register_or_get_account(&phone, role).await?;
        self.pending.clear(&phone).await;

        let session = self.issue_session_at(account.id, now).await?;
        info!(account_id = %account.id, registered, "Login succeeded");

        Ok(LoginOutcome {
            account,
            session,
            registered,
        })
    }

    /// Delete the session behind `token`; unknown tokens are a no-op
    pub async fn logout(&self, token: &str) -> UstaResult<bool> {
        let removed = self
            .identities
            .delete_session_by_hash(&hash_token(token.trim()))
            .await?;
        if removed {
            info!("Session revoked");
        }
        Ok(removed)
    }

    /// Drop expired sessions, stale pending registrations and expired codes
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> UstaResult<u64> {
        let removed = self.identities.delete_expired_sessions(now).await?;
        let pending = self.pending.purge_expired(now).await;
        let codes = self.verifier.purge_expired(now).await;
        debug!(sessions = removed, pending, codes, "Purged expired session state");
        Ok(removed)
    }
}

fn ensure_self_registrable(role: Role) -> UstaResult<()> {
    match role {
        Role::Client | Role::Master => Ok(()),
        Role::Admin => Err(UstaError::invalid_input(
            "admin accounts cannot be self-registered",
            "role",
            COMPONENT,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::otp::FixedCodeVerifier;
    use crate::storage::MemoryStore;
    use usta_core::ErrorKind;

    fn manager_with_store(store: Arc<MemoryStore>) -> SessionManager {
        SessionManager::new(
            store,
            Arc::new(FixedCodeVerifier::new("123456")),
            Duration::days(30),
            Duration::minutes(5),
        )
    }

    fn manager() -> SessionManager {
        manager_with_store(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn login_registers_then_reuses_account() {
        let manager = manager();
        let first = manager
            .login("+998901234567", "123456", Some(Role::Client))
            .await
            .unwrap();
        assert!(first.registered);

        let second = manager.login("+998901234567", "123456", None).await.unwrap();
        assert!(!second.registered);
        assert_eq!(first.account.id, second.account.id);
        assert_ne!(first.session.token, second.session.token);

        // both sessions stay valid
        for token in [&first.session.token, &second.session.token] {
            let account = manager.resolve_session(token).await.unwrap();
            assert_eq!(account.id, first.account.id);
        }
    }

    #[tokio::test]
    async fn wrong_code_is_rejected_without_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with_store(store.clone());
        let err = manager
            .login("+998901234567", "000000", Some(Role::Client))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.field(), Some("code"));

        let phone = PhoneNumber::parse("+998901234567").unwrap();
        assert!(store.find_account_by_phone(&phone).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_account_requires_role() {
        let err = manager()
            .login("+998901234567", "123456", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.field(), Some("role"));
    }

    #[tokio::test]
    async fn pending_role_from_otp_request_is_used() {
        let manager = manager();
        manager
            .request_otp("+998901234567", Some(Role::Master))
            .await
            .unwrap();

        let outcome = manager.login("+998901234567", "123456", None).await.unwrap();
        assert_eq!(outcome.account.role, Role::Master);
    }

    #[tokio::test]
    async fn code_is_spent_when_role_is_missing() {
        use crate::auth::otp::{MemoryOtpSender, OtpVerifier};

        let sender = Arc::new(MemoryOtpSender::new());
        let manager = SessionManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(OtpVerifier::new(&usta_core::OtpConfig::default(), sender.clone())),
            Duration::days(30),
            Duration::minutes(5),
        );
        manager.request_otp("+998901234567", None).await.unwrap();
        let phone = PhoneNumber::parse("+998901234567").unwrap();
        let code = sender.last_code(&phone).await.unwrap();

        let err = manager.login("+998901234567", &code, None).await.unwrap_err();
        assert_eq!(err.field(), Some("role"));

        let err = manager
            .login("+998901234567", &code, Some(Role::Client))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("code"));
    }

    #[tokio::test]
    async fn admin_cannot_self_register() {
        let manager = manager();
        let err = manager
            .request_otp("+998901234567", Some(Role::Admin))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("role"));

        let err = manager
            .login("+998901234567", "123456", Some(Role::Admin))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn role_of_existing_account_is_immutable() {
        let manager = manager();
        let phone = PhoneNumber::parse("+998901234567").unwrap();
        let (client, created) = manager
            .register_or_get_account(&phone, Some(Role::Client))
            .await
            .unwrap();
        assert!(created);

        let (again, created) = manager
            .register_or_get_account(&phone, Some(Role::Master))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, client.id);
        assert_eq!(again.role, Role::Client);
    }

    #[tokio::test]
    async fn session_expires_at_boundary() {
        let manager = manager();
        let phone = PhoneNumber::parse("+998901234567").unwrap();
        let (account, _) = manager
            .register_or_get_account(&phone, Some(Role::Client))
            .await
            .unwrap();

        let now = Utc::now();
        let issued = manager.issue_session_at(account.id, now).await.unwrap();
        assert_eq!(issued.expires_at, now + Duration::days(30));

        let just_before = issued.expires_at - Duration::seconds(1);
        assert!(manager
            .resolve_session_at(&issued.token, just_before)
            .await
            .is_ok());

        let err = manager
            .resolve_session_at(&issued.token, issued.expires_at)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn oversized_ttl_fails_without_panicking() {
        let manager = SessionManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedCodeVerifier::new("123456")),
            Duration::days(100_000_000),
            Duration::minutes(5),
        );

        let err = manager
            .login("+998901234567", "123456", Some(Role::Client))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn logout_revokes_only_that_session() {
        let manager = manager();
        let a = manager
            .login("+998901234567", "123456", Some(Role::Client))
            .await
            .unwrap();
        let b = manager.login("+998901234567", "123456", None).await.unwrap();

        assert!(manager.logout(&a.session.token).await.unwrap());
        assert!(!manager.logout(&a.session.token).await.unwrap());

        assert_eq!(
            manager
                .resolve_session(&a.session.token)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Unauthenticated
        );
        assert!(manager.resolve_session(&b.session.token).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_are_unauthenticated() {
        let manager = manager();
        for token in ["", "   ", "not-a-token"] {
            let err = manager.resolve_session(token).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        }
    }

    #[tokio::test]
    async fn purge_removes_expired_sessions() {
        let manager = manager();
        let outcome = manager
            .login("+998901234567", "123456", Some(Role::Client))
            .await
            .unwrap();

        let removed = manager
            .purge_expired_sessions(outcome.session.expires_at)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(manager.resolve_session(&outcome.session.token).await.is_err());
    }
}
