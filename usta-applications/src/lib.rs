//! Usta Applications - marketplace services built on usta-core
//!
//! - One-time code login with server-side sessions
//! - The authorization gate for service requests
//! - The request lifecycle state machine
//! - Profile updates and the master directory
//! - In-memory and SQLite storage backends
//!
//! ## Architecture
//!
//! - **Core** (usta-core): types, errors, configuration, storage traits
//! - **Applications** (this crate): the services and their storage
//! - **Presentation** (usta-web): HTTP surface

pub mod auth;
pub mod profile;
pub mod requests;
pub mod session;
pub mod storage;

pub use auth::{
    AccountView, AuthorizationGate, CredentialVerifier, FixedCodeVerifier, LogOtpSender,
    MemoryOtpSender, OtpSender, OtpVerifier, RequestAction, RequestParty,
};
pub use profile::{ProfileService, ProfileUpdate};
pub use requests::{RequestEngine, TRANSITIONS};
pub use session::{IssuedSession, LoginOutcome, SessionManager};
pub use storage::MemoryStore;
#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use usta_core::{
    Account, IdentityStore, MasterFilter, MasterProfile, OtpConfig, OtpMode, RequestStatus,
    RequestStore, Role, ServiceRequest, UstaConfig, UstaResult,
};
use uuid::Uuid;

/// Build the credential verifier selected by configuration
pub fn verifier_from_config(
    config: &OtpConfig,
    sender: Arc<dyn OtpSender>,
) -> Arc<dyn CredentialVerifier> {
    match config.mode {
        OtpMode::Fixed => {
            warn!("Fixed one-time code is active; do not use this mode in production");
            Arc::new(FixedCodeVerifier::new(config.fixed_code.clone()))
        }
        OtpMode::Generated => Arc::new(OtpVerifier::new(config, sender)),
    }
}

/// Builder for UstaApplication
pub struct UstaApplicationBuilder {
    config: UstaConfig,
    identities: Option<Arc<dyn IdentityStore>>,
    requests: Option<Arc<dyn RequestStore>>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
    sender: Option<Arc<dyn OtpSender>>,
}

impl UstaApplicationBuilder {
    pub fn new(config: UstaConfig) -> Self {
        Self {
            config,
            identities: None,
            requests: None,
            verifier: None,
            sender: None,
        }
    }

    /// Use one backend for both identity and request storage
    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: IdentityStore + RequestStore + 'static,
    {
        let identities: Arc<dyn IdentityStore> = store.clone();
        let requests: Arc<dyn RequestStore> = store;
        self.identities = Some(identities);
        self.requests = Some(requests);
        self
    }

    /// Replace the configured verifier
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Delivery channel for generated codes (defaults to the log)
    pub fn with_otp_sender(mut self, sender: Arc<dyn OtpSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Build the application, opening the configured database when no store was given
    pub async fn build(self) -> UstaResult<UstaApplication> {
        self.config.validate()?;

        let (identities, requests) = match (self.identities, self.requests) {
            (Some(identities), Some(requests)) => (identities, requests),
            _ => Self::open_store(&self.config).await?,
        };

        let verifier = match self.verifier {
            Some(verifier) => verifier,
            None => {
                let sender = self.sender.unwrap_or_else(|| Arc::new(LogOtpSender));
                verifier_from_config(&self.config.otp, sender)
            }
        };

        let sessions = SessionManager::new(
            identities.clone(),
            verifier,
            Duration::days(self.config.session.ttl_days),
            Duration::seconds(self.config.otp.ttl_seconds),
        );

        info!(
            session_ttl_days = self.config.session.ttl_days,
            otp_mode = ?self.config.otp.mode,
            "Usta application initialized"
        );

        Ok(UstaApplication {
            sessions,
            requests: RequestEngine::new(identities.clone(), requests),
            profiles: ProfileService::new(identities),
        })
    }

    #[cfg(feature = "sqlite")]
    async fn open_store(
        config: &UstaConfig,
    ) -> UstaResult<(Arc<dyn IdentityStore>, Arc<dyn RequestStore>)> {
        let store = Arc::new(
            SqliteStore::connect(&config.database.url, config.database.max_connections).await?,
        );
        let identities: Arc<dyn IdentityStore> = store.clone();
        let requests: Arc<dyn RequestStore> = store;
        Ok((identities, requests))
    }

    #[cfg(not(feature = "sqlite"))]
    async fn open_store(
        _config: &UstaConfig,
    ) -> UstaResult<(Arc<dyn IdentityStore>, Arc<dyn RequestStore>)> {
        warn!("Built without SQLite support; using the in-memory store");
        let store = Arc::new(MemoryStore::new());
        let identities: Arc<dyn IdentityStore> = store.clone();
        let requests: Arc<dyn RequestStore> = store;
        Ok((identities, requests))
    }
}

/// Main Usta application service
pub struct UstaApplication {
    sessions: SessionManager,
    requests: RequestEngine,
    profiles: ProfileService,
}

impl UstaApplication {
    /// Create an application backed by the configured database
    pub async fn new(config: UstaConfig) -> UstaResult<Self> {
        UstaApplicationBuilder::new(config).build().await
    }

    pub fn builder(config: UstaConfig) -> UstaApplicationBuilder {
        UstaApplicationBuilder::new(config)
    }

    /// Application over a fresh in-memory store
    pub async fn in_memory(config: UstaConfig) -> UstaResult<Self> {
        UstaApplicationBuilder::new(config)
            .with_store(Arc::new(MemoryStore::new()))
            .build()
            .await
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn requests(&self) -> &RequestEngine {
        &self.requests
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    // ========================================
    // Authentication
    // ========================================

    pub async fn request_otp(&self, phone: &str, role: Option<Role>) -> UstaResult<()> {
        self.sessions.request_otp(phone, role).await
    }

    pub async fn login(
        &self,
        phone: &str,
        code: &str,
        role: Option<Role>,
    ) -> UstaResult<LoginOutcome> {
        self.sessions.login(phone, code, role).await
    }

    pub async fn resolve_session(&self, token: &str) -> UstaResult<Account> {
        self.sessions.resolve_session(token).await
    }

    pub async fn logout(&self, token: &str) -> UstaResult<bool> {
        self.sessions.logout(token).await
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> UstaResult<u64> {
        self.sessions.purge_expired_sessions(now).await
    }

    // ========================================
    // Profiles
    // ========================================

    pub async fn account_view(&self, account: Account) -> UstaResult<AccountView> {
        self.profiles.account_view(account).await
    }

    pub async fn update_profile(
        &self,
        account: &Account,
        update: ProfileUpdate,
    ) -> UstaResult<AccountView> {
        self.profiles.update_profile(account, update).await
    }

    pub async fn list_masters(&self, filter: &MasterFilter) -> UstaResult<Vec<MasterProfile>> {
        self.profiles.list_masters(filter).await
    }

    pub async fn get_master(&self, profile_id: Uuid) -> UstaResult<MasterProfile> {
        self.profiles.get_master(profile_id).await
    }

    // ========================================
    // Service requests
    // ========================================

    pub async fn create_request(
        &self,
        caller: &Account,
        master_id: Uuid,
        message: Option<String>,
    ) -> UstaResult<ServiceRequest> {
        self.requests.create_request(caller, master_id, message).await
    }

    pub async fn set_status(
        &self,
        caller: &Account,
        request_id: Uuid,
        status: RequestStatus,
        expected_version: Option<i64>,
    ) -> UstaResult<ServiceRequest> {
        self.requests
            .set_status(caller, request_id, status, expected_version)
            .await
    }

    pub async fn get_request(
        &self,
        caller: &Account,
        request_id: Uuid,
    ) -> UstaResult<ServiceRequest> {
        self.requests.get_request(caller, request_id).await
    }

    pub async fn list_requests(&self, caller: &Account) -> UstaResult<Vec<ServiceRequest>> {
        self.requests.list_requests(caller).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_application_logs_in_with_fixed_code() {
        let mut config = UstaConfig::default();
        config.otp.mode = OtpMode::Fixed;

        let app = UstaApplication::in_memory(config).await.unwrap();
        let outcome = app
            .login("+998901234567", "123456", Some(Role::Client))
            .await
            .unwrap();
        let me = app.resolve_session(&outcome.session.token).await.unwrap();
        assert_eq!(me.id, outcome.account.id);
    }

    #[tokio::test]
    async fn generated_codes_go_through_the_sender() {
        let sender = MemoryOtpSender::new();
        let app = UstaApplication::builder(UstaConfig::default())
            .with_store(Arc::new(MemoryStore::new()))
            .with_otp_sender(Arc::new(sender.clone()))
            .build()
            .await
            .unwrap();

        app.request_otp("+998901234567", Some(Role::Master))
            .await
            .unwrap();
        let phone = usta_core::PhoneNumber::parse("+998901234567").unwrap();
        let code = sender.last_code(&phone).await.unwrap();

        assert!(app.login("+998901234567", "123456x", None).await.is_err());
        let outcome = app.login("+998901234567", &code, None).await.unwrap();
        assert_eq!(outcome.account.role, Role::Master);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = UstaConfig::default();
        config.session.ttl_days = 0;
        assert!(UstaApplication::in_memory(config).await.is_err());
    }
}
