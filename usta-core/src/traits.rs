//! Storage trait definitions
//!
//! Backends must keep each method a single logical transaction. In particular
//! `create_account` must never leave a master account without its profile,
//! and `update_profile` must never write the name without the profile fields.

use crate::error::UstaResult;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Durable records of accounts, master profiles and sessions
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_account(&self, id: Uuid) -> UstaResult<Option<Account>>;

    async fn find_account_by_phone(&self, phone: &PhoneNumber) -> UstaResult<Option<Account>>;

    /// Create an account, plus an unset master profile for `Role::Master`.
    ///
    /// Returns the stored account untouched when the phone is already known.
    async fn create_account(&self, account: NewAccount) -> UstaResult<CreateOutcome>;

    async fn find_master_profile(&self, id: Uuid) -> UstaResult<Option<MasterProfile>>;

    async fn find_master_profile_by_account(
        &self,
        account_id: Uuid,
    ) -> UstaResult<Option<MasterProfile>>;

    /// Change the account name and master profile fields as one write.
    ///
    /// `master` creates the profile when missing. Nothing is stored unless
    /// every part succeeds. Returns the account and its profile, if any.
    async fn update_profile(
        &self,
        account_id: Uuid,
        name: Option<&str>,
        master: Option<&MasterProfileUpdate>,
    ) -> UstaResult<(Account, Option<MasterProfile>)>;

    /// Profile-complete masters matching the filter, best rated first
    async fn list_master_profiles(&self, filter: &MasterFilter) -> UstaResult<Vec<MasterProfile>>;

    async fn insert_session(&self, session: &Session) -> UstaResult<()>;

    async fn find_session_by_hash(&self, token_hash: &str) -> UstaResult<Option<Session>>;

    /// Returns whether a session was removed
    async fn delete_session_by_hash(&self, token_hash: &str) -> UstaResult<bool>;

    /// Delete sessions with `expires_at <= now`, returning how many went
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> UstaResult<u64>;
}

/// Service request table
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_request(&self, request: &ServiceRequest) -> UstaResult<()>;

    async fn find_request(&self, id: Uuid) -> UstaResult<Option<ServiceRequest>>;

    /// Requests authored by a client, newest first
    async fn list_requests_by_client(&self, client_id: Uuid) -> UstaResult<Vec<ServiceRequest>>;

    /// Requests addressed to a master profile, newest first
    async fn list_requests_by_master(&self, master_id: Uuid) -> UstaResult<Vec<ServiceRequest>>;

    /// Compare-and-swap status update.
    ///
    /// Applies only while the row still has `expected_status` and
    /// `expected_version`; returns `None` when either has moved on.
    async fn update_request_status(
        &self,
        id: Uuid,
        expected_status: RequestStatus,
        expected_version: i64,
        new_status: RequestStatus,
        now: DateTime<Utc>,
    ) -> UstaResult<Option<ServiceRequest>>;
}
