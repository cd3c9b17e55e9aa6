//! Request Lifecycle Engine
//!
//! Creates service requests and drives them through the state machine in
//! [`super::lifecycle`]. Every status change goes through the authorization
//! gate first and is persisted with a compare-and-swap on status and version.

use super::lifecycle::check_transition;
use crate::auth::{AuthorizationGate, RequestAction};
use std::sync::Arc;
use tracing::{debug, info, warn};
use usta_core::{
    timestamp_now, Account, IdentityStore, RequestStatus, RequestStore, Role, ServiceRequest,
    UstaError, UstaResult,
};
use uuid::Uuid;

const COMPONENT: &str = "requests";

/// Longest accepted request message, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

pub struct RequestEngine {
    identities: Arc<dyn IdentityStore>,
    requests: Arc<dyn RequestStore>,
    gate: AuthorizationGate,
}

impl RequestEngine {
    pub fn new(identities: Arc<dyn IdentityStore>, requests: Arc<dyn RequestStore>) -> Self {
        Self {
            identities,
            requests,
            gate: AuthorizationGate::new(),
        }
    }

    /// Open a request from `caller` against the master profile `master_id`
    pub async fn create_request(
        &self,
        caller: &Account,
        master_id: Uuid,
        message: Option<String>,
    ) -> UstaResult<ServiceRequest> {
        let message = message.unwrap_or_default();
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(UstaError::invalid_input(
                format!("message is longer than {} characters", MAX_MESSAGE_CHARS),
                "message",
                COMPONENT,
            ));
        }

        let target = self
            .identities
            .find_master_profile(master_id)
            .await?
            .ok_or_else(|| UstaError::not_found(format!("master {}", master_id), COMPONENT))?;
        self.gate.authorize_create(caller, &target)?;

        let request = ServiceRequest::new(caller.id, target.id, message, timestamp_now());
        self.requests.insert_request(&request).await?;

        info!(
            request_id = %request.id,
            client_id = %caller.id,
            master_id = %target.id,
            "Service request created"
        );
        Ok(request)
    }

    /// Move a request to `new_status` on behalf of `caller`.
    ///
    /// With `expected_version` the update only applies to that version of the
    /// request; without it, the version read here is used.
    pub async fn set_status(
        &self,
        caller: &Account,
        request_id: Uuid,
        new_status: RequestStatus,
        expected_version: Option<i64>,
    ) -> UstaResult<ServiceRequest> {
        let request = self.load(request_id).await?;
        let target = self.identities.find_master_profile(request.master_id).await?;

        let party =
            self.gate
                .authorize_status_change(caller, &request, target.as_ref(), new_status)?;
        check_transition(request.status, party, new_status).inspect_err(|_| {
            warn!(
                request_id = %request.id,
                from = %request.status,
                to = %new_status,
                "Illegal status transition"
            )
        })?;

        let version = expected_version.unwrap_or(request.version);
        let updated = self
            .requests
            .update_request_status(request.id, request.status, version, new_status, timestamp_now())
            .await?
            .ok_or_else(|| {
                warn!(request_id = %request.id, version, "Lost status update race");
                UstaError::conflict(
                    "request was modified concurrently; reload and retry",
                    COMPONENT,
                )
                .in_operation("set_status")
            })?;

        info!(
            request_id = %updated.id,
            party = %party,
            from = %request.status,
            to = %updated.status,
            version = updated.version,
            "Request status changed"
        );
        Ok(updated)
    }

    /// A single request, visible to its parties only
    pub async fn get_request(&self, caller: &Account, request_id: Uuid) -> UstaResult<ServiceRequest> {
        let request = self.load(request_id).await?;
        let target = self.identities.find_master_profile(request.master_id).await?;
        self.gate
            .authorize(caller, &request, target.as_ref(), RequestAction::View)?;
        Ok(request)
    }

    /// Requests scoped by the caller's role, newest first
    pub async fn list_requests(&self, caller: &Account) -> UstaResult<Vec<ServiceRequest>> {
        let requests = match caller.role {
            Role::Client => self.requests.list_requests_by_client(caller.id).await?,
            Role::Master => match self
                .identities
                .find_master_profile_by_account(caller.id)
                .await?
            {
                Some(profile) => self.requests.list_requests_by_master(profile.id).await?,
                None => Vec::new(),
            },
            Role::Admin => Vec::new(),
        };

        debug!(account_id = %caller.id, count = requests.len(), "Listed requests");
        Ok(requests)
    }

    async fn load(&self, request_id: Uuid) -> UstaResult<ServiceRequest> {
        self.requests
            .find_request(request_id)
            .await?
            .ok_or_else(|| UstaError::not_found(format!("request {}", request_id), COMPONENT))
    }
}
