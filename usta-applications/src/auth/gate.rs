//! Authorization Gate
//!
//! Stateless decisions over a resolved account and a service request. The
//! gate knows who may touch a request and which statuses each side may set;
//! whether a status is reachable from the current one is the lifecycle's
//! business.

use serde::{Deserialize, Serialize};
use tracing::warn;
use usta_core::{Account, MasterProfile, RequestStatus, ServiceRequest, UstaError, UstaResult};

const COMPONENT: &str = "authorization";

/// An account's relationship to one service request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestParty {
    /// The client who opened the request
    Client,
    /// The master owning the profile the request targets
    Master,
}

impl std::fmt::Display for RequestParty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestParty::Client => write!(f, "client"),
            RequestParty::Master => write!(f, "master"),
        }
    }
}

/// Actions the gate decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    View,
    SetStatus(RequestStatus),
}

const MASTER_TARGETS: &[RequestStatus] = &[
    RequestStatus::Accepted,
    RequestStatus::Rejected,
    RequestStatus::InProgress,
    RequestStatus::Completed,
];

const CLIENT_TARGETS: &[RequestStatus] = &[RequestStatus::Cancelled];

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    pub fn new() -> Self {
        Self
    }

    /// Relationship of `account` to `request`.
    ///
    /// `target` is the master profile the request references. The master
    /// predicate is evaluated first. Admins get no implicit party status.
    pub fn party_of(
        &self,
        account: &Account,
        request: &ServiceRequest,
        target: Option<&MasterProfile>,
    ) -> Option<RequestParty> {
        let owns_target = target.is_some_and(|profile| {
            profile.id == request.master_id && profile.account_id == account.id
        });

        if owns_target {
            Some(RequestParty::Master)
        } else if request.client_id == account.id {
            Some(RequestParty::Client)
        } else {
            None
        }
    }

    /// Statuses a party may ever set, regardless of the current status
    pub fn allowed_targets(&self, party: RequestParty) -> &'static [RequestStatus] {
        match party {
            RequestParty::Master => MASTER_TARGETS,
            RequestParty::Client => CLIENT_TARGETS,
        }
    }

    pub fn authorize(
        &self,
        account: &Account,
        request: &ServiceRequest,
        target: Option<&MasterProfile>,
        action: RequestAction,
    ) -> UstaResult<RequestParty> {
        let Some(party) = self.party_of(account, request, target) else {
            warn!(
                account_id = %account.id,
                request_id = %request.id,
                action = ?action,
                "Denied: account is not a party to the request"
            );
            return Err(UstaError::forbidden(
                "not a party to this request",
                COMPONENT,
            ));
        };

        if let RequestAction::SetStatus(status) = action {
            if !self.allowed_targets(party).contains(&status) {
                warn!(
                    account_id = %account.id,
                    request_id = %request.id,
                    party = %party,
                    status = %status,
                    "Denied: status not settable by this party"
                );
                return Err(UstaError::invalid_input(
                    format!("a {} may not set status '{}'", party, status),
                    "status",
                    COMPONENT,
                ));
            }
        }

        Ok(party)
    }

    /// Party check plus the party's settable statuses
    pub fn authorize_status_change(
        &self,
        account: &Account,
        request: &ServiceRequest,
        target: Option<&MasterProfile>,
        status: RequestStatus,
    ) -> UstaResult<RequestParty> {
        self.authorize(account, request, target, RequestAction::SetStatus(status))
    }

    /// Whether `account` may open a request against `target`
    pub fn authorize_create(&self, account: &Account, target: &MasterProfile) -> UstaResult<()> {
        if target.account_id == account.id {
            return Err(UstaError::invalid_input(
                "cannot open a request against your own profile",
                "master_id",
                COMPONENT,
            ));
        }
        Ok(())
    }
}
