//! Service request state machine
//!
//! ```text
//! new ──► accepted ──► in_progress ──► completed
//!  │         │              │
//!  ├► rejected              │
//!  └─────────┴──────────────┴──► cancelled
//! ```

use crate::auth::RequestParty;
use usta_core::{RequestStatus, UstaError, UstaResult};

/// Legal edges as `(from, who, to)`
pub const TRANSITIONS: &[(RequestStatus, RequestParty, RequestStatus)] = &[
    (RequestStatus::New, RequestParty::Master, RequestStatus::Accepted),
    (RequestStatus::New, RequestParty::Master, RequestStatus::Rejected),
    (RequestStatus::New, RequestParty::Client, RequestStatus::Cancelled),
    (RequestStatus::Accepted, RequestParty::Master, RequestStatus::InProgress),
    (RequestStatus::Accepted, RequestParty::Client, RequestStatus::Cancelled),
    (RequestStatus::InProgress, RequestParty::Master, RequestStatus::Completed),
    (RequestStatus::InProgress, RequestParty::Client, RequestStatus::Cancelled),
];

pub fn is_allowed(from: RequestStatus, party: RequestParty, to: RequestStatus) -> bool {
    TRANSITIONS
        .iter()
        .any(|&(f, p, t)| f == from && p == party && t == to)
}

pub fn check_transition(
    from: RequestStatus,
    party: RequestParty,
    to: RequestStatus,
) -> UstaResult<()> {
    if from.is_terminal() {
        return Err(UstaError::invalid_input(
            format!("request is already {} and cannot change", from),
            "status",
            "lifecycle",
        ));
    }

    if !is_allowed(from, party, to) {
        return Err(UstaError::invalid_input(
            format!("cannot move a request from {} to {}", from, to),
            "status",
            "lifecycle",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use usta_core::ErrorKind;

    #[test]
    fn terminal_states_have_no_exits() {
        for &(from, _, _) in TRANSITIONS {
            assert!(!from.is_terminal());
        }
        for party in [RequestParty::Client, RequestParty::Master] {
            for status in RequestStatus::ALL.into_iter().filter(RequestStatus::is_terminal) {
                for to in RequestStatus::ALL {
                    assert!(check_transition(status, party, to).is_err());
                }
            }
        }
    }

    #[test]
    fn nothing_returns_to_new() {
        assert!(TRANSITIONS.iter().all(|&(_, _, to)| to != RequestStatus::New));
    }

    #[test]
    fn happy_path_is_legal() {
        let m = RequestParty::Master;
        assert!(check_transition(RequestStatus::New, m, RequestStatus::Accepted).is_ok());
        assert!(check_transition(RequestStatus::Accepted, m, RequestStatus::InProgress).is_ok());
        assert!(check_transition(RequestStatus::InProgress, m, RequestStatus::Completed).is_ok());
    }

    #[test]
    fn skipping_states_is_rejected() {
        let err = check_transition(
            RequestStatus::New,
            RequestParty::Master,
            RequestStatus::Completed,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn completed_cannot_be_reopened() {
        let err = check_transition(
            RequestStatus::Completed,
            RequestParty::Master,
            RequestStatus::InProgress,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn client_may_cancel_until_completion() {
        let c = RequestParty::Client;
        for from in [RequestStatus::New, RequestStatus::Accepted, RequestStatus::InProgress] {
            assert!(check_transition(from, c, RequestStatus::Cancelled).is_ok());
        }
        assert!(check_transition(RequestStatus::InProgress, c, RequestStatus::Completed).is_err());
        assert!(check_transition(RequestStatus::Completed, c, RequestStatus::Cancelled).is_err());
    }
}
