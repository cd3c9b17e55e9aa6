//! Account identity projection
//!
//! The shape in which a resolved account is handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use usta_core::{Account, MasterProfile, PhoneNumber, Role};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Account as seen by its owner, with the derived completion flag
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: Uuid,
    pub phone: PhoneNumber,
    pub role: Role,
    pub name: Option<String>,
    pub profile_complete: bool,
    /// Present for master accounts
    pub master_profile: Option<MasterProfile>,
    pub created_at: DateTime<Utc>,
}

impl AccountView {
    pub fn new(account: Account, master_profile: Option<MasterProfile>) -> Self {
        let profile_complete = account.profile_complete(master_profile.as_ref());
        Self {
            id: account.id,
            phone: account.phone,
            role: account.role,
            name: account.name,
            profile_complete,
            master_profile,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_derives_completion_for_masters() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            phone: PhoneNumber::parse("+998901234567").unwrap(),
            role: Role::Master,
            name: Some("Bobur".into()),
            created_at: now,
        };
        let mut profile = MasterProfile::unset(account.id, now);

        let view = AccountView::new(account.clone(), Some(profile.clone()));
        assert_eq!(view.role, Role::Master);
        assert!(!view.profile_complete);

        profile.profession = Some("plumber".into());
        let view = AccountView::new(account, Some(profile));
        assert!(view.profile_complete);
    }
}
