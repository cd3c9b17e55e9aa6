//! Profile updates and the master directory

use crate::auth::AccountView;
use std::sync::Arc;
use tracing::{debug, info};
use usta_core::{
    Account, IdentityStore, MasterFilter, MasterProfile, MasterProfileUpdate, Role, UstaError,
    UstaResult,
};
use uuid::Uuid;

const COMPONENT: &str = "profile";

/// Fields a caller may change on their own profile; `None` keeps the value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub profession: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<u32>,
}

fn clean(value: Option<String>, field: &str) -> UstaResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(UstaError::invalid_input(
                    format!("{} must not be blank", field),
                    field,
                    COMPONENT,
                ))
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}

pub struct ProfileService {
    identities: Arc<dyn IdentityStore>,
}

impl ProfileService {
    pub fn new(identities: Arc<dyn IdentityStore>) -> Self {
        Self { identities }
    }

    pub async fn account_view(&self, account: Account) -> UstaResult<AccountView> {
        let profile = match account.role {
            Role::Master => {
                self.identities
                    .find_master_profile_by_account(account.id)
                    .await?
            }
            Role::Client | Role::Admin => None,
        };
        Ok(AccountView::new(account, profile))
    }

    /// Apply `update` to the caller's own account.
    ///
    /// Master-only fields are ignored for other roles. All fields are
    /// validated before anything is written.
    pub async fn update_profile(
        &self,
        account: &Account,
        update: ProfileUpdate,
    ) -> UstaResult<AccountView> {
        let name = clean(update.name, "name")?;
        let master_update = MasterProfileUpdate {
            profession: clean(update.profession, "profession")?,
            region: clean(update.region, "region")?,
            city: clean(update.city, "city")?,
            bio: clean(update.bio, "bio")?,
            experience_years: update.experience_years,
        };

        let master_update = if master_update.is_empty() {
            None
        } else if account.role == Role::Master {
            Some(master_update)
        } else {
            debug!(account_id = %account.id, role = %account.role, "Ignoring master-only fields");
            None
        };

        let (account, profile) = self
            .identities
            .update_profile(account.id, name.as_deref(), master_update.as_ref())
            .await?;

        info!(account_id = %account.id, "Profile updated");
        Ok(AccountView::new(account, profile))
    }

    /// Profile-complete masters, best rated first
    pub async fn list_masters(&self, filter: &MasterFilter) -> UstaResult<Vec<MasterProfile>> {
        let masters = self.identities.list_master_profiles(filter).await?;
        debug!(count = masters.len(), "Listed masters");
        Ok(masters)
    }

    pub async fn get_master(&self, profile_id: Uuid) -> UstaResult<MasterProfile> {
        self.identities
            .find_master_profile(profile_id)
            .await?
            .ok_or_else(|| UstaError::not_found(format!("master {}", profile_id), COMPONENT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use usta_core::{ErrorKind, NewAccount, PhoneNumber};

    async fn setup(role: Role) -> (ProfileService, Account) {
        let store = Arc::new(MemoryStore::new());
        let account = store
            .create_account(NewAccount {
                phone: PhoneNumber::parse("+998901234567").unwrap(),
                role,
                name: None,
            })
            .await
            .unwrap()
            .into_account();
        (ProfileService::new(store), account)
    }

    #[tokio::test]
    async fn master_completes_profile_with_profession() {
        let (service, master) = setup(Role::Master).await;
        let view = service.account_view(master.clone()).await.unwrap();
        assert!(!view.profile_complete);
        assert!(service
            .list_masters(&MasterFilter::default())
            .await
            .unwrap()
            .is_empty());

        let view = service
            .update_profile(
                &master,
                ProfileUpdate {
                    name: Some("Bobur".into()),
                    profession: Some(" plumber ".into()),
                    city: Some("Tashkent".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(view.profile_complete);
        let profile = view.master_profile.unwrap();
        assert_eq!(profile.profession.as_deref(), Some("plumber"));

        let listed = service.list_masters(&MasterFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(service.get_master(profile.id).await.unwrap().id, profile.id);
    }

    #[tokio::test]
    async fn client_master_fields_are_ignored() {
        let (service, client) = setup(Role::Client).await;
        let view = service
            .update_profile(
                &client,
                ProfileUpdate {
                    name: Some("Aziz".into()),
                    profession: Some("plumber".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(view.profile_complete);
        assert!(view.master_profile.is_none());
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_before_writing() {
        let (service, client) = setup(Role::Client).await;
        let err = service
            .update_profile(
                &client,
                ProfileUpdate {
                    name: Some("Aziz".into()),
                    city: Some("   ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.field(), Some("city"));

        let view = service.account_view(client).await.unwrap();
        assert_eq!(view.name, None);
    }

    #[tokio::test]
    async fn unknown_master_is_not_found() {
        let (service, _) = setup(Role::Client).await;
        let err = service.get_master(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
