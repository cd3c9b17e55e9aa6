//! In-memory store for development and tests
//!
//! All tables sit behind one lock so that every trait method observes and
//! mutates a consistent snapshot, matching the per-call transaction of the
//! SQLite backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use usta_core::{
    Account, CreateOutcome, IdentityStore, MasterFilter, MasterProfile, MasterProfileUpdate,
    NewAccount, PhoneNumber, RequestStatus, RequestStore, Role, ServiceRequest, Session,
    timestamp_now, UstaError, UstaResult,
};
use uuid::Uuid;

const COMPONENT: &str = "memory_store";

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    accounts_by_phone: HashMap<PhoneNumber, Uuid>,
    profiles: HashMap<Uuid, MasterProfile>,
    profiles_by_account: HashMap<Uuid, Uuid>,
    sessions: HashMap<String, Session>,
    /// Insertion order
    requests: Vec<ServiceRequest>,
}

impl Tables {
    fn newest_first(&self, keep: impl Fn(&ServiceRequest) -> bool) -> Vec<ServiceRequest> {
        let mut found: Vec<ServiceRequest> = self
            .requests
            .iter()
            .rev()
            .filter(|request| keep(request))
            .cloned()
            .collect();
        // stable: equal timestamps stay in reverse insertion order
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_account(&self, id: Uuid) -> UstaResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_phone(&self, phone: &PhoneNumber) -> UstaResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts_by_phone
            .get(phone)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn create_account(&self, new: NewAccount) -> UstaResult<CreateOutcome> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .accounts_by_phone
            .get(&new.phone)
            .and_then(|id| tables.accounts.get(id))
        {
            return Ok(CreateOutcome::Existing(existing.clone()));
        }

        let now = timestamp_now();
        let account = Account {
            id: Uuid::new_v4(),
            phone: new.phone,
            role: new.role,
            name: new.name,
            created_at: now,
        };

        if account.role == Role::Master {
            let profile = MasterProfile::unset(account.id, now);
            tables.profiles_by_account.insert(account.id, profile.id);
            tables.profiles.insert(profile.id, profile);
        }
        tables
            .accounts_by_phone
            .insert(account.phone.clone(), account.id);
        tables.accounts.insert(account.id, account.clone());

        debug!(account_id = %account.id, "Account stored");
        Ok(CreateOutcome::Created(account))
    }

    async fn find_master_profile(&self, id: Uuid) -> UstaResult<Option<MasterProfile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn find_master_profile_by_account(
        &self,
        account_id: Uuid,
    ) -> UstaResult<Option<MasterProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles_by_account
            .get(&account_id)
            .and_then(|id| tables.profiles.get(id))
            .cloned())
    }

    async fn update_profile(
        &self,
        account_id: Uuid,
        name: Option<&str>,
        master: Option<&MasterProfileUpdate>,
    ) -> UstaResult<(Account, Option<MasterProfile>)> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&account_id) {
            return Err(UstaError::not_found(
                format!("account {}", account_id),
                COMPONENT,
            ));
        }

        let now = timestamp_now();
        if let Some(update) = master {
            let profile_id = match tables.profiles_by_account.get(&account_id) {
                Some(id) => *id,
                None => {
                    let profile = MasterProfile::unset(account_id, now);
                    let id = profile.id;
                    tables.profiles_by_account.insert(account_id, id);
                    tables.profiles.insert(id, profile);
                    id
                }
            };
            tables
                .profiles
                .get_mut(&profile_id)
                .ok_or_else(|| UstaError::internal("profile index out of sync", COMPONENT))?
                .apply(update, now);
        }

        let account = tables
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| UstaError::internal("account index out of sync", COMPONENT))?;
        if let Some(name) = name {
            account.name = Some(name.to_string());
        }
        let account = account.clone();

        let profile = tables
            .profiles_by_account
            .get(&account_id)
            .and_then(|id| tables.profiles.get(id))
            .cloned();
        Ok((account, profile))
    }

    async fn list_master_profiles(&self, filter: &MasterFilter) -> UstaResult<Vec<MasterProfile>> {
        let tables = self.tables.read().await;
        let mut profiles: Vec<MasterProfile> = tables
            .profiles
            .values()
            .filter(|profile| profile.profession.is_some() && filter.matches(profile))
            .cloned()
            .collect();
        profiles.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(profiles)
    }

    async fn insert_session(&self, session: &Session) -> UstaResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&session.account_id) {
            return Err(UstaError::internal(
                "session references an unknown account",
                COMPONENT,
            ));
        }
        tables
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session_by_hash(&self, token_hash: &str) -> UstaResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(token_hash).cloned())
    }

    async fn delete_session_by_hash(&self, token_hash: &str) -> UstaResult<bool> {
        Ok(self
            .tables
            .write()
            .await
            .sessions
            .remove(token_hash)
            .is_some())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> UstaResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| session.is_active_at(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(&self, request: &ServiceRequest) -> UstaResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&request.client_id)
            || !tables.profiles.contains_key(&request.master_id)
        {
            return Err(UstaError::internal(
                "request references an unknown account or profile",
                COMPONENT,
            ));
        }
        tables.requests.push(request.clone());
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> UstaResult<Option<ServiceRequest>> {
        Ok(self
            .tables
            .read()
            .await
            .requests
            .iter()
            .find(|request| request.id == id)
            .cloned())
    }

    async fn list_requests_by_client(&self, client_id: Uuid) -> UstaResult<Vec<ServiceRequest>> {
        Ok(self
            .tables
            .read()
            .await
            .newest_first(|request| request.client_id == client_id))
    }

    async fn list_requests_by_master(&self, master_id: Uuid) -> UstaResult<Vec<ServiceRequest>> {
        Ok(self
            .tables
            .read()
            .await
            .newest_first(|request| request.master_id == master_id))
    }

    async fn update_request_status(
        &self,
        id: Uuid,
        expected_status: RequestStatus,
        expected_version: i64,
        new_status: RequestStatus,
        now: DateTime<Utc>,
    ) -> UstaResult<Option<ServiceRequest>> {
        let mut tables = self.tables.write().await;
        let Some(request) = tables.requests.iter_mut().find(|request| {
            request.id == id
                && request.status == expected_status
                && request.version == expected_version
        }) else {
            return Ok(None);
        };

        request.status = new_status;
        request.version += 1;
        request.updated_at = now;
        Ok(Some(request.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(phone: &str, role: Role) -> NewAccount {
        NewAccount {
            phone: PhoneNumber::parse(phone).unwrap(),
            role,
            name: None,
        }
    }

    #[tokio::test]
    async fn master_account_gets_exactly_one_profile() {
        let store = MemoryStore::new();
        let master = store
            .create_account(new_account("+998901234567", Role::Master))
            .await
            .unwrap()
            .into_account();

        let profile = store
            .find_master_profile_by_account(master.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.profession, None);

        let again = store
            .create_account(new_account("+998901234567", Role::Master))
            .await
            .unwrap();
        assert!(!again.was_created());
        assert_eq!(store.tables.read().await.profiles.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_account() {
        let store = MemoryStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_account(new_account("+998901234567", Role::Client))
                        .await
                        .unwrap()
                        .into_account()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn status_update_is_compare_and_swap() {
        let store = MemoryStore::new();
        let client = store
            .create_account(new_account("+998901111111", Role::Client))
            .await
            .unwrap()
            .into_account();
        let master = store
            .create_account(new_account("+998902222222", Role::Master))
            .await
            .unwrap()
            .into_account();
        let profile = store
            .find_master_profile_by_account(master.id)
            .await
            .unwrap()
            .unwrap();

        let request = ServiceRequest::new(client.id, profile.id, String::new(), Utc::now());
        store.insert_request(&request).await.unwrap();

        let now = Utc::now();
        let updated = store
            .update_request_status(request.id, RequestStatus::New, 0, RequestStatus::Accepted, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, 1);

        let lost = store
            .update_request_status(request.id, RequestStatus::New, 0, RequestStatus::Rejected, now)
            .await
            .unwrap();
        assert!(lost.is_none());
    }

    #[tokio::test]
    async fn directory_orders_by_rating() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for (phone, rating) in [("+998901111111", 3.5), ("+998902222222", 4.8)] {
            let master = store
                .create_account(new_account(phone, Role::Master))
                .await
                .unwrap()
                .into_account();
            let update = MasterProfileUpdate {
                profession: Some("plumber".into()),
                ..Default::default()
            };
            let (_, profile) = store
                .update_profile(master.id, None, Some(&update))
                .await
                .unwrap();
            let profile = profile.unwrap();
            store
                .tables
                .write()
                .await
                .profiles
                .get_mut(&profile.id)
                .unwrap()
                .rating = rating;
            ids.push(profile.id);
        }

        let listed = store
            .list_master_profiles(&MasterFilter::default())
            .await
            .unwrap();
        assert_eq!(
            listed.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![ids[1], ids[0]]
        );
    }
}
