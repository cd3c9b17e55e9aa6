//! Pending registrations
//!
//! The role a new user picked when asking for a code, keyed by phone and
//! valid for as long as the code itself.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use usta_core::{PhoneNumber, Role};

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRegistration {
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PendingRegistrations {
    entries: Arc<RwLock<HashMap<PhoneNumber, PendingRegistration>>>,
    ttl: Duration,
}

impl PendingRegistrations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn record(&self, phone: &PhoneNumber, role: Role, now: DateTime<Utc>) {
        let pending = PendingRegistration {
            role,
            expires_at: now + self.ttl,
        };
        self.entries.write().await.insert(phone.clone(), pending);
    }

    /// Role recorded for `phone`, if still valid
    pub async fn role_for(&self, phone: &PhoneNumber, now: DateTime<Utc>) -> Option<Role> {
        self.entries
            .read()
            .await
            .get(phone)
            .filter(|pending| now < pending.expires_at)
            .map(|pending| pending.role)
    }

    pub async fn clear(&self, phone: &PhoneNumber) {
        self.entries.write().await.remove(phone);
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, pending| now < pending.expires_at);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn role_expires_with_ttl() {
        let pending = PendingRegistrations::new(Duration::minutes(5));
        let phone = PhoneNumber::parse("+998901234567").unwrap();
        let now = Utc::now();

        pending.record(&phone, Role::Master, now).await;
        assert_eq!(pending.role_for(&phone, now).await, Some(Role::Master));
        assert_eq!(
            pending.role_for(&phone, now + Duration::minutes(5)).await,
            None
        );
        assert_eq!(pending.purge_expired(now + Duration::minutes(6)).await, 1);
    }

    #[tokio::test]
    async fn clear_removes_entry() {
        let pending = PendingRegistrations::new(Duration::minutes(5));
        let phone = PhoneNumber::parse("+998901234567").unwrap();
        let now = Utc::now();

        pending.record(&phone, Role::Client, now).await;
        pending.clear(&phone).await;
        assert_eq!(pending.role_for(&phone, now).await, None);
    }
}
