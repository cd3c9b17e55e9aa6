//! Core data type definitions

use crate::error::{UstaError, UstaResult};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Current time at the microsecond precision every backend stores
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Account role, fixed at creation
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Master,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Master => "master",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "master" => Ok(Role::Master),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Lifecycle status of a service request
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    Accepted,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 6] = [
        RequestStatus::New,
        RequestStatus::Accepted,
        RequestStatus::Rejected,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "new",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses are never left once entered
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Completed | RequestStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown request status: {}", s))
    }
}

/// Normalized phone number, always stored as `+<digits>`
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse user input, dropping spaces, dashes and parentheses
    pub fn parse(input: &str) -> UstaResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UstaError::invalid_input(
                "phone is required",
                "phone",
                "identity",
            ));
        }

        let compact: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        let digits = compact.strip_prefix('+').unwrap_or(&compact);

        if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(UstaError::invalid_input(
                format!("'{}' is not a valid phone number", trimmed),
                "phone",
                "identity",
            ));
        }

        Ok(Self(format!("+{}", digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered marketplace account
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub phone: PhoneNumber,
    pub role: Role,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Derived completion flag: masters need a profession, everyone else a name
    pub fn profile_complete(&self, profile: Option<&MasterProfile>) -> bool {
        match self.role {
            Role::Master => profile.is_some_and(|p| p.profession.is_some()),
            Role::Client | Role::Admin => self.name.is_some(),
        }
    }
}

/// Input for account creation
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub phone: PhoneNumber,
    pub role: Role,
    pub name: Option<String>,
}

/// Result of an idempotent account creation
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Account),
    Existing(Account),
}

impl CreateOutcome {
    pub fn into_account(self) -> Account {
        match self {
            CreateOutcome::Created(account) | CreateOutcome::Existing(account) => account,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Public profile of a tradesperson, one per master account
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    /// `None` until the master completes onboarding
    pub profession: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<u32>,
    pub rating: f64,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MasterProfile {
    /// Fresh profile created together with a master account
    pub fn unset(account_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            profession: None,
            region: None,
            city: None,
            bio: None,
            experience_years: None,
            rating: 0.0,
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: &MasterProfileUpdate, now: DateTime<Utc>) {
        if let Some(profession) = &update.profession {
            self.profession = Some(profession.clone());
        }
        if let Some(region) = &update.region {
            self.region = Some(region.clone());
        }
        if let Some(city) = &update.city {
            self.city = Some(city.clone());
        }
        if let Some(bio) = &update.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(years) = update.experience_years {
            self.experience_years = Some(years);
        }
        self.updated_at = now;
    }
}

/// Master-only fields of a profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterProfileUpdate {
    pub profession: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<u32>,
}

impl MasterProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Exact-match filter for the master directory
#[derive(Debug, Clone, Default)]
pub struct MasterFilter {
    pub profession: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl MasterFilter {
    pub fn matches(&self, profile: &MasterProfile) -> bool {
        fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
            match wanted {
                Some(wanted) => actual
                    .as_deref()
                    .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
                None => true,
            }
        }

        field_matches(&self.profession, &profile.profession)
            && field_matches(&self.region, &profile.region)
            && field_matches(&self.city, &profile.city)
    }
}

/// Persisted bearer session; only the token digest is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token_hash: String,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A unit of work proposed by a client to a master
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Target master profile (not the master's account id)
    pub master_id: Uuid,
    pub message: String,
    pub status: RequestStatus,
    /// Incremented on every status change
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn new(client_id: Uuid, master_id: Uuid, message: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            master_id,
            message,
            status: RequestStatus::New,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn phone_is_normalized() {
        let phone = PhoneNumber::parse(" +998 (90) 123-45-67 ").unwrap();
        assert_eq!(phone.as_str(), "+998901234567");
    }

    #[test]
    fn timestamps_keep_microseconds() {
        let now = timestamp_now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn phone_without_plus_is_canonical() {
        let bare = PhoneNumber::parse("998901234567").unwrap();
        let plus = PhoneNumber::parse("+998901234567").unwrap();
        assert_eq!(bare, plus);
        assert_eq!(bare.as_str(), "+998901234567");
    }

    #[test]
    fn phone_rejects_garbage() {
        for input in ["", "   ", "+12", "abc1234567", "+99890123456789012"] {
            let err = PhoneNumber::parse(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "input {:?}", input);
            assert_eq!(err.field(), Some("phone"));
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
        assert!("done".parse::<RequestStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&RequestStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = RequestStatus::ALL
            .into_iter()
            .filter(RequestStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![
                RequestStatus::Rejected,
                RequestStatus::Completed,
                RequestStatus::Cancelled
            ]
        );
    }

    #[test]
    fn profile_completion_depends_on_role() {
        let now = Utc::now();
        let mut client = Account {
            id: Uuid::new_v4(),
            phone: PhoneNumber::parse("+998901111111").unwrap(),
            role: Role::Client,
            name: None,
            created_at: now,
        };
        assert!(!client.profile_complete(None));
        client.name = Some("Aziz".into());
        assert!(client.profile_complete(None));

        let master = Account {
            role: Role::Master,
            name: Some("Bobur".into()),
            ..client.clone()
        };
        let mut profile = MasterProfile::unset(master.id, now);
        assert!(!master.profile_complete(Some(&profile)));
        profile.profession = Some("plumber".into());
        assert!(master.profile_complete(Some(&profile)));
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let mut profile = MasterProfile::unset(Uuid::new_v4(), Utc::now());
        profile.profession = Some("Electrician".into());
        profile.city = Some("Tashkent".into());

        let filter = MasterFilter {
            profession: Some("electrician".into()),
            ..Default::default()
        };
        assert!(filter.matches(&profile));

        let filter = MasterFilter {
            city: Some("Samarkand".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&profile));
    }
}
