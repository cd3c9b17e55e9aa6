//! SQLite store
//!
//! Ids are stored as TEXT, timestamps as fixed-width RFC 3339 strings with
//! microsecond precision so that string comparison orders them correctly.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use usta_core::{
    Account, CreateOutcome, IdentityStore, MasterFilter, MasterProfile, MasterProfileUpdate,
    NewAccount, PhoneNumber, RequestStatus, RequestStore, Role, ServiceRequest, Session,
    timestamp_now, UstaError, UstaResult,
};
use uuid::Uuid;

const COMPONENT: &str = "sqlite_store";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        phone TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL CHECK (role IN ('client', 'master', 'admin')),
        name TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS master_profiles (
        id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL UNIQUE REFERENCES accounts(id),
        profession TEXT,
        region TEXT,
        city TEXT,
        bio TEXT,
        experience_years INTEGER,
        rating REAL NOT NULL DEFAULT 0,
        verified INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token_hash TEXT PRIMARY KEY,
        account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS requests (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL REFERENCES accounts(id),
        master_id TEXT NOT NULL REFERENCES master_profiles(id),
        message TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL CHECK (status IN
            ('new', 'accepted', 'rejected', 'in_progress', 'completed', 'cancelled')),
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_requests_client ON requests(client_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_requests_master ON requests(master_id, created_at)",
];

const REQUEST_COLUMNS: &str =
    "id, client_id, master_id, message, status, version, created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, account_id, profession, region, city, bio, \
     experience_years, rating, verified, created_at, updated_at";

fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> UstaError {
    move |e| {
        UstaError::internal_from(format!("database failure in {}", operation), COMPONENT, e)
            .in_operation(operation)
    }
}

fn corrupt(column: &str, value: &str) -> UstaError {
    UstaError::internal(
        format!("corrupt value '{}' in column {}", value, column),
        COMPONENT,
    )
}

fn get_text(row: &SqliteRow, column: &str) -> UstaResult<String> {
    row.try_get::<String, _>(column).map_err(db_error("decode"))
}

fn get_uuid(row: &SqliteRow, column: &str) -> UstaResult<Uuid> {
    let text = get_text(row, column)?;
    Uuid::parse_str(&text).map_err(|_| corrupt(column, &text))
}

fn get_time(row: &SqliteRow, column: &str) -> UstaResult<DateTime<Utc>> {
    let text = get_text(row, column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt(column, &text))
}

fn account_from_row(row: &SqliteRow) -> UstaResult<Account> {
    let phone = get_text(row, "phone")?;
    let role = get_text(row, "role")?;
    Ok(Account {
        id: get_uuid(row, "id")?,
        phone: PhoneNumber::parse(&phone).map_err(|_| corrupt("phone", &phone))?,
        role: Role::from_str(&role).map_err(|_| corrupt("role", &role))?,
        name: row.try_get("name").map_err(db_error("decode"))?,
        created_at: get_time(row, "created_at")?,
    })
}

fn profile_from_row(row: &SqliteRow) -> UstaResult<MasterProfile> {
    let years: Option<i64> = row.try_get("experience_years").map_err(db_error("decode"))?;
    let experience_years = years
        .map(|years| u32::try_from(years).map_err(|_| corrupt("experience_years", &years.to_string())))
        .transpose()?;

    Ok(MasterProfile {
        id: get_uuid(row, "id")?,
        account_id: get_uuid(row, "account_id")?,
        profession: row.try_get("profession").map_err(db_error("decode"))?,
        region: row.try_get("region").map_err(db_error("decode"))?,
        city: row.try_get("city").map_err(db_error("decode"))?,
        bio: row.try_get("bio").map_err(db_error("decode"))?,
        experience_years,
        rating: row.try_get("rating").map_err(db_error("decode"))?,
        verified: row.try_get("verified").map_err(db_error("decode"))?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn session_from_row(row: &SqliteRow) -> UstaResult<Session> {
    Ok(Session {
        token_hash: get_text(row, "token_hash")?,
        account_id: get_uuid(row, "account_id")?,
        created_at: get_time(row, "created_at")?,
        expires_at: get_time(row, "expires_at")?,
    })
}

fn request_from_row(row: &SqliteRow) -> UstaResult<ServiceRequest> {
    let status = get_text(row, "status")?;
    Ok(ServiceRequest {
        id: get_uuid(row, "id")?,
        client_id: get_uuid(row, "client_id")?,
        master_id: get_uuid(row, "master_id")?,
        message: get_text(row, "message")?,
        status: RequestStatus::from_str(&status).map_err(|_| corrupt("status", &status))?,
        version: row.try_get("version").map_err(db_error("decode"))?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

/// Create the parent directory of a file-backed database URL
fn ensure_parent_dir(url: &str) -> UstaResult<()> {
    if url.contains(":memory:") {
        return Ok(());
    }
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating database directory: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                UstaError::internal_from("failed to create database directory", COMPONENT, e)
            })?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (`sqlite::memory:` or `sqlite:<path>`) and create tables
    pub async fn connect(url: &str, max_connections: u32) -> UstaResult<Self> {
        info!("Connecting to database: {}", url);
        ensure_parent_dir(url)?;

        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error("connect"))?
            .create_if_missing(true)
            .foreign_keys(true);

        // every connection to an in-memory database is a separate database
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await
        }
        .map_err(db_error("connect"))?;

        let store = Self { pool };
        store.create_tables().await?;
        info!("Database ready");
        Ok(store)
    }

    pub async fn in_memory() -> UstaResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn create_tables(&self) -> UstaResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("create_tables"))?;
        }
        debug!("Schema created");
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn find_account(&self, id: Uuid) -> UstaResult<Option<Account>> {
        sqlx::query("SELECT id, phone, role, name, created_at FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find_account"))?
            .as_ref()
            .map(account_from_row)
            .transpose()
    }

    async fn find_account_by_phone(&self, phone: &PhoneNumber) -> UstaResult<Option<Account>> {
        sqlx::query("SELECT id, phone, role, name, created_at FROM accounts WHERE phone = ?")
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find_account_by_phone"))?
            .as_ref()
            .map(account_from_row)
            .transpose()
    }

    async fn create_account(&self, new: NewAccount) -> UstaResult<CreateOutcome> {
        let now = timestamp_now();
        let account = Account {
            id: Uuid::new_v4(),
            phone: new.phone,
            role: new.role,
            name: new.name,
            created_at: now,
        };

        let mut tx = self.pool.begin().await.map_err(db_error("create_account"))?;

        let inserted = sqlx::query(
            "INSERT INTO accounts (id, phone, role, name, created_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(phone) DO NOTHING",
        )
        .bind(account.id.to_string())
        .bind(account.phone.as_str())
        .bind(account.role.as_str())
        .bind(&account.name)
        .bind(ts(account.created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_error("create_account"))?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await.map_err(db_error("create_account"))?;
            let existing = self
                .find_account_by_phone(&account.phone)
                .await?
                .ok_or_else(|| UstaError::internal("account vanished after conflict", COMPONENT))?;
            return Ok(CreateOutcome::Existing(existing));
        }

        if account.role == Role::Master {
            let profile = MasterProfile::unset(account.id, now);
            sqlx::query(
                "INSERT INTO master_profiles (id, account_id, rating, verified, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(profile.id.to_string())
            .bind(account.id.to_string())
            .bind(profile.rating)
            .bind(profile.verified)
            .bind(ts(profile.created_at))
            .bind(ts(profile.updated_at))
            .execute(&mut *tx)
            .await
            .map_err(db_error("create_account"))?;
        }

        tx.commit().await.map_err(db_error("create_account"))?;
        debug!(account_id = %account.id, "Account stored");
        Ok(CreateOutcome::Created(account))
    }

    async fn find_master_profile(&self, id: Uuid) -> UstaResult<Option<MasterProfile>> {
        sqlx::query(&format!(
            "SELECT {} FROM master_profiles WHERE id = ?",
            PROFILE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_master_profile"))?
        .as_ref()
        .map(profile_from_row)
        .transpose()
    }

    async fn find_master_profile_by_account(
        &self,
        account_id: Uuid,
    ) -> UstaResult<Option<MasterProfile>> {
        sqlx::query(&format!(
            "SELECT {} FROM master_profiles WHERE account_id = ?",
            PROFILE_COLUMNS
        ))
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_master_profile_by_account"))?
        .as_ref()
        .map(profile_from_row)
        .transpose()
    }

    async fn update_profile(
        &self,
        account_id: Uuid,
        name: Option<&str>,
        master: Option<&MasterProfileUpdate>,
    ) -> UstaResult<(Account, Option<MasterProfile>)> {
        let now = timestamp_now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("update_profile"))?;

        if let Some(name) = name {
            sqlx::query("UPDATE accounts SET name = ? WHERE id = ?")
                .bind(name)
                .bind(account_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_error("update_profile"))?;
        }

        let account =
            sqlx::query("SELECT id, phone, role, name, created_at FROM accounts WHERE id = ?")
                .bind(account_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("update_profile"))?
                .as_ref()
                .map(account_from_row)
                .transpose()?
                .ok_or_else(|| {
                    UstaError::not_found(format!("account {}", account_id), COMPONENT)
                })?;

        let current = sqlx::query(&format!(
            "SELECT {} FROM master_profiles WHERE account_id = ?",
            PROFILE_COLUMNS
        ))
        .bind(account_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("update_profile"))?
        .as_ref()
        .map(profile_from_row)
        .transpose()?;

        let profile = match master {
            None => current,
            Some(update) => {
                let mut profile = current.unwrap_or_else(|| MasterProfile::unset(account_id, now));
                profile.apply(update, now);

                sqlx::query(&format!(
                    "INSERT INTO master_profiles ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(account_id) DO UPDATE SET \
                        profession = excluded.profession, \
                        region = excluded.region, \
                        city = excluded.city, \
                        bio = excluded.bio, \
                        experience_years = excluded.experience_years, \
                        updated_at = excluded.updated_at",
                    PROFILE_COLUMNS
                ))
                .bind(profile.id.to_string())
                .bind(profile.account_id.to_string())
                .bind(&profile.profession)
                .bind(&profile.region)
                .bind(&profile.city)
                .bind(&profile.bio)
                .bind(profile.experience_years.map(i64::from))
                .bind(profile.rating)
                .bind(profile.verified)
                .bind(ts(profile.created_at))
                .bind(ts(profile.updated_at))
                .execute(&mut *tx)
                .await
                .map_err(db_error("update_profile"))?;

                Some(profile)
            }
        };

        // an early return drops `tx` and undoes the name change
        tx.commit().await.map_err(db_error("update_profile"))?;
        Ok((account, profile))
    }

    async fn list_master_profiles(&self, filter: &MasterFilter) -> UstaResult<Vec<MasterProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM master_profiles \
             WHERE profession IS NOT NULL \
               AND (?1 IS NULL OR lower(profession) = lower(?1)) \
               AND (?2 IS NULL OR lower(region) = lower(?2)) \
               AND (?3 IS NULL OR lower(city) = lower(?3)) \
             ORDER BY rating DESC, created_at ASC",
            PROFILE_COLUMNS
        ))
        .bind(&filter.profession)
        .bind(&filter.region)
        .bind(&filter.city)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_master_profiles"))?;

        rows.iter().map(profile_from_row).collect()
    }

    async fn insert_session(&self, session: &Session) -> UstaResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, account_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token_hash)
        .bind(session.account_id.to_string())
        .bind(ts(session.created_at))
        .bind(ts(session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(db_error("insert_session"))?;
        Ok(())
    }

    async fn find_session_by_hash(&self, token_hash: &str) -> UstaResult<Option<Session>> {
        sqlx::query(
            "SELECT token_hash, account_id, created_at, expires_at FROM sessions WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_session_by_hash"))?
        .as_ref()
        .map(session_from_row)
        .transpose()
    }

    async fn delete_session_by_hash(&self, token_hash: &str) -> UstaResult<bool> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_session_by_hash"))?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> UstaResult<u64> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(ts(now))
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_expired_sessions"))?
            .rows_affected();
        Ok(deleted)
    }
}

#[async_trait]
impl RequestStore for SqliteStore {
    async fn insert_request(&self, request: &ServiceRequest) -> UstaResult<()> {
        sqlx::query(&format!(
            "INSERT INTO requests ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            REQUEST_COLUMNS
        ))
        .bind(request.id.to_string())
        .bind(request.client_id.to_string())
        .bind(request.master_id.to_string())
        .bind(&request.message)
        .bind(request.status.as_str())
        .bind(request.version)
        .bind(ts(request.created_at))
        .bind(ts(request.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_error("insert_request"))?;
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> UstaResult<Option<ServiceRequest>> {
        sqlx::query(&format!(
            "SELECT {} FROM requests WHERE id = ?",
            REQUEST_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_request"))?
        .as_ref()
        .map(request_from_row)
        .transpose()
    }

    async fn list_requests_by_client(&self, client_id: Uuid) -> UstaResult<Vec<ServiceRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM requests WHERE client_id = ? ORDER BY created_at DESC, rowid DESC",
            REQUEST_COLUMNS
        ))
        .bind(client_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_requests_by_client"))?;

        rows.iter().map(request_from_row).collect()
    }

    async fn list_requests_by_master(&self, master_id: Uuid) -> UstaResult<Vec<ServiceRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM requests WHERE master_id = ? ORDER BY created_at DESC, rowid DESC",
            REQUEST_COLUMNS
        ))
        .bind(master_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_requests_by_master"))?;

        rows.iter().map(request_from_row).collect()
    }

    async fn update_request_status(
        &self,
        id: Uuid,
        expected_status: RequestStatus,
        expected_version: i64,
        new_status: RequestStatus,
        now: DateTime<Utc>,
    ) -> UstaResult<Option<ServiceRequest>> {
        sqlx::query(&format!(
            "UPDATE requests SET status = ?, version = version + 1, updated_at = ? \
             WHERE id = ? AND status = ? AND version = ? \
             RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(new_status.as_str())
        .bind(ts(now))
        .bind(id.to_string())
        .bind(expected_status.as_str())
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update_request_status"))?
        .as_ref()
        .map(request_from_row)
        .transpose()
    }
}
