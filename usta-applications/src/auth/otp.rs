//! One-time code verification
//!
//! Two verifiers share the [`CredentialVerifier`] seam:
//! - [`FixedCodeVerifier`] accepts a single shared development code.
//! - [`OtpVerifier`] issues a random code per phone with an expiry and an
//!   attempt budget, and burns it after one success or too many failures.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use usta_core::{OtpConfig, PhoneNumber, UstaResult};

/// Validates a one-time code against a phone number
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Start a verification for `phone` (generate and deliver a code)
    async fn request_code(&self, phone: &PhoneNumber) -> UstaResult<()>;

    /// Check `code` for `phone`; `Ok(false)` means the code was rejected
    async fn verify(&self, phone: &PhoneNumber, code: &str) -> UstaResult<bool>;

    /// Drop codes that expired before `now`, returning how many went
    async fn purge_expired(&self, _now: DateTime<Utc>) -> usize {
        0
    }
}

/// Delivery channel for generated codes
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, phone: &PhoneNumber, code: &str) -> UstaResult<()>;
}

/// Development sender that writes codes to the log instead of an SMS gateway
#[derive(Debug, Default, Clone)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, phone: &PhoneNumber, code: &str) -> UstaResult<()> {
        info!(phone = %phone, code = %code, "One-time code issued (log delivery)");
        Ok(())
    }
}

fn codes_match(expected: &[u8], provided: &[u8]) -> bool {
    expected.ct_eq(provided).into()
}

/// Accepts exactly one shared code for every phone number
#[derive(Debug, Clone)]
pub struct FixedCodeVerifier {
    code: String,
}

impl FixedCodeVerifier {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
impl CredentialVerifier for FixedCodeVerifier {
    async fn request_code(&self, phone: &PhoneNumber) -> UstaResult<()> {
        debug!(phone = %phone, "Fixed-code verifier: nothing to send");
        Ok(())
    }

    async fn verify(&self, phone: &PhoneNumber, code: &str) -> UstaResult<bool> {
        let ok = codes_match(self.code.as_bytes(), code.trim().as_bytes());
        if !ok {
            debug!(phone = %phone, "Fixed-code verifier rejected code");
        }
        Ok(ok)
    }
}

#[derive(Debug, Clone)]
struct PendingCode {
    code_hash: [u8; 32],
    expires_at: DateTime<Utc>,
    failed_attempts: u32,
}

/// Per-phone generated codes with expiry and attempt limiting
pub struct OtpVerifier {
    codes: Arc<RwLock<HashMap<PhoneNumber, PendingCode>>>,
    sender: Arc<dyn OtpSender>,
    code_length: usize,
    ttl: Duration,
    max_attempts: u32,
}

impl OtpVerifier {
    pub fn new(config: &OtpConfig, sender: Arc<dyn OtpSender>) -> Self {
        Self {
            codes: Arc::new(RwLock::new(HashMap::new())),
            sender,
            code_length: config.code_length,
            ttl: Duration::seconds(config.ttl_seconds),
            max_attempts: config.max_attempts,
        }
    }

    fn generate_code(&self) -> String {
        (0..self.code_length)
            .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
            .collect()
    }

    fn digest(phone: &PhoneNumber, code: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(phone.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(code.as_bytes());
        hasher.finalize().into()
    }

    /// Issue a new code, replacing any outstanding one for the phone
    pub async fn request_code_at(&self, phone: &PhoneNumber, now: DateTime<Utc>) -> UstaResult<()> {
        let code = self.generate_code();
        let pending = PendingCode {
            code_hash: Self::digest(phone, &code),
            expires_at: now + self.ttl,
            failed_attempts: 0,
        };

        self.codes.write().await.insert(phone.clone(), pending);
        self.sender.send(phone, &code).await?;

        info!(phone = %phone, expires_in_s = self.ttl.num_seconds(), "One-time code requested");
        Ok(())
    }

    pub async fn verify_at(
        &self,
        phone: &PhoneNumber,
        code: &str,
        now: DateTime<Utc>,
    ) -> UstaResult<bool> {
        let mut codes = self.codes.write().await;
        let Some(pending) = codes.get_mut(phone) else {
            debug!(phone = %phone, "No outstanding code");
            return Ok(false);
        };

        if now >= pending.expires_at {
            codes.remove(phone);
            debug!(phone = %phone, "Code expired");
            return Ok(false);
        }

        let provided = Self::digest(phone, code.trim());
        if codes_match(&pending.code_hash, &provided) {
            codes.remove(phone);
            return Ok(true);
        }

        pending.failed_attempts += 1;
        if pending.failed_attempts >= self.max_attempts {
            codes.remove(phone);
            warn!(phone = %phone, "Code invalidated after too many failed attempts");
        }
        Ok(false)
    }

    /// Drop expired codes
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|_, pending| now < pending.expires_at);
        before - codes.len()
    }
}

#[async_trait]
impl CredentialVerifier for OtpVerifier {
    async fn request_code(&self, phone: &PhoneNumber) -> UstaResult<()> {
        self.request_code_at(phone, Utc::now()).await
    }

    async fn verify(&self, phone: &PhoneNumber, code: &str) -> UstaResult<bool> {
        self.verify_at(phone, code, Utc::now()).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        OtpVerifier::purge_expired(self, now).await
    }
}

/// Sender that keeps the last code per phone, for tests and local tooling
#[derive(Debug, Default, Clone)]
pub struct MemoryOtpSender {
    sent: Arc<RwLock<HashMap<PhoneNumber, String>>>,
}

impl MemoryOtpSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_code(&self, phone: &PhoneNumber) -> Option<String> {
        self.sent.read().await.get(phone).cloned()
    }
}

#[async_trait]
impl OtpSender for MemoryOtpSender {
    async fn send(&self, phone: &PhoneNumber, code: &str) -> UstaResult<()> {
        self.sent
            .write()
            .await
            .insert(phone.clone(), code.to_string());
        Ok(())
    }
}
