//! Configuration management

use crate::error::{ErrorContext, UstaError, UstaResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration shared by the service crates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UstaConfig {
    pub session: SessionConfig,
    pub otp: OtpConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Absolute session lifetime in days
    pub ttl_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_days: 30 }
    }
}

/// How one-time codes are produced and checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpMode {
    /// Single shared development code, no storage
    Fixed,
    /// Per-phone random codes with expiry and attempt limits
    Generated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    pub mode: OtpMode,
    pub fixed_code: String,
    pub code_length: usize,
    pub ttl_seconds: i64,
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            mode: OtpMode::Generated,
            fixed_code: "123456".to_string(),
            code_length: 6,
            ttl_seconds: 300,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

/// Upper bounds keep expiry arithmetic far from `DateTime` overflow
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;
pub const MAX_OTP_TTL_SECONDS: i64 = 86_400;

fn config_error(message: String, operation: &str) -> UstaError {
    UstaError::InvalidInput {
        message,
        field: None,
        context: ErrorContext::new("config").with_operation(operation),
    }
}

impl UstaConfig {
    /// Validate configuration
    pub fn validate(&self) -> UstaResult<()> {
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&self.session.ttl_days) {
            return Err(config_error(
                format!(
                    "session.ttl_days must be between 1 and {}",
                    MAX_SESSION_TTL_DAYS
                ),
                "validate",
            ));
        }

        let otp = &self.otp;
        if !(4..=10).contains(&otp.code_length) {
            return Err(config_error(
                "otp.code_length must be between 4 and 10".to_string(),
                "validate",
            ));
        }
        if !(1..=MAX_OTP_TTL_SECONDS).contains(&otp.ttl_seconds) {
            return Err(config_error(
                format!(
                    "otp.ttl_seconds must be between 1 and {}",
                    MAX_OTP_TTL_SECONDS
                ),
                "validate",
            ));
        }
        if otp.max_attempts == 0 {
            return Err(config_error(
                "otp.max_attempts must be greater than 0".to_string(),
                "validate",
            ));
        }
        if otp.mode == OtpMode::Fixed
            && (otp.fixed_code.len() != otp.code_length
                || !otp.fixed_code.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(config_error(
                format!(
                    "otp.fixed_code must be {} digits when otp.mode = \"fixed\"",
                    otp.code_length
                ),
                "validate",
            ));
        }

        if self.database.url.is_empty() {
            return Err(config_error(
                "database.url must not be empty".to_string(),
                "validate",
            ));
        }

        Ok(())
    }
}
