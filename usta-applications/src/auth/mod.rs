//! Authentication and Authorization Module
//!
//! - One-time code verification (fixed development code or generated codes)
//! - Account identity projection
//! - The authorization gate deciding who may act on a service request

pub mod gate;
pub mod identity;
pub mod otp;

pub use gate::{AuthorizationGate, RequestAction, RequestParty};
pub use identity::AccountView;
pub use otp::{
    CredentialVerifier, FixedCodeVerifier, LogOtpSender, MemoryOtpSender, OtpSender, OtpVerifier,
};
