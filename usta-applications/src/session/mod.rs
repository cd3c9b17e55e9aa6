//! Session management
//!
//! Credential-based login, bearer session issuance, resolution and revocation.

pub mod manager;
pub mod pending;
pub mod token;

pub use manager::{IssuedSession, LoginOutcome, SessionManager};
pub use pending::{PendingRegistration, PendingRegistrations};
pub use token::{generate_token, hash_token};
