//! Type definitions for handlers
//!
//! Request and response bodies for every endpoint.

pub mod auth;
pub mod common;
pub mod requests;

pub use auth::*;
pub use common::*;
pub use requests::*;
