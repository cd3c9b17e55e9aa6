//! HTTP request handlers for the Usta web server

pub mod auth;
pub mod health;
pub mod profile;
pub mod requests;
pub mod types;

pub use auth::*;
pub use health::*;
pub use profile::*;
pub use requests::*;

pub use types::*;
