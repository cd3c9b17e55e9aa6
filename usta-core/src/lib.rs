//! Usta Core - Core data structures and trait definitions
//!
//! Domain types, the error taxonomy, configuration and storage traits shared
//! by the marketplace service crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
