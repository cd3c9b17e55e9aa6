//! Storage backends for [`usta_core::IdentityStore`] and [`usta_core::RequestStore`]

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
