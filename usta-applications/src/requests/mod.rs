//! Service requests between clients and masters

pub mod engine;
pub mod lifecycle;

pub use engine::{RequestEngine, MAX_MESSAGE_CHARS};
pub use lifecycle::{check_transition, TRANSITIONS};
