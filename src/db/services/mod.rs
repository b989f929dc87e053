//! Data access for the agenda. Handlers and validators go through these
//! functions (or the [`UserDirectory`] trait) instead of building queries
//! themselves.

pub mod contact_service;
pub mod user_service;

pub use contact_service::*;
pub use user_service::*;
