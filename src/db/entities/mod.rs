//! SeaORM entities for the agenda tables.

pub mod category;
pub mod contact;
pub mod user;
