//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod chat_turn_repo;
pub mod usage_repo;

pub use chat_turn_repo::ChatTurnRepo;
pub use usage_repo::UsageRepo;
