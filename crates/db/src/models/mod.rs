//! Row types for the persistence tables.

pub mod chat_turn;
pub mod usage;
