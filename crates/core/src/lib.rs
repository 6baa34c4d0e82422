//! Domain types and pure policy for the Clair accelerator arbiter.
//!
//! Everything here is synchronous and side-effect free so it can be
//! shared by the store, backend, worker, and API crates without pulling
//! any of them in.

pub mod accelerator;
pub mod chat;
pub mod env;
pub mod error;
pub mod job;
pub mod prompt;
pub mod quota;
pub mod reply;
pub mod safety;
pub mod types;
