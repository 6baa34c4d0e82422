//! Persistence seams for quota counters and conversation context.
//!
//! Both have a PostgreSQL implementation for deployments and an
//! in-process implementation for single-node runs and tests.

mod memory;
mod postgres;

pub use memory::{MemoryContextStore, MemoryQuotaStore};
pub use postgres::{PgContextStore, PgQuotaStore};

use async_trait::async_trait;
use chrono::NaiveDate;
use clair_core::chat::ChatMessage;
use clair_core::job::JobKind;
use clair_core::types::{ChannelId, UserId};

/// The backing store could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("Corrupt stored record: {0}")]
    Corrupt(String),
}

/// Atomic per-(user, day, kind) counters.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Increment the counter if it is below `limit` and return the new
    /// value; return `None` (and write nothing) if it is already at the
    /// limit. Check and increment must be indivisible.
    async fn check_and_increment(
        &self,
        user_id: UserId,
        day: NaiveDate,
        kind: JobKind,
        limit: i32,
    ) -> Result<Option<i32>, StoreError>;
}

/// Bounded per-channel conversation history.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Up to `limit` most recent turns, oldest first.
    async fn recent(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Record a completed question/answer pair.
    async fn append_exchange(
        &self,
        channel_id: ChannelId,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), StoreError>;
}
