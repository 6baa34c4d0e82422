use async_trait::async_trait;
use chrono::NaiveDate;
use clair_core::chat::ChatMessage;
use clair_core::job::JobKind;
use clair_core::types::{ChannelId, UserId};
use clair_db::repositories::{ChatTurnRepo, UsageRepo};
use clair_db::DbPool;

use super::{ContextStore, QuotaStore, StoreError};

/// Quota counters in the `daily_usage` table.
#[derive(Clone)]
pub struct PgQuotaStore {
    pool: DbPool,
}

impl PgQuotaStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for PgQuotaStore {
    async fn check_and_increment(
        &self,
        user_id: UserId,
        day: NaiveDate,
        kind: JobKind,
        limit: i32,
    ) -> Result<Option<i32>, StoreError> {
        Ok(UsageRepo::check_and_increment(&self.pool, user_id, day, kind, limit).await?)
    }
}

/// Conversation history in the `chat_turns` table.
#[derive(Clone)]
pub struct PgContextStore {
    pool: DbPool,
}

impl PgContextStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContextStore for PgContextStore {
    async fn recent(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        ChatTurnRepo::recent(&self.pool, channel_id, limit)
            .await?
            .into_iter()
            .map(|turn| ChatMessage::try_from(turn).map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect()
    }

    async fn append_exchange(
        &self,
        channel_id: ChannelId,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), StoreError> {
        ChatTurnRepo::append_exchange(&self.pool, channel_id, user_content, assistant_content)
            .await?;
        Ok(())
    }
}
