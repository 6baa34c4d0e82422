use clair_core::chat::{ChatMessage, ChatRole};
use clair_core::error::CoreError;
use clair_core::types::{ChannelId, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `chat_turns` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatTurn {
    pub id: DbId,
    pub channel_id: ChannelId,
    pub role: String,
    pub content: String,
    pub created_at: Timestamp,
}

impl TryFrom<ChatTurn> for ChatMessage {
    type Error = CoreError;

    fn try_from(turn: ChatTurn) -> Result<Self, Self::Error> {
        let role: ChatRole = turn.role.parse()?;
        Ok(ChatMessage {
            role,
            content: turn.content,
        })
    }
}
