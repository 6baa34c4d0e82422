//! Repository for the append-only `chat_turns` log.

use clair_core::chat::ChatRole;
use clair_core::types::ChannelId;
use sqlx::PgPool;

use crate::models::chat_turn::ChatTurn;

/// Column list for `chat_turns` queries.
const COLUMNS: &str = "id, channel_id, role, content, created_at";

/// Provides append and windowed reads over a channel's conversation.
pub struct ChatTurnRepo;

impl ChatTurnRepo {
    /// Append one turn to a channel's log.
    pub async fn append(
        pool: &PgPool,
        channel_id: ChannelId,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatTurn, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_turns (channel_id, role, content) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatTurn>(&query)
            .bind(channel_id)
            .bind(role.as_str())
            .bind(content)
            .fetch_one(pool)
            .await
    }

    /// Append a user turn and the assistant's reply in one transaction,
    /// so a reader never sees a question without its answer.
    pub async fn append_exchange(
        pool: &PgPool,
        channel_id: ChannelId,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for (role, content) in [
            (ChatRole::User, user_content),
            (ChatRole::Assistant, assistant_content),
        ] {
            sqlx::query("INSERT INTO chat_turns (channel_id, role, content) VALUES ($1, $2, $3)")
                .bind(channel_id)
                .bind(role.as_str())
                .bind(content)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    /// The most recent `limit` turns of a channel, oldest first.
    pub async fn recent(
        pool: &PgPool,
        channel_id: ChannelId,
        limit: i64,
    ) -> Result<Vec<ChatTurn>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ( \
                 SELECT {COLUMNS} FROM chat_turns \
                 WHERE channel_id = $1 \
                 ORDER BY id DESC \
                 LIMIT $2 \
             ) latest \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, ChatTurn>(&query)
            .bind(channel_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
