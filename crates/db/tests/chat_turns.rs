//! Database tests for the conversation log.

use clair_core::chat::{ChatMessage, ChatRole};
use clair_db::repositories::ChatTurnRepo;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn recent_returns_latest_turns_oldest_first(pool: PgPool) {
    for i in 0..5 {
        ChatTurnRepo::append(&pool, 100, ChatRole::User, &format!("msg {i}"))
            .await
            .unwrap();
    }

    let turns = ChatTurnRepo::recent(&pool, 100, 3).await.unwrap();
    let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["msg 2", "msg 3", "msg 4"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn exchange_is_stored_as_user_then_assistant(pool: PgPool) {
    ChatTurnRepo::append_exchange(&pool, 5, "Hello Clair", "Hello.")
        .await
        .unwrap();

    let messages: Vec<ChatMessage> = ChatTurnRepo::recent(&pool, 5, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.try_into().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![ChatMessage::user("Hello Clair"), ChatMessage::assistant("Hello.")]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn channels_are_isolated(pool: PgPool) {
    ChatTurnRepo::append(&pool, 1, ChatRole::User, "one").await.unwrap();
    ChatTurnRepo::append(&pool, 2, ChatRole::User, "two").await.unwrap();

    let turns = ChatTurnRepo::recent(&pool, 1, 10).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].content, "one");
}
