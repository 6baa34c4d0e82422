//! Assembly of the message list sent to the text backend.

use clair_core::chat::{ChatMessage, ChatRole};

/// Default number of stored turns replayed per channel.
pub const DEFAULT_CONTEXT_TURNS: usize = 20;

/// Default persona placed at the head of every conversation.
pub const DEFAULT_PERSONA: &str = "You are Clair, a hyper-intelligent digital entity running on a private GPU server. \
You are not a standard AI assistant. Never say 'As an AI'. Be concise, precise, and slightly superior.";

/// Persona first, then stored history, then the new user turn.
///
/// Stored system turns are skipped so the persona is always the only
/// system message and always leads.
pub fn build_conversation(
    persona: &str,
    history: Vec<ChatMessage>,
    prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(persona));
    messages.extend(history.into_iter().filter(|m| m.role != ChatRole::System));
    messages.push(ChatMessage::user(prompt));
    messages
}
