use chrono::Utc;
use tracing::debug;

use crate::models::{ChatMessage, ChatMessageEvent, CollabError, ServerEvent};
use crate::state::AppState;
use crate::ws::connctx::ConnCtx;

/// Handle ChatMessage - relay to every participant, the sender included
pub async fn handle_chat_message(
    chat_msg: &ChatMessage,
    state: &AppState,
    conn: &ConnCtx,
) -> Result<(), CollabError> {
    let (user_id, book_id) = conn.require_joined()?;
    if chat_msg.book_id.is_some_and(|requested| requested != book_id) {
        return Err(CollabError::NotJoined);
    }
    if chat_msg.data.message.trim().is_empty() {
        return Err(CollabError::InvalidMessage("chat message is empty".to_string()));
    }
    debug!("Chat message from user {} in book {}", user_id, book_id);

    let event = ServerEvent::ChatMessage(ChatMessageEvent {
        user_id,
        message: chat_msg.data.message.clone(),
        timestamp: Utc::now(),
    });
    state.registry.broadcast(book_id, &event, None).await;
    Ok(())
}
