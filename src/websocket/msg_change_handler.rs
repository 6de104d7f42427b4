use tracing::info;

use crate::models::{ChangeEvent, ChangeMessage, CollabError, ServerEvent};
use crate::state::AppState;
use crate::ws::connctx::ConnCtx;

/// Handle ChangeMessage - persist the edit, then relay it to everyone but
/// its author
pub async fn handle_change_message(
    change_msg: &ChangeMessage,
    state: &AppState,
    conn: &ConnCtx,
) -> Result<(), CollabError> {
    let (user_id, book_id) = conn.require_joined()?;
    if change_msg.book_id.is_some_and(|requested| requested != book_id) {
        return Err(CollabError::NotJoined);
    }

    let mut new_change = change_msg
        .data
        .clone()
        .into_new_change(book_id, change_msg.chapter_id, user_id)
        .map_err(CollabError::InvalidChange)?;
    if new_change.chapter_id.is_none() {
        new_change.chapter_id = conn.chapter_id;
    }

    let saved = state.store.create_document_change(new_change).await?;
    info!(
        "Change {} ({}) by user {} saved for book {}",
        saved.id,
        saved.change_type.as_str(),
        user_id,
        book_id
    );

    let event = ServerEvent::Change(ChangeEvent {
        user_id,
        timestamp: saved.timestamp,
        data: saved,
    });
    state.registry.broadcast(book_id, &event, Some(user_id)).await;
    Ok(())
}
