use chrono::Utc;
use tracing::trace;

use crate::models::{CollabError, CursorMoveEvent, CursorMoveMessage, ServerEvent};
use crate::state::AppState;
use crate::ws::connctx::ConnCtx;

/// Handle CursorMoveMessage - relay only, nothing is stored
pub async fn handle_cursor_message(
    cursor_msg: &CursorMoveMessage,
    state: &AppState,
    conn: &ConnCtx,
) -> Result<(), CollabError> {
    let (user_id, book_id) = conn.require_joined()?;
    if cursor_msg.book_id.is_some_and(|requested| requested != book_id) {
        return Err(CollabError::NotJoined);
    }
    trace!("Cursor of user {} in book {} moved to {}", user_id, book_id, cursor_msg.data.position);

    let event = ServerEvent::CursorMove(CursorMoveEvent {
        user_id,
        position: cursor_msg.data.position.clone(),
        timestamp: Utc::now(),
    });
    state.registry.broadcast(book_id, &event, Some(user_id)).await;
    Ok(())
}
