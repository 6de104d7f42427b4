pub mod handler;
pub mod msg_auth_handler;
pub mod msg_change_handler;
pub mod msg_chat_handler;
pub mod msg_cursor_handler;
pub mod msg_join_handler;
pub mod msg_leave_handler;
pub mod msg_ping_handler;

use tracing::{error, warn};

use crate::models::{ClientMessage, CollabError, ServerEvent};
use crate::state::AppState;
use crate::ws::connctx::ConnCtx;
use msg_auth_handler::handle_auth_message;
use msg_change_handler::handle_change_message;
use msg_chat_handler::handle_chat_message;
use msg_cursor_handler::handle_cursor_message;
use msg_join_handler::handle_join_message;
use msg_leave_handler::handle_leave_message;
use msg_ping_handler::handle_ping_message;

/// Handle one inbound text frame. Failures end here: they are logged and
/// reported to the sender, never propagated to the socket loop.
pub async fn handle_text_frame(state: &AppState, conn: &mut ConnCtx, text: &str) {
    match ClientMessage::parse_for(text, conn.user_id.is_some()) {
        Ok(Some(msg)) => handle_client_message(state, conn, msg).await,
        Ok(None) => {}
        Err(e) => {
            warn!("Rejected frame on connection {}: {}", conn.conn_id, e);
            conn.reply(ServerEvent::error(&e)).await;
        }
    }
}

pub async fn handle_client_message(state: &AppState, conn: &mut ConnCtx, msg: ClientMessage) {
    let msg_type = msg.type_name();

    let result = match &msg {
        ClientMessage::Auth(auth_msg) => handle_auth_message(auth_msg, state, conn).await,
        ClientMessage::Ping(ping_msg) => handle_ping_message(ping_msg, conn).await,
        _ if conn.user_id.is_none() => Err(CollabError::AuthenticationRequired),
        ClientMessage::Join(join_msg) => handle_join_message(join_msg, state, conn).await,
        ClientMessage::Leave(leave_msg) => handle_leave_message(leave_msg, state, conn).await,
        ClientMessage::Change(change_msg) => handle_change_message(change_msg, state, conn).await,
        ClientMessage::CursorMove(cursor_msg) => handle_cursor_message(cursor_msg, state, conn).await,
        ClientMessage::ChatMessage(chat_msg) => handle_chat_message(chat_msg, state, conn).await,
    };

    if let Err(e) = result {
        match &e {
            CollabError::Storage(inner) => error!(
                "Storage failure handling '{}' on connection {} (user={:?}, book={:?}): {}",
                msg_type, conn.conn_id, conn.user_id, conn.book_id, inner
            ),
            _ => warn!(
                "Failed to handle '{}' on connection {} (user={:?}, book={:?}): {}",
                msg_type, conn.conn_id, conn.user_id, conn.book_id, e
            ),
        }
        conn.reply(ServerEvent::error(&e)).await;
    }
}
