use tracing::info;

use crate::models::{CollabError, LeaveMessage};
use crate::state::AppState;
use crate::ws::{connctx::ConnCtx, lifecycle};

/// Handle LeaveMessage
pub async fn handle_leave_message(
    leave_msg: &LeaveMessage,
    state: &AppState,
    conn: &mut ConnCtx,
) -> Result<(), CollabError> {
    let (user_id, book_id) = conn.require_joined()?;
    if leave_msg.book_id.is_some_and(|requested| requested != book_id) {
        return Err(CollabError::NotJoined);
    }

    let outcome = lifecycle::leave_current(state, conn).await;
    info!(
        "User {} left book {} (session_closed={}, remaining={})",
        user_id, book_id, outcome.session_closed, outcome.remaining
    );
    Ok(())
}
