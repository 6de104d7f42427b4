use tracing::info;

use crate::models::{CollabError, JoinMessage, RecentChangesEvent, ServerEvent, SessionInfoEvent};
use crate::services::permission_service::ensure_collaboration_permission;
use crate::state::AppState;
use crate::ws::{connctx::ConnCtx, lifecycle};

/// Handle JoinMessage - check access, register in the session, send the
/// joiner the participant list and the recent change log
pub async fn handle_join_message(
    join_msg: &JoinMessage,
    state: &AppState,
    conn: &mut ConnCtx,
) -> Result<(), CollabError> {
    let user_id = conn.require_user()?;
    let book_id = join_msg.book_id;
    info!("Join message received for book {}: user={}, chapter={:?}", book_id, user_id, join_msg.chapter_id);

    let access = ensure_collaboration_permission(state.store.as_ref(), user_id, book_id).await?;

    if conn.book_id.is_some_and(|current| current != book_id) {
        lifecycle::leave_current(state, conn).await;
    }

    let outcome = state
        .registry
        .join(book_id, join_msg.chapter_id, conn.participant(user_id))
        .await;
    conn.book_id = Some(book_id);
    conn.chapter_id = join_msg.chapter_id.or(outcome.chapter_id);
    info!("User {} joined book {} as {:?}", user_id, book_id, access);

    conn.reply(ServerEvent::SessionInfo(SessionInfoEvent {
        book_id,
        chapter_id: outcome.chapter_id,
        users: outcome.others,
    }))
    .await;

    // Registered before the fetch so no change falls between snapshot and
    // live relay. A failed fetch undoes the membership.
    let changes = match state
        .store
        .get_latest_document_changes(book_id, None, state.config.recent_changes_limit())
        .await
    {
        Ok(changes) => changes,
        Err(e) => {
            lifecycle::leave_current(state, conn).await;
            return Err(e.into());
        }
    };
    conn.reply(ServerEvent::RecentChanges(RecentChangesEvent { book_id, changes })).await;

    Ok(())
}
