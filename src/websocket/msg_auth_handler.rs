use tracing::info;

use crate::models::{AuthMessage, AuthSuccessEvent, CollabError, ServerEvent};
use crate::state::AppState;
use crate::ws::{connctx::ConnCtx, lifecycle};

/// Handle AuthMessage
pub async fn handle_auth_message(
    auth_msg: &AuthMessage,
    state: &AppState,
    conn: &mut ConnCtx,
) -> Result<(), CollabError> {
    info!("Auth message received on connection {}: user={}", conn.conn_id, auth_msg.user_id);

    let user = lifecycle::bind_user(state, conn, auth_msg.user_id).await?;
    conn.reply(ServerEvent::AuthSuccess(AuthSuccessEvent { user_id: user.id })).await;
    Ok(())
}
