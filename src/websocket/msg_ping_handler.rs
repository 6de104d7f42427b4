use chrono::Utc;
use tracing::debug;

use crate::models::{CollabError, PingMessage, PongEvent, ServerEvent};
use crate::ws::connctx::ConnCtx;

/// Handle PingMessage - reply with a pong carrying the server time
pub async fn handle_ping_message(_ping_msg: &PingMessage, conn: &ConnCtx) -> Result<(), CollabError> {
    debug!("Ping message received on connection {}", conn.conn_id);
    conn.reply(ServerEvent::Pong(PongEvent { timestamp: Utc::now() })).await;
    Ok(())
}
