use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::registry::{CollabSession, ConnSender};
use crate::models::ServerEvent;

/// Push an event onto one connection's outbound queue without waiting.
///
/// Returns `false` when the queue is full or the connection is gone. Nothing
/// is retried or buffered beyond the queue itself.
pub fn try_deliver(tx: &ConnSender, event: ServerEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            warn!("Outbound queue full, dropping '{}' event", event.type_name());
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Fan an event out to every participant of a session, optionally skipping
/// one user. Delivery is best-effort and unordered across participants.
///
/// Returns the number of participants the event was queued for.
pub fn deliver(session: &CollabSession, event: &ServerEvent, exclude_user_id: Option<i32>) -> usize {
    let mut delivered = 0;
    for participant in session.participants() {
        if Some(participant.user_id) == exclude_user_id {
            continue;
        }
        if participant.tx.is_closed() {
            debug!(
                "Skipping closed channel of user {} in book {}",
                participant.user_id, session.book_id
            );
            continue;
        }
        if try_deliver(&participant.tx, event.clone()) {
            delivered += 1;
        }
    }
    debug!(
        "Broadcast '{}' to {} participant(s) of book {}",
        event.type_name(),
        delivered,
        session.book_id
    );
    delivered
}
