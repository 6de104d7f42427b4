use tracing::{info, warn};

use super::connctx::ConnCtx;
use super::registry::LeaveOutcome;
use crate::models::{CollabError, User};
use crate::state::AppState;

/// Resolve `user_id` and bind it to the connection.
///
/// A failed lookup leaves the connection exactly as it was. Switching to a
/// different identity first leaves the session joined under the old one.
pub async fn bind_user(state: &AppState, conn: &mut ConnCtx, user_id: i32) -> Result<User, CollabError> {
    let user = match state.users.resolve(user_id).await? {
        Some(user) => user,
        None => {
            warn!("Connection {} failed to authenticate as unknown user {}", conn.conn_id, user_id);
            return Err(CollabError::AuthenticationFailed);
        }
    };

    if conn.user_id.is_some_and(|current| current != user.id) {
        leave_current(state, conn).await;
    }

    conn.user_id = Some(user.id);
    info!("Connection {} authenticated as user {}", conn.conn_id, user.id);
    Ok(user)
}

/// Take the connection out of the session it is joined to, if any.
pub async fn leave_current(state: &AppState, conn: &mut ConnCtx) -> LeaveOutcome {
    let (Some(user_id), Some(book_id)) = (conn.user_id, conn.book_id) else {
        return LeaveOutcome::default();
    };

    conn.book_id = None;
    conn.chapter_id = None;

    state.registry.leave(book_id, user_id, Some(conn.conn_id)).await
}

/// Cleanup for a closed transport, whether the client closed it or the
/// network dropped. Equivalent to an explicit `leave`.
pub async fn disconnect(state: &AppState, conn: &mut ConnCtx) {
    let book_id = conn.book_id;
    let outcome = leave_current(state, conn).await;

    match (conn.user_id, book_id) {
        (Some(user_id), Some(book_id)) => info!(
            "Connection {} of user {} closed; left book {} (removed={}, session_closed={})",
            conn.conn_id, user_id, book_id, outcome.removed, outcome.session_closed
        ),
        _ => info!("Connection {} closed", conn.conn_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::memory::MemoryStore;
    use crate::models::ServerEvent;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    async fn state_with_users(ids: &[i32]) -> AppState {
        let store = MemoryStore::new();
        for id in ids {
            store.insert_user(User { id: *id, username: format!("user{}", id) }).await;
        }
        AppState::new(Config::default(), Arc::new(store))
    }

    #[tokio::test]
    async fn unknown_user_keeps_connection_unchanged() {
        let state = state_with_users(&[1]).await;
        let (tx, _rx) = mpsc::channel(8);
        let mut conn = ConnCtx::new(tx);

        let err = bind_user(&state, &mut conn, 99).await.unwrap_err();
        assert!(matches!(err, CollabError::AuthenticationFailed));
        assert_eq!(conn.user_id, None);

        bind_user(&state, &mut conn, 1).await.unwrap();
        assert_eq!(conn.user_id, Some(1));
    }

    #[tokio::test]
    async fn switching_identity_leaves_old_session() {
        let state = state_with_users(&[1, 2]).await;
        let (tx, _rx) = mpsc::channel(8);
        let mut conn = ConnCtx::new(tx);
        bind_user(&state, &mut conn, 1).await.unwrap();
        state.registry.join(3, None, conn.participant(1)).await;
        conn.book_id = Some(3);

        bind_user(&state, &mut conn, 2).await.unwrap();
        assert_eq!(conn.book_id, None);
        assert_eq!(state.registry.get(3).await, None);
    }

    #[tokio::test]
    async fn disconnect_announces_departure_to_peers() {
        let state = state_with_users(&[1, 2]).await;
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let mut a = ConnCtx::new(tx_a);
        let b = ConnCtx::new(tx_b);
        a.user_id = Some(1);
        a.book_id = Some(9);
        state.registry.join(9, None, b.participant(2)).await;
        state.registry.join(9, None, a.participant(1)).await;
        while rx_b.try_recv().is_ok() {}

        disconnect(&state, &mut a).await;

        assert!(matches!(rx_b.try_recv(), Ok(ServerEvent::UserLeft(e)) if e.user_id == 1));
        assert_eq!(state.registry.get(9).await.map(|s| s.users), Some(vec![2]));
    }
}
