use tracing::debug;
use uuid::Uuid;

use super::registry::{ConnSender, Participant};
use crate::models::{CollabError, ServerEvent};

/// State of one transport connection.
///
/// Starts unauthenticated and unjoined; `user_id` is bound by `auth` and
/// `book_id` tracks the single session the connection belongs to.
#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub conn_id: Uuid,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub chapter_id: Option<i32>,
    tx: ConnSender,
}

impl ConnCtx {
    pub fn new(tx: ConnSender) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            user_id: None,
            book_id: None,
            chapter_id: None,
            tx,
        }
    }

    /// Queue a direct reply to this connection, waiting if its queue is full.
    pub async fn reply(&self, event: ServerEvent) {
        let event_type = event.type_name();
        if self.tx.send(event).await.is_err() {
            debug!("Connection {} closed before '{}' reply", self.conn_id, event_type);
        }
    }

    pub fn require_user(&self) -> Result<i32, CollabError> {
        self.user_id.ok_or(CollabError::AuthenticationRequired)
    }

    /// The authenticated user and the book this connection is joined to
    pub fn require_joined(&self) -> Result<(i32, i32), CollabError> {
        let user_id = self.require_user()?;
        let book_id = self.book_id.ok_or(CollabError::NotJoined)?;
        Ok((user_id, book_id))
    }

    pub fn participant(&self, user_id: i32) -> Participant {
        Participant {
            user_id,
            conn_id: self.conn_id,
            tx: self.tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn fresh_connection_is_unauthenticated() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ConnCtx::new(tx);
        assert!(matches!(conn.require_user(), Err(CollabError::AuthenticationRequired)));
        assert!(matches!(conn.require_joined(), Err(CollabError::AuthenticationRequired)));
    }

    #[test]
    fn authenticated_but_unjoined_connection() {
        let (tx, _rx) = mpsc::channel(1);
        let mut conn = ConnCtx::new(tx);
        conn.user_id = Some(3);
        assert!(matches!(conn.require_joined(), Err(CollabError::NotJoined)));
        conn.book_id = Some(8);
        assert_eq!(conn.require_joined().unwrap(), (3, 8));
        assert_eq!(conn.participant(3).conn_id, conn.conn_id);
    }
}
