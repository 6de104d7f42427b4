use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use super::broadcast;
use crate::models::ServerEvent;

/// Outbound channel of one connection
pub type ConnSender = mpsc::Sender<ServerEvent>;

/// A user registered in a session, bound to the connection that joined.
#[derive(Clone, Debug)]
pub struct Participant {
    pub user_id: i32,
    pub conn_id: Uuid,
    pub tx: ConnSender,
}

/// Users currently editing one book
#[derive(Debug)]
pub struct CollabSession {
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    connected_users: HashMap<i32, Participant>,
}

impl CollabSession {
    pub fn new(book_id: i32, chapter_id: Option<i32>) -> Self {
        Self {
            book_id,
            chapter_id,
            connected_users: HashMap::new(),
        }
    }

    /// Register a participant. A user holds at most one entry, so a second
    /// join replaces the previous channel. Returns the replaced entry.
    pub fn insert(&mut self, participant: Participant) -> Option<Participant> {
        self.connected_users.insert(participant.user_id, participant)
    }

    /// Remove `user_id`, but only if `conn_id` (when given) still owns the entry.
    pub fn remove(&mut self, user_id: i32, conn_id: Option<Uuid>) -> Option<Participant> {
        let owned = self
            .connected_users
            .get(&user_id)
            .is_some_and(|p| conn_id.map_or(true, |id| id == p.conn_id));
        if owned {
            self.connected_users.remove(&user_id)
        } else {
            None
        }
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.connected_users.values()
    }

    /// Connected user ids in ascending order
    pub fn user_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.connected_users.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, user_id: i32) -> bool {
        self.connected_users.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.connected_users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected_users.is_empty()
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            book_id: self.book_id,
            chapter_id: self.chapter_id,
            users: self.user_ids(),
        }
    }
}

/// Point-in-time copy of a session, safe to hold outside the registry lock
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    pub users: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinOutcome {
    /// Everyone else in the session after the join
    pub others: Vec<i32>,
    pub chapter_id: Option<i32>,
    pub created: bool,
    /// The user was already present and its channel got replaced
    pub replaced: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct LeaveOutcome {
    pub removed: bool,
    pub session_closed: bool,
    pub remaining: usize,
}

/// Owns every live session, keyed by book id.
///
/// One mutex guards the whole map; each compound operation (join, leave with
/// its empty-check and teardown, broadcast) runs inside a single critical
/// section and never awaits I/O while holding it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<i32, CollabSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `book_id`, creating an empty one if needed.
    pub async fn get_or_create(&self, book_id: i32, chapter_id: Option<i32>) -> SessionSnapshot {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(book_id)
            .or_insert_with(|| CollabSession::new(book_id, chapter_id))
            .snapshot()
    }

    pub async fn get(&self, book_id: i32) -> Option<SessionSnapshot> {
        self.sessions.lock().await.get(&book_id).map(CollabSession::snapshot)
    }

    /// Drop a session entry. Callers check emptiness first.
    pub async fn remove(&self, book_id: i32) -> bool {
        self.sessions.lock().await.remove(&book_id).is_some()
    }

    /// Register `participant` in the session of `book_id` and tell everyone
    /// else about it.
    pub async fn join(&self, book_id: i32, chapter_id: Option<i32>, participant: Participant) -> JoinOutcome {
        let user_id = participant.user_id;
        let mut sessions = self.sessions.lock().await;

        let created = !sessions.contains_key(&book_id);
        let session = sessions
            .entry(book_id)
            .or_insert_with(|| CollabSession::new(book_id, chapter_id));
        if session.chapter_id.is_none() {
            session.chapter_id = chapter_id;
        }

        let replaced = session.insert(participant).is_some();
        let others: Vec<i32> = session.user_ids().into_iter().filter(|id| *id != user_id).collect();

        // A re-join only swaps the channel; peers already know the user.
        if !replaced {
            broadcast::deliver(session, &ServerEvent::user_joined(user_id), Some(user_id));
        }

        if created {
            info!("Session opened for book {}", book_id);
        }
        debug!(
            "User {} joined book {} ({} participant(s), replaced={})",
            user_id,
            book_id,
            session.len(),
            replaced
        );

        JoinOutcome {
            others,
            chapter_id: session.chapter_id,
            created,
            replaced,
        }
    }

    /// Remove a user from a session, destroying the session when it empties
    /// and announcing the departure to whoever is left.
    ///
    /// With `conn_id` set, the entry is only removed if that connection still
    /// owns it, so a stale connection cannot evict a newer one.
    pub async fn leave(&self, book_id: i32, user_id: i32, conn_id: Option<Uuid>) -> LeaveOutcome {
        let mut sessions = self.sessions.lock().await;

        let Some(session) = sessions.get_mut(&book_id) else {
            return LeaveOutcome::default();
        };

        let removed = session.remove(user_id, conn_id).is_some();
        let remaining = session.len();

        if session.is_empty() {
            sessions.remove(&book_id);
            info!("Session closed for book {}", book_id);
            return LeaveOutcome { removed, session_closed: true, remaining: 0 };
        }

        if removed {
            broadcast::deliver(session, &ServerEvent::user_left(user_id), Some(user_id));
            debug!("User {} left book {} ({} remaining)", user_id, book_id, remaining);
        }

        LeaveOutcome { removed, session_closed: false, remaining }
    }

    /// Send `event` to the participants of `book_id`, except `exclude_user_id`.
    /// A missing session is a silent no-op.
    pub async fn broadcast(&self, book_id: i32, event: &ServerEvent, exclude_user_id: Option<i32>) -> usize {
        let sessions = self.sessions.lock().await;
        match sessions.get(&book_id) {
            Some(session) => broadcast::deliver(session, event, exclude_user_id),
            None => {
                debug!("No session for book {}, dropping '{}'", book_id, event.type_name());
                0
            }
        }
    }

    /// Number of sessions and of participants across them
    pub async fn stats(&self) -> (usize, usize) {
        let sessions = self.sessions.lock().await;
        let participants = sessions.values().map(CollabSession::len).sum();
        (sessions.len(), participants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::Receiver;

    fn participant(user_id: i32) -> (Participant, Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (Participant { user_id, conn_id: Uuid::new_v4(), tx }, rx)
    }

    fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn second_user_joins_the_same_session() {
        let registry = SessionRegistry::new();
        let (a, _rx_a) = participant(1);
        let (b, _rx_b) = participant(2);

        let first = registry.join(7, Some(3), a).await;
        assert!(first.created);
        assert!(first.others.is_empty());

        let second = registry.join(7, None, b).await;
        assert!(!second.created);
        assert_eq!(second.others, vec![1]);
        assert_eq!(second.chapter_id, Some(3));

        assert_eq!(registry.stats().await, (1, 2));
    }

    #[tokio::test]
    async fn existing_participants_hear_about_joins() {
        let registry = SessionRegistry::new();
        let (a, mut rx_a) = participant(1);
        let (b, mut rx_b) = participant(2);
        registry.join(7, None, a).await;
        registry.join(7, None, b).await;

        let events = drain(&mut rx_a);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ServerEvent::UserJoined(e) if e.user_id == 2));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn last_leave_destroys_the_session() {
        let registry = SessionRegistry::new();
        let (a, _rx_a) = participant(1);
        let (b, mut rx_b) = participant(2);
        registry.join(4, Some(8), a).await;
        registry.join(4, None, b).await;
        drain(&mut rx_b);

        let outcome = registry.leave(4, 1, None).await;
        assert_eq!(outcome, LeaveOutcome { removed: true, session_closed: false, remaining: 1 });
        assert_eq!(registry.get(4).await.map(|s| s.users), Some(vec![2]));
        assert!(matches!(drain(&mut rx_b).as_slice(), [ServerEvent::UserLeft(e)] if e.user_id == 1));

        let outcome = registry.leave(4, 2, None).await;
        assert!(outcome.session_closed);
        assert_eq!(registry.get(4).await, None);

        let fresh = registry.get_or_create(4, None).await;
        assert!(fresh.users.is_empty());
        assert_eq!(fresh.chapter_id, None);
    }

    #[tokio::test]
    async fn rejoin_replaces_the_channel() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = participant(1);
        let (second, _rx2) = participant(1);

        registry.join(5, None, first).await;
        let outcome = registry.join(5, None, second).await;

        assert!(outcome.replaced);
        assert_eq!(registry.get(5).await.map(|s| s.users), Some(vec![1]));
    }

    #[tokio::test]
    async fn rejoin_is_announced_once() {
        let registry = SessionRegistry::new();
        let (a, mut rx_a) = participant(1);
        let (b_first, _rx_b1) = participant(2);
        let (b_second, _rx_b2) = participant(2);
        registry.join(7, None, a).await;
        registry.join(7, None, b_first).await;
        registry.join(7, None, b_second).await;

        let events = drain(&mut rx_a);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ServerEvent::UserJoined(e) if e.user_id == 2));
    }

    #[tokio::test]
    async fn stale_connection_cannot_evict_newer_one() {
        let registry = SessionRegistry::new();
        let (old, _rx_old) = participant(1);
        let (new, _rx_new) = participant(1);
        let old_conn = old.conn_id;
        registry.join(5, None, old).await;
        registry.join(5, None, new).await;

        let outcome = registry.leave(5, 1, Some(old_conn)).await;
        assert!(!outcome.removed);
        assert_eq!(registry.get(5).await.map(|s| s.users), Some(vec![1]));
    }

    #[tokio::test]
    async fn broadcast_honours_exclusion() {
        let registry = SessionRegistry::new();
        let mut receivers = Vec::new();
        for user_id in 1..=3 {
            let (p, rx) = participant(user_id);
            registry.join(9, None, p).await;
            receivers.push(rx);
        }
        for rx in receivers.iter_mut() {
            drain(rx);
        }

        let delivered = registry.broadcast(9, &ServerEvent::user_left(42), Some(1)).await;
        assert_eq!(delivered, 2);
        assert!(drain(&mut receivers[0]).is_empty());
        assert_eq!(drain(&mut receivers[1]).len(), 1);
        assert_eq!(drain(&mut receivers[2]).len(), 1);
    }

    #[tokio::test]
    async fn broadcast_to_missing_session_is_a_no_op() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.broadcast(1, &ServerEvent::user_left(1), None).await, 0);
        assert_eq!(registry.leave(1, 1, None).await, LeaveOutcome::default());
        assert!(!registry.remove(1).await);
    }
}
