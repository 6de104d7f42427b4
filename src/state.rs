use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::db::CollabStore;
use crate::ws::registry::SessionRegistry;
use crate::ws::userctx::UserDirectory;

/// Everything a connection or request handler needs, owned explicitly
/// instead of living in process-wide statics.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn CollabStore>,
    pub registry: Arc<SessionRegistry>,
    pub users: UserDirectory,
    live_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CollabStore>) -> Self {
        let users = UserDirectory::new(store.clone(), config.user_cache_ttl());
        Self {
            config: Arc::new(config),
            store,
            registry: Arc::new(SessionRegistry::new()),
            users,
            live_connections: AtomicUsize::new(0),
        }
    }

    /// Count a connection as live until the returned guard drops.
    pub fn track_connection(self: &Arc<Self>) -> ConnectionSlot {
        self.live_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionSlot { state: self.clone() }
    }

    pub fn live_connections(&self) -> usize {
        self.live_connections.load(Ordering::Relaxed)
    }
}

pub struct ConnectionSlot {
    state: Arc<AppState>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.state.live_connections.fetch_sub(1, Ordering::Relaxed);
    }
}
