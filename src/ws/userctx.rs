use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::db::{CollabStore, StoreError};
use crate::models::User;

/// Resolves user ids for `auth`, caching hits for a short while.
///
/// Misses are not cached so a user created after a failed attempt can
/// authenticate right away.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn CollabStore>,
    cache: Cache<i32, User>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn CollabStore>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();
        info!("User cache initialized (ttl {}s)", ttl.as_secs());
        Self { store, cache }
    }

    pub async fn resolve(&self, user_id: i32) -> Result<Option<User>, StoreError> {
        if let Some(user) = self.cache.get(&user_id).await {
            return Ok(Some(user));
        }

        debug!("User cache miss for {}", user_id);
        let user = self.store.get_user(user_id).await?;
        if let Some(user) = &user {
            self.cache.insert(user_id, user.clone()).await;
        }
        Ok(user)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    #[tokio::test]
    async fn resolves_and_caches_known_users() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(User { id: 1, username: "ada".to_string() }).await;
        let users = UserDirectory::new(store.clone(), Duration::from_secs(60));

        assert_eq!(users.resolve(1).await.unwrap().map(|u| u.username), Some("ada".to_string()));
        assert!(users.resolve(2).await.unwrap().is_none());

        store.insert_user(User { id: 2, username: "grace".to_string() }).await;
        assert!(users.resolve(2).await.unwrap().is_some());
    }
}
