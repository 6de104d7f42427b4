use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

use super::{CollabStore, StoreError};
use crate::models::{Book, Collaborator, CollaboratorStatus, DocumentChange, NewDocumentChange, User};

/// Contents of a `MEMORY_SEED_PATH` file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySeed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
}

#[derive(Default)]
struct MemoryData {
    users: HashMap<i32, User>,
    books: HashMap<i32, Book>,
    collaborators: Vec<Collaborator>,
    changes: Vec<DocumentChange>,
    next_change_id: i64,
}

/// In-process store for local development and tests.
///
/// Changes are kept in append order, which is also timestamp order.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: MemorySeed) -> Self {
        let data = MemoryData {
            users: seed.users.into_iter().map(|u| (u.id, u)).collect(),
            books: seed.books.into_iter().map(|b| (b.id, b)).collect(),
            collaborators: seed.collaborators,
            ..MemoryData::default()
        };
        Self { data: RwLock::new(data) }
    }

    /// Load users, books and collaborators from a JSON file.
    pub async fn load_seed(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Seed(format!("{}: {}", path.display(), e)))?;
        let seed: MemorySeed = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Seed(format!("{}: {}", path.display(), e)))?;
        info!(
            "Seeded in-memory store with {} users, {} books, {} collaborators",
            seed.users.len(),
            seed.books.len(),
            seed.collaborators.len()
        );
        Ok(Self::from_seed(seed))
    }

    pub async fn insert_user(&self, user: User) {
        self.data.write().await.users.insert(user.id, user);
    }

    pub async fn insert_book(&self, book: Book) {
        self.data.write().await.books.insert(book.id, book);
    }

    pub async fn insert_collaborator(&self, collaborator: Collaborator) {
        self.data.write().await.collaborators.push(collaborator);
    }

    pub async fn change_count(&self) -> usize {
        self.data.read().await.changes.len()
    }
}

fn newest_first_then_reverse<'a>(
    changes: impl DoubleEndedIterator<Item = &'a DocumentChange>,
    limit: i64,
) -> Vec<DocumentChange> {
    let limit = usize::try_from(limit).unwrap_or(0);
    let mut recent: Vec<DocumentChange> = changes.rev().take(limit).cloned().collect();
    recent.reverse();
    recent
}

#[async_trait]
impl CollabStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.data.read().await.users.get(&user_id).cloned())
    }

    async fn get_book(&self, book_id: i32) -> Result<Option<Book>, StoreError> {
        Ok(self.data.read().await.books.get(&book_id).cloned())
    }

    async fn check_collaboration_permission(
        &self,
        user_id: i32,
        book_id: i32,
    ) -> Result<Option<Collaborator>, StoreError> {
        let data = self.data.read().await;
        let rows: Vec<&Collaborator> = data
            .collaborators
            .iter()
            .filter(|c| c.book_id == book_id && c.user_id == user_id)
            .collect();
        let found = rows
            .iter()
            .find(|c| c.status == CollaboratorStatus::Accepted)
            .or_else(|| rows.first());
        Ok(found.map(|c| (*c).clone()))
    }

    async fn get_latest_document_changes(
        &self,
        book_id: i32,
        exclude_user_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<DocumentChange>, StoreError> {
        let data = self.data.read().await;
        let matching = data
            .changes
            .iter()
            .filter(|c| c.book_id == book_id && Some(c.user_id) != exclude_user_id);
        Ok(newest_first_then_reverse(matching, limit))
    }

    async fn get_document_changes_by_user(
        &self,
        book_id: i32,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<DocumentChange>, StoreError> {
        let data = self.data.read().await;
        let matching = data
            .changes
            .iter()
            .filter(|c| c.book_id == book_id && c.user_id == user_id);
        Ok(newest_first_then_reverse(matching, limit))
    }

    async fn get_chapter_changes(
        &self,
        book_id: i32,
        chapter_id: Option<i32>,
    ) -> Result<Vec<DocumentChange>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .changes
            .iter()
            .filter(|c| c.book_id == book_id && c.chapter_id == chapter_id)
            .cloned()
            .collect())
    }

    async fn create_document_change(&self, change: NewDocumentChange) -> Result<DocumentChange, StoreError> {
        let mut data = self.data.write().await;
        data.next_change_id += 1;

        // Keep timestamps non-decreasing even if the wall clock steps back.
        let now = Utc::now();
        let timestamp = match data.changes.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let saved = DocumentChange {
            id: data.next_change_id,
            book_id: change.book_id,
            chapter_id: change.chapter_id,
            user_id: change.user_id,
            change_type: change.change_type,
            position: change.position,
            content: change.content,
            previous_content: change.previous_content,
            timestamp,
        };
        data.changes.push(saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeType;

    fn insert(book_id: i32, user_id: i32, content: &str) -> NewDocumentChange {
        NewDocumentChange {
            book_id,
            chapter_id: None,
            user_id,
            change_type: ChangeType::Insert,
            position: 0,
            content: content.to_string(),
            previous_content: None,
        }
    }

    #[tokio::test]
    async fn latest_changes_are_bounded_and_oldest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.create_document_change(insert(1, 10, &i.to_string())).await.unwrap();
        }
        store.create_document_change(insert(2, 10, "other book")).await.unwrap();

        let recent = store.get_latest_document_changes(1, None, 3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
        assert!(recent.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn latest_changes_can_exclude_an_actor() {
        let store = MemoryStore::new();
        store.create_document_change(insert(1, 10, "mine")).await.unwrap();
        store.create_document_change(insert(1, 11, "theirs")).await.unwrap();

        let recent = store.get_latest_document_changes(1, Some(10), 20).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_id, 11);

        let by_user = store.get_document_changes_by_user(1, 10, 20).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].content, "mine");
    }

    #[tokio::test]
    async fn ids_increase_monotonically() {
        let store = MemoryStore::new();
        let a = store.create_document_change(insert(1, 10, "a")).await.unwrap();
        let b = store.create_document_change(insert(1, 10, "b")).await.unwrap();
        assert!(b.id > a.id);
        assert!(b.timestamp >= a.timestamp);
    }

    #[tokio::test]
    async fn accepted_collaborator_row_wins() {
        let store = MemoryStore::new();
        let row = |id, status| Collaborator {
            id,
            book_id: 1,
            user_id: 2,
            role: "editor".to_string(),
            status,
            invited_at: Utc::now(),
        };
        store.insert_collaborator(row(1, CollaboratorStatus::Declined)).await;
        store.insert_collaborator(row(2, CollaboratorStatus::Accepted)).await;

        let found = store.check_collaboration_permission(2, 1).await.unwrap().unwrap();
        assert_eq!(found.id, 2);
        assert!(store.check_collaboration_permission(3, 1).await.unwrap().is_none());
    }

    #[test]
    fn seed_parses_camel_case_json() {
        let seed: MemorySeed = serde_json::from_str(
            r#"{
                "users": [{"id": 1, "username": "ada"}],
                "books": [{"id": 7, "authorId": 1, "title": "Engines"}],
                "collaborators": [{"id": 1, "bookId": 7, "userId": 2, "role": "editor", "status": "accepted"}]
            }"#,
        )
        .unwrap();
        assert_eq!(seed.books[0].author_id, 1);
        assert_eq!(seed.collaborators[0].status, CollaboratorStatus::Accepted);
    }
}
