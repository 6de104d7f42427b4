pub mod dbcollab;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Book, Collaborator, DocumentChange, NewDocumentChange, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid seed data: {0}")]
    Seed(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Storage the collaboration core depends on.
///
/// The change log is append-only: records are created through
/// [`CollabStore::create_document_change`] and otherwise only range-queried.
#[async_trait]
pub trait CollabStore: Send + Sync {
    /// Short backend name used by readiness and diagnostics output.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, StoreError>;

    async fn get_book(&self, book_id: i32) -> Result<Option<Book>, StoreError>;

    /// The collaborator row linking `user_id` to `book_id`, whatever its status.
    async fn check_collaboration_permission(
        &self,
        user_id: i32,
        book_id: i32,
    ) -> Result<Option<Collaborator>, StoreError>;

    /// The `limit` most recent changes of a book, returned oldest first.
    async fn get_latest_document_changes(
        &self,
        book_id: i32,
        exclude_user_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<DocumentChange>, StoreError>;

    /// The `limit` most recent changes a single user made to a book, oldest first.
    async fn get_document_changes_by_user(
        &self,
        book_id: i32,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<DocumentChange>, StoreError>;

    /// Every change of one chapter (or of the book-level text when `chapter_id`
    /// is `None`) in replay order: ascending timestamp, then id.
    async fn get_chapter_changes(
        &self,
        book_id: i32,
        chapter_id: Option<i32>,
    ) -> Result<Vec<DocumentChange>, StoreError>;

    async fn create_document_change(&self, change: NewDocumentChange) -> Result<DocumentChange, StoreError>;
}
