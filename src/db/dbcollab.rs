use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Error as SqlxError, FromRow};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{CollabStore, StoreError};
use crate::models::{
    Book, ChangeType, Collaborator, CollaboratorStatus, DocumentChange, NewDocumentChange, User,
};

const SCHEMA_SQL: &str = include_str!("schema.sql");

const CHANGE_COLUMNS: &str =
    "id, book_id, chapter_id, user_id, change_type, position, content, previous_content, created_at";

/// Change log row from the database
#[derive(Debug, Clone, FromRow)]
struct DocumentChangeRow {
    id: i64,
    book_id: i32,
    chapter_id: Option<i32>,
    user_id: i32,
    change_type: String,
    position: i32,
    content: String,
    previous_content: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DocumentChangeRow> for DocumentChange {
    type Error = StoreError;

    fn try_from(row: DocumentChangeRow) -> Result<Self, Self::Error> {
        let change_type = ChangeType::parse(&row.change_type).ok_or_else(|| {
            StoreError::Corrupt(format!("change {} has unknown type '{}'", row.id, row.change_type))
        })?;
        Ok(DocumentChange {
            id: row.id,
            book_id: row.book_id,
            chapter_id: row.chapter_id,
            user_id: row.user_id,
            change_type,
            position: row.position,
            content: row.content,
            previous_content: row.previous_content,
            timestamp: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct CollaboratorRow {
    id: i32,
    book_id: i32,
    user_id: i32,
    role: String,
    status: String,
    invited_at: DateTime<Utc>,
}

impl TryFrom<CollaboratorRow> for Collaborator {
    type Error = StoreError;

    fn try_from(row: CollaboratorRow) -> Result<Self, Self::Error> {
        let status = CollaboratorStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("collaborator {} has unknown status '{}'", row.id, row.status))
        })?;
        Ok(Collaborator {
            id: row.id,
            book_id: row.book_id,
            user_id: row.user_id,
            role: row.role,
            status,
            invited_at: row.invited_at,
        })
    }
}

fn into_changes(rows: Vec<DocumentChangeRow>) -> Result<Vec<DocumentChange>, StoreError> {
    rows.into_iter().map(DocumentChange::try_from).collect()
}

/// PostgreSQL-backed store
pub struct DbCollab {
    pool: PgPool,
}

impl DbCollab {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Upper bound of the pool
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the change log table and its indexes if they are missing.
    pub async fn migrate(&self) -> Result<(), SqlxError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        info!("Change log schema is up to date");
        Ok(())
    }

    fn log_pool_state(&self, action: &str, book_id: i32) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        debug!(
            "{} for book {}. Pool connections: {} idle, {} in use",
            action,
            book_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

#[async_trait]
impl CollabStore for DbCollab {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, (i32, String)>("SELECT id, username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|(id, username)| User { id, username });
        Ok(user)
    }

    async fn get_book(&self, book_id: i32) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, (i32, i32, String)>(
            "SELECT id, author_id, title FROM books WHERE id = $1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|(id, author_id, title)| Book { id, author_id, title });
        Ok(book)
    }

    async fn check_collaboration_permission(
        &self,
        user_id: i32,
        book_id: i32,
    ) -> Result<Option<Collaborator>, StoreError> {
        self.log_pool_state("Checking collaboration permission", book_id);

        let query_sql = r#"
            SELECT id, book_id, user_id, role, status, invited_at
            FROM collaborators
            WHERE book_id = $1 AND user_id = $2
            ORDER BY (status = 'accepted') DESC, invited_at DESC
            LIMIT 1
        "#;

        let row = sqlx::query_as::<_, CollaboratorRow>(query_sql)
            .bind(book_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Collaborator::try_from).transpose()
    }

    async fn get_latest_document_changes(
        &self,
        book_id: i32,
        exclude_user_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<DocumentChange>, StoreError> {
        self.log_pool_state("Loading recent changes", book_id);

        let query_sql = format!(
            r#"
            SELECT * FROM (
                SELECT {CHANGE_COLUMNS}
                FROM document_changes
                WHERE book_id = $1 AND ($2::INTEGER IS NULL OR user_id <> $2)
                ORDER BY created_at DESC, id DESC
                LIMIT $3
            ) recent
            ORDER BY created_at ASC, id ASC
            "#
        );

        let rows = sqlx::query_as::<_, DocumentChangeRow>(&query_sql)
            .bind(book_id)
            .bind(exclude_user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_changes(rows)
    }

    async fn get_document_changes_by_user(
        &self,
        book_id: i32,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<DocumentChange>, StoreError> {
        let query_sql = format!(
            r#"
            SELECT * FROM (
                SELECT {CHANGE_COLUMNS}
                FROM document_changes
                WHERE book_id = $1 AND user_id = $2
                ORDER BY created_at DESC, id DESC
                LIMIT $3
            ) by_user
            ORDER BY created_at ASC, id ASC
            "#
        );

        let rows = sqlx::query_as::<_, DocumentChangeRow>(&query_sql)
            .bind(book_id)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_changes(rows)
    }

    async fn get_chapter_changes(
        &self,
        book_id: i32,
        chapter_id: Option<i32>,
    ) -> Result<Vec<DocumentChange>, StoreError> {
        let query_sql = format!(
            r#"
            SELECT {CHANGE_COLUMNS}
            FROM document_changes
            WHERE book_id = $1 AND chapter_id IS NOT DISTINCT FROM $2
            ORDER BY created_at ASC, id ASC
            "#
        );

        let rows = sqlx::query_as::<_, DocumentChangeRow>(&query_sql)
            .bind(book_id)
            .bind(chapter_id)
            .fetch_all(&self.pool)
            .await?;

        into_changes(rows)
    }

    async fn create_document_change(&self, change: NewDocumentChange) -> Result<DocumentChange, StoreError> {
        self.log_pool_state("Appending change", change.book_id);

        let query_sql = format!(
            r#"
            INSERT INTO document_changes(book_id, chapter_id, user_id, change_type, position, content, previous_content)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CHANGE_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, DocumentChangeRow>(&query_sql)
            .bind(change.book_id)
            .bind(change.chapter_id)
            .bind(change.user_id)
            .bind(change.change_type.as_str())
            .bind(change.position)
            .bind(&change.content)
            .bind(&change.previous_content)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to append change for book {}: {}", change.book_id, e);
                e
            })?;

        let saved = DocumentChange::try_from(row)?;
        info!("Change {} saved for book {}", saved.id, saved.book_id);
        Ok(saved)
    }
}
