use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::{ChangesQuery, ChangesResponse, CollabError, ContentQuery, ContentResponse, ErrorResponse};
use crate::routes::identity_middleware::CurrentUser;
use crate::services::doc_edit_service;
use crate::services::permission_service::ensure_collaboration_permission;
use crate::state::AppState;

const MAX_CHANGES_PAGE: i64 = 500;

/// Recent changes of a book, optionally narrowed to one author
pub async fn book_changes(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(book_id): Path<i32>,
    Query(query): Query<ChangesQuery>,
) -> Result<(StatusCode, Json<ChangesResponse>), (StatusCode, Json<ErrorResponse>)> {
    ensure_collaboration_permission(state.store.as_ref(), user_id, book_id).await?;

    let limit = query
        .limit
        .unwrap_or(state.config.recent_changes_limit())
        .clamp(1, MAX_CHANGES_PAGE);

    let changes = match query.user_id {
        Some(author_id) => state
            .store
            .get_document_changes_by_user(book_id, author_id, limit)
            .await
            .map_err(CollabError::from)?,
        None => state
            .store
            .get_latest_document_changes(book_id, None, limit)
            .await
            .map_err(CollabError::from)?,
    };

    info!("User {} read {} change(s) of book {}", user_id, changes.len(), book_id);
    Ok((StatusCode::OK, Json(ChangesResponse { book_id, changes })))
}

/// Chapter text rebuilt from the change log
pub async fn book_content(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(book_id): Path<i32>,
    Query(query): Query<ContentQuery>,
) -> Result<(StatusCode, Json<ContentResponse>), (StatusCode, Json<ErrorResponse>)> {
    ensure_collaboration_permission(state.store.as_ref(), user_id, book_id).await?;

    let changes = state
        .store
        .get_chapter_changes(book_id, query.chapter_id)
        .await
        .map_err(CollabError::from)?;
    let content = doc_edit_service::replay(&changes);

    Ok((
        StatusCode::OK,
        Json(ContentResponse {
            book_id,
            chapter_id: query.chapter_id,
            content,
            change_count: changes.len(),
        }),
    ))
}
