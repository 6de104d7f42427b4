use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::handlers::{book_changes, book_content, diagnostics, health_check, ready_check};
use crate::routes::identity_middleware::identity_middleware;
use crate::state::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    let book_routes = Router::<Arc<AppState>>::new()
        .route("/v1/books/:book_id/changes", get(book_changes))
        .route("/v1/books/:book_id/content", get(book_content))
        .route_layer(middleware::from_fn(identity_middleware)); // Applies to the book routes only

    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .merge(book_routes)
        .with_state(state)
}
