use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Change log store is reachable", body = ReadyResponse),
        (status = 503, description = "Change log store is not reachable", body = ReadyResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Live connection and session statistics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics snapshot", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Recent changes of a book
#[utoipa::path(
    get,
    path = "/api/v1/books/{book_id}/changes",
    params(
        ("book_id" = i32, Path, description = "Book identifier"),
        ("x-user-id" = i32, Header, description = "Caller identity"),
        ChangesQuery
    ),
    responses(
        (status = 200, description = "Changes, oldest first", body = ChangesResponse),
        (status = 401, description = "Missing identity"),
        (status = 403, description = "No collaboration access", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn book_changes_doc() {}

/// Chapter text replayed from the change log
#[utoipa::path(
    get,
    path = "/api/v1/books/{book_id}/content",
    params(
        ("book_id" = i32, Path, description = "Book identifier"),
        ("x-user-id" = i32, Header, description = "Caller identity"),
        ContentQuery
    ),
    responses(
        (status = 200, description = "Replayed text", body = ContentResponse),
        (status = 401, description = "Missing identity"),
        (status = 403, description = "No collaboration access", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn book_content_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        book_changes_doc,
        book_content_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            DiagnosticsResponse,
            ErrorResponse,
            ChangeType,
            DocumentChange,
            ChangesResponse,
            ContentResponse
        )
    ),
    tags(
        (name = "api", description = "Collaboration API endpoints")
    )
)]
pub struct ApiDoc;
