pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;
pub mod ws;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use docs::ApiDoc;
use routes::api::create_api_routes;
use state::AppState;
use websocket::handler::websocket_handler;

/// Path of the collaboration WebSocket endpoint
pub const WS_PATH: &str = "/ws";

/// Build the full HTTP application around an explicitly owned state.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route(WS_PATH, get(websocket_handler))
        .with_state(state.clone())
        // Mount API routes
        .nest("/api", create_api_routes(state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}
