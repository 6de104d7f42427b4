use book_collab::config::Config;
use book_collab::db::{dbcollab::DbCollab, memory::MemoryStore, CollabStore};
use book_collab::state::AppState;
use book_collab::{build_app, WS_PATH};
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "book_collab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    info!(
        "Environment: {}, log level: {} (override with RUST_LOG)",
        config.environment, config.log_level
    );

    let store = open_store(&config).await;
    info!("Change log backend: {}", store.backend());

    let address = config.server_address();
    let state = Arc::new(AppState::new(config, store));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}{}", address, WS_PATH);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");
}

/// Connect to PostgreSQL when a database URL is configured, otherwise keep
/// the change log in memory.
async fn open_store(config: &Config) -> Arc<dyn CollabStore> {
    if let Some(db_url) = &config.db_url {
        match DbCollab::new(db_url, config.db_max_connections).await {
            Ok(db) => {
                info!("Database initialized successfully");
                if config.db_auto_migrate {
                    if let Err(e) = db.migrate().await {
                        error!("Failed to apply change log schema: {}", e);
                    }
                }
                return Arc::new(db);
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to the in-memory change log");
            }
        }
    } else {
        warn!("No database URL configured - changes will not survive a restart");
    }

    match &config.memory_seed_path {
        Some(path) => match MemoryStore::load_seed(path).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to load memory seed: {}", e);
                Arc::new(MemoryStore::new())
            }
        },
        None => Arc::new(MemoryStore::new()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
