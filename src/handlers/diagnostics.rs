use axum::{extract::State, http::StatusCode, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

use crate::models::DiagnosticsResponse;
use crate::state::AppState;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Connection, session and host statistics
pub async fn diagnostics(State(state): State<Arc<AppState>>) -> (StatusCode, Json<DiagnosticsResponse>) {
    let n_conn = state.live_connections() as u32;
    let (n_sessions, n_participants) = state.registry.stats().await;
    let n_user_ctx = state.users.entry_count() as u32;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Sessions: {}, Participants: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_sessions,
        n_participants
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn,
            n_sessions: n_sessions as u32,
            n_participants: n_participants as u32,
            n_user_ctx,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    )
}
