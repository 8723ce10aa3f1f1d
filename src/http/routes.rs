use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Dashboard
        .route("/", get(handlers::index))
        .route("/api/view", get(handlers::get_view))
        .route("/api/config", get(handlers::get_config))
        // Health check
        .route("/health", get(handlers::health_check))
        // Chat control
        .route("/api/chat/start", post(handlers::start_chat))
        .route("/api/chat/stop", post(handlers::stop_chat))
        // Chat queries
        .route("/api/chat/status", get(handlers::get_chat_status))
        .route("/api/chat/transcript", get(handlers::get_transcript))
        .route("/api/chat/logs", get(handlers::get_logs))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
