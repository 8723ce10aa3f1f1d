use super::state::AppState;
use crate::config::Credentials;
use crate::dashboard::{ConnectionPhase, DashboardView, DASHBOARD_HTML};
use crate::session::{ChatSession, SessionConfig, SessionStats};
use crate::state::{LogEntry, Message};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Credentials typed into the dashboard; blank fields use the configured defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartChatRequest {
    pub api_key: String,
    pub secret_key: String,
    pub config_id: String,
}

#[derive(Debug, Serialize)]
pub struct StartChatResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopChatResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub api_key_configured: bool,
    pub secret_key_configured: bool,
    pub config_id: String,
    pub refresh_interval_ms: u64,
    pub capture_audio: bool,
    pub playback: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn no_chat() -> axum::response::Response {
    error_response(StatusCode::NOT_FOUND, "No voice chat has been started")
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
/// Dashboard page
pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /api/config
/// Which credentials are preconfigured (values are never returned, except the config id)
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let hume = &state.config.hume;

    Json(ConfigResponse {
        api_key_configured: !hume.api_key.trim().is_empty(),
        secret_key_configured: !hume.secret_key.trim().is_empty(),
        config_id: hume.config_id.clone(),
        refresh_interval_ms: state.config.dashboard.refresh_interval_ms,
        capture_audio: state.config.audio.capture,
        playback: state.playback.name().to_string(),
    })
}

/// POST /api/chat/start
/// Open a new voice chat
pub async fn start_chat(
    State(state): State<AppState>,
    Json(req): Json<StartChatRequest>,
) -> impl IntoResponse {
    let credentials = Credentials {
        api_key: req.api_key,
        secret_key: req.secret_key,
        config_id: req.config_id,
    }
    .or_defaults(&state.config.hume.credentials());

    if !credentials.is_complete() {
        warn!("Refusing to start chat without credentials");
        return error_response(
            StatusCode::BAD_REQUEST,
            "Please provide all required API credentials",
        );
    }

    let mut slot = state.chat.write().await;

    if let Some(existing) = slot.as_ref() {
        if existing.is_running() {
            return error_response(
                StatusCode::CONFLICT,
                format!("Voice chat {} is already running", existing.session_id()),
            );
        }
    }

    let config = SessionConfig::from_config(&state.config, credentials);
    let session = Arc::new(ChatSession::new(config, Arc::clone(&state.playback)));

    info!("Starting voice chat: {}", session.session_id());

    if let Err(e) = session.start().await {
        error!("Failed to start chat: {}", e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to start chat: {}", e),
        );
    }

    let session_id = session.session_id().to_string();
    *slot = Some(session);

    (
        StatusCode::OK,
        Json(StartChatResponse {
            session_id,
            status: "starting".to_string(),
            message: "Voice chat started! Please allow microphone access.".to_string(),
        }),
    )
        .into_response()
}

/// POST /api/chat/stop
/// Close the current voice chat
pub async fn stop_chat(State(state): State<AppState>) -> impl IntoResponse {
    let Some(session) = state.current_chat().await else {
        return no_chat();
    };

    info!("Stopping voice chat: {}", session.session_id());

    match session.stop().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(StopChatResponse {
                session_id: session.session_id().to_string(),
                status: "stopped".to_string(),
                message: "Voice chat stopped.".to_string(),
                stats,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop chat: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to stop chat: {}", e),
            )
        }
    }
}

/// GET /api/chat/status
pub async fn get_chat_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.current_chat().await {
        Some(session) => (StatusCode::OK, Json(session.get_stats())).into_response(),
        None => no_chat(),
    }
}

/// GET /api/chat/transcript
/// Every retained message, oldest first
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    match state.current_chat().await {
        Some(session) => {
            let transcript: Vec<Message> = session.state().read(|s| s.messages().cloned().collect());
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => no_chat(),
    }
}

/// GET /api/chat/logs
/// Every retained log entry, oldest first
pub async fn get_logs(State(state): State<AppState>) -> impl IntoResponse {
    match state.current_chat().await {
        Some(session) => {
            let logs: Vec<LogEntry> = session.state().read(|s| s.logs().cloned().collect());
            (StatusCode::OK, Json(logs)).into_response()
        }
        None => no_chat(),
    }
}

/// GET /api/view
/// Everything the dashboard draws on one refresh
pub async fn get_view(State(state): State<AppState>) -> impl IntoResponse {
    let options = state.view_options();

    let view = match state.current_chat().await {
        Some(session) => {
            let snapshot = session.state().snapshot();
            let status =
                ConnectionPhase::from_flags(session.is_running(), snapshot.connection.connected);
            DashboardView::build(
                &snapshot,
                status,
                Some(session.session_id().to_string()),
                &options,
            )
        }
        None => DashboardView::idle(&options),
    };

    Json(view)
}
