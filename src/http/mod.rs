//! HTTP server for the dashboard
//!
//! - GET  /                    - Dashboard page
//! - GET  /api/view            - Current dashboard view (polled by the page)
//! - GET  /api/config          - Preconfigured credentials and refresh interval
//! - POST /api/chat/start      - Start a voice chat
//! - POST /api/chat/stop       - Stop the voice chat
//! - GET  /api/chat/status     - Session statistics
//! - GET  /api/chat/transcript - Retained messages
//! - GET  /api/chat/logs       - Retained log entries
//! - GET  /health              - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{StartChatRequest, StartChatResponse, StopChatResponse};
pub use routes::create_router;
pub use state::AppState;
