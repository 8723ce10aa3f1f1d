use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// Whether the driver task is still running
    pub is_running: bool,

    /// Whether the EVI socket is open
    pub is_connected: bool,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio frames forwarded to EVI
    pub audio_frames_sent: usize,

    /// Events received from EVI
    pub events_received: usize,

    /// Messages currently retained by the state holder
    pub message_count: usize,

    /// Log entries currently retained by the state holder
    pub log_count: usize,
}
