use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::config::{Config, Credentials, HumeConfig};
use crate::state::HistoryLimits;

/// Configuration for one chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "chat-2f1c...")
    pub session_id: String,

    /// API key, secret key and EVI config id
    pub credentials: Credentials,

    /// EVI chat websocket endpoint
    pub evi_url: String,

    /// OAuth token endpoint, used when a secret key is present
    pub token_url: String,

    /// Format of the audio sent to EVI
    pub audio: AudioBackendConfig,

    /// Whether to open the microphone at all
    pub capture_audio: bool,

    /// Ring buffer sizes for the state holder
    pub history: HistoryLimits,

    /// How long `stop` waits for the driver before aborting it
    pub shutdown_timeout: Duration,
}

impl SessionConfig {
    pub fn from_config(cfg: &Config, credentials: Credentials) -> Self {
        Self {
            session_id: new_session_id(),
            credentials,
            evi_url: cfg.hume.evi_url.clone(),
            token_url: cfg.hume.token_url.clone(),
            audio: AudioBackendConfig {
                target_sample_rate: cfg.audio.sample_rate,
                target_channels: cfg.audio.channels,
                buffer_duration_ms: cfg.audio.buffer_duration_ms,
            },
            capture_audio: cfg.audio.capture,
            history: HistoryLimits {
                max_messages: cfg.dashboard.max_messages,
                max_logs: cfg.dashboard.max_logs,
            },
            shutdown_timeout: Duration::from_millis(cfg.session.shutdown_timeout_ms),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let hume = HumeConfig::default();
        Self {
            session_id: new_session_id(),
            credentials: Credentials::default(),
            evi_url: hume.evi_url,
            token_url: hume.token_url,
            audio: AudioBackendConfig::default(),
            capture_audio: true,
            history: HistoryLimits::default(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

fn new_session_id() -> String {
    format!("chat-{}", uuid::Uuid::new_v4())
}
