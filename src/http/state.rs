use crate::audio::{AudioSink, NullSink};
use crate::config::Config;
use crate::dashboard::ViewOptions;
use crate::session::ChatSession;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Where assistant speech is played
    pub playback: Arc<dyn AudioSink>,

    /// Most recent chat; kept after it ends so its transcript stays visible
    pub chat: Arc<RwLock<Option<Arc<ChatSession>>>>,
}

impl AppState {
    /// State with audio playback disabled
    pub fn new(config: Config) -> Self {
        Self::with_playback(config, Arc::new(NullSink::new()))
    }

    pub fn with_playback(config: Config, playback: Arc<dyn AudioSink>) -> Self {
        Self {
            config: Arc::new(config),
            playback,
            chat: Arc::new(RwLock::new(None)),
        }
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions::from(&self.config.dashboard)
    }

    pub async fn current_chat(&self) -> Option<Arc<ChatSession>> {
        self.chat.read().await.clone()
    }
}
