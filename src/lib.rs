pub mod audio;
pub mod config;
pub mod dashboard;
pub mod evi;
pub mod http;
pub mod session;
pub mod state;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSink, AudioSource,
    NullSink,
};
pub use config::{Config, Credentials};
pub use dashboard::{ConnectionPhase, DashboardView, ViewOptions};
pub use evi::{EviClient, PublishMessage, SubscribeEvent};
pub use http::{create_router, AppState};
pub use session::{ChatSession, EventReducer, SessionConfig, SessionStats};
pub use state::{
    ChatMetadata, EmotionDistribution, LogCategory, LogEntry, Message, Role, SharedSessionState,
    StateSnapshot,
};
