//! Per-chat state holder
//!
//! Transcript messages, the current emotion distribution, chat metadata,
//! connection flags and a rolling log, kept in bounded ring buffers.

mod emotions;
mod holder;
mod types;

pub use emotions::{EmotionDistribution, EmotionScore, TOP_EMOTIONS};
pub use holder::{HistoryLimits, SessionState, SharedSessionState, StateSnapshot};
pub use types::{ChatMetadata, ConnectionStatus, LogCategory, LogEntry, Message, Role};
