use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use super::emotions::EmotionDistribution;
use super::types::{ChatMetadata, ConnectionStatus, LogCategory, LogEntry, Message};

/// Ring buffer capacities for one chat
#[derive(Debug, Clone, Copy)]
pub struct HistoryLimits {
    pub max_messages: usize,
    pub max_logs: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_messages: 500,
            max_logs: 1000,
        }
    }
}

/// Everything the dashboard knows about one chat
#[derive(Debug)]
pub struct SessionState {
    messages: VecDeque<Message>,
    logs: VecDeque<LogEntry>,
    current_emotions: Option<EmotionDistribution>,
    chat_metadata: Option<ChatMetadata>,
    connection: ConnectionStatus,
    limits: HistoryLimits,
    evicted_messages: usize,
    evicted_logs: usize,
}

/// Point-in-time copy of a [`SessionState`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct StateSnapshot {
    pub messages: Vec<Message>,
    pub logs: Vec<LogEntry>,
    pub current_emotions: Option<EmotionDistribution>,
    pub chat_metadata: Option<ChatMetadata>,
    pub connection: ConnectionStatus,
    pub evicted_messages: usize,
    pub evicted_logs: usize,
}

impl SessionState {
    pub fn new(limits: HistoryLimits) -> Self {
        let limits = HistoryLimits {
            max_messages: limits.max_messages.max(1),
            max_logs: limits.max_logs.max(1),
        };

        Self {
            messages: VecDeque::new(),
            logs: VecDeque::new(),
            current_emotions: None,
            chat_metadata: None,
            connection: ConnectionStatus::default(),
            limits,
            evicted_messages: 0,
            evicted_logs: 0,
        }
    }

    pub fn push_message(&mut self, message: Message) {
        if self.messages.len() == self.limits.max_messages {
            self.messages.pop_front();
            self.evicted_messages += 1;
        }
        self.messages.push_back(message);
    }

    pub fn log(&mut self, text: impl Into<String>, category: LogCategory) {
        if self.logs.len() == self.limits.max_logs {
            self.logs.pop_front();
            self.evicted_logs += 1;
        }
        self.logs.push_back(LogEntry {
            timestamp: Utc::now(),
            text: text.into(),
            category,
        });
    }

    /// Store `error` as the last error and log it
    pub fn record_error(&mut self, error: String) {
        self.log(error.clone(), LogCategory::Error);
        self.connection.last_error = Some(error);
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connection.connected = connected;
    }

    pub fn set_chat_metadata(&mut self, metadata: ChatMetadata) {
        self.chat_metadata = Some(metadata);
    }

    pub fn set_current_emotions(&mut self, emotions: EmotionDistribution) {
        self.current_emotions = Some(emotions);
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogEntry> {
        self.logs.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    pub fn current_emotions(&self) -> Option<&EmotionDistribution> {
        self.current_emotions.as_ref()
    }

    pub fn chat_metadata(&self) -> Option<&ChatMetadata> {
        self.chat_metadata.as_ref()
    }

    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.iter().cloned().collect(),
            logs: self.logs.iter().cloned().collect(),
            current_emotions: self.current_emotions.clone(),
            chat_metadata: self.chat_metadata.clone(),
            connection: self.connection.clone(),
            evicted_messages: self.evicted_messages,
            evicted_logs: self.evicted_logs,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(HistoryLimits::default())
    }
}

/// Handle shared between the session driver (writer) and HTTP handlers (readers)
///
/// Every mutation happens inside one `update` call, so a reader either sees
/// an event fully applied or not at all.
#[derive(Debug, Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionState>>,
}

impl SharedSessionState {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState::new(limits))),
        }
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.inner.write();
        f(&mut state)
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self.inner.read();
        f(&state)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.read().snapshot()
    }
}
