use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::state::{ChatMetadata, LogCategory, Role, StateSnapshot};

const TIME_FORMAT: &str = "%H:%M:%S";

/// Connection indicator shown in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Connected,
    Connecting,
    Disconnected,
}

impl ConnectionPhase {
    pub fn from_flags(chat_running: bool, socket_open: bool) -> Self {
        match (chat_running, socket_open) {
            (true, true) => Self::Connected,
            (true, false) => Self::Connecting,
            (false, _) => Self::Disconnected,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub visible_messages: usize,
    pub visible_logs: usize,
    pub refresh_interval_ms: u64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

impl From<&DashboardConfig> for ViewOptions {
    fn from(cfg: &DashboardConfig) -> Self {
        Self {
            visible_messages: cfg.visible_messages,
            visible_logs: cfg.visible_logs,
            refresh_interval_ms: cfg.refresh_interval_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub role: Role,
    pub speaker: &'static str,
    pub content: String,
    pub time: String,
    pub emotions_caption: Option<String>,
}

/// Bar chart input for the current distribution
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmotionBars {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub role: Role,
}

/// Line chart input: one series per emotion
#[derive(Debug, Clone, Serialize)]
pub struct EmotionSeries {
    pub emotion: String,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub time: String,
    pub text: String,
    pub category: LogCategory,
}

/// Everything the dashboard page renders on one refresh
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub status: ConnectionPhase,
    pub chat_running: bool,
    pub session_id: Option<String>,
    pub chat_info: Option<ChatMetadata>,
    pub error: Option<String>,
    pub messages: Vec<MessageView>,
    pub current_emotions: Option<EmotionBars>,
    pub emotion_trends: Vec<EmotionSeries>,
    pub logs: Vec<LogView>,
    pub refresh_interval_ms: u64,
}

impl DashboardView {
    pub fn build(
        snapshot: &StateSnapshot,
        status: ConnectionPhase,
        session_id: Option<String>,
        options: &ViewOptions,
    ) -> Self {
        Self {
            status,
            chat_running: status != ConnectionPhase::Disconnected,
            session_id,
            chat_info: snapshot.chat_metadata.clone(),
            error: snapshot.connection.last_error.clone(),
            messages: recent_messages(snapshot, options.visible_messages),
            current_emotions: current_bars(snapshot),
            emotion_trends: emotion_trends(snapshot),
            logs: recent_logs(snapshot, options.visible_logs),
            refresh_interval_ms: options.refresh_interval_ms,
        }
    }

    /// View shown before any chat has been started
    pub fn idle(options: &ViewOptions) -> Self {
        Self::build(
            &StateSnapshot::default(),
            ConnectionPhase::Disconnected,
            None,
            options,
        )
    }
}

/// The newest `limit` messages, oldest first
fn recent_messages(snapshot: &StateSnapshot, limit: usize) -> Vec<MessageView> {
    let skip = snapshot.messages.len().saturating_sub(limit);

    snapshot
        .messages
        .iter()
        .skip(skip)
        .map(|msg| MessageView {
            role: msg.role,
            speaker: match msg.role {
                Role::User => "You",
                Role::Assistant => "Assistant",
            },
            content: msg.content.clone(),
            time: msg.timestamp.format(TIME_FORMAT).to_string(),
            emotions_caption: msg
                .emotions
                .as_ref()
                .filter(|emotions| !emotions.is_empty())
                .map(|emotions| emotions.caption()),
        })
        .collect()
}

fn current_bars(snapshot: &StateSnapshot) -> Option<EmotionBars> {
    let emotions = snapshot.current_emotions.as_ref()?;
    if emotions.is_empty() {
        return None;
    }

    let mut bars = EmotionBars::default();
    for entry in emotions.iter() {
        bars.labels.push(entry.emotion.clone());
        bars.scores.push(entry.score);
    }
    Some(bars)
}

/// Group every retained score by emotion, series in first-seen order
fn emotion_trends(snapshot: &StateSnapshot) -> Vec<EmotionSeries> {
    let mut series: Vec<EmotionSeries> = Vec::new();

    for msg in &snapshot.messages {
        let Some(emotions) = &msg.emotions else {
            continue;
        };

        for entry in emotions.iter() {
            let point = TrendPoint {
                timestamp: msg.timestamp,
                score: entry.score,
                role: msg.role,
            };

            match series.iter_mut().find(|s| s.emotion == entry.emotion) {
                Some(existing) => existing.points.push(point),
                None => series.push(EmotionSeries {
                    emotion: entry.emotion.clone(),
                    points: vec![point],
                }),
            }
        }
    }

    series
}

/// The newest `limit` log entries, newest first
fn recent_logs(snapshot: &StateSnapshot, limit: usize) -> Vec<LogView> {
    snapshot
        .logs
        .iter()
        .rev()
        .take(limit)
        .map(|log| LogView {
            time: log.timestamp.format(TIME_FORMAT).to_string(),
            text: log.text.clone(),
            category: log.category,
        })
        .collect()
}
