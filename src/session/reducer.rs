use base64::Engine;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::audio::AudioSink;
use crate::evi::{ChatMessageEvent, SubscribeEvent};
use crate::state::{
    ChatMetadata, EmotionDistribution, LogCategory, Message, Role, SharedSessionState,
    TOP_EMOTIONS,
};

/// Failures while applying a single event
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid audio payload: {0}")]
    AudioDecode(#[from] base64::DecodeError),
    #[error("playback failed: {0}")]
    Playback(anyhow::Error),
}

/// Applies EVI events and socket lifecycle callbacks to the state holder
///
/// None of the callbacks return errors: failures are stored on the holder
/// and the session carries on.
#[derive(Clone)]
pub struct EventReducer {
    state: SharedSessionState,
    playback: Arc<dyn AudioSink>,
}

impl EventReducer {
    pub fn new(state: SharedSessionState, playback: Arc<dyn AudioSink>) -> Self {
        Self { state, playback }
    }

    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    pub fn on_open(&self) {
        info!("EVI socket opened");
        self.state.update(|s| {
            s.set_connected(true);
            s.log("WebSocket connection opened.", LogCategory::System);
        });
    }

    pub fn on_close(&self) {
        info!("EVI socket closed");
        self.state.update(|s| {
            s.set_connected(false);
            s.log("WebSocket connection closed.", LogCategory::System);
        });
    }

    pub fn on_error(&self, error: &anyhow::Error) {
        warn!("EVI socket error: {:#}", error);
        self.state
            .update(|s| s.record_error(format!("WebSocket error: {:#}", error)));
    }

    /// Apply one inbound event
    pub fn on_message(&self, event: SubscribeEvent) {
        if let Err(e) = self.apply(event) {
            error!("Handler error: {}", e);
            self.state
                .update(|s| s.record_error(format!("Handler error: {}", e)));
        }
    }

    fn apply(&self, event: SubscribeEvent) -> Result<(), HandlerError> {
        match event {
            SubscribeEvent::ChatMetadata(meta) => {
                info!("Chat ID: {}", meta.chat_id);
                self.state.update(|s| {
                    s.log(format!("Chat ID: {}", meta.chat_id), LogCategory::Metadata);
                    s.set_chat_metadata(ChatMetadata {
                        chat_id: meta.chat_id,
                        chat_group_id: meta.chat_group_id,
                    });
                });
            }

            SubscribeEvent::UserMessage(msg) => self.append_message(Role::User, msg),

            SubscribeEvent::AssistantMessage(msg) => self.append_message(Role::Assistant, msg),

            SubscribeEvent::AudioOutput(audio) => {
                let clip = base64::engine::general_purpose::STANDARD.decode(audio.data.as_bytes())?;
                debug!("Audio output: {} bytes", clip.len());
                self.playback.play(clip).map_err(HandlerError::Playback)?;
            }

            SubscribeEvent::Error(err) => {
                let text = format!("Hume API Error ({}): {}", err.code, err.message);
                warn!("{}", text);
                self.state.update(|s| s.record_error(text));
            }

            SubscribeEvent::Other { kind } => {
                debug!("Received {} event", kind);
                self.state
                    .update(|s| s.log(format!("Received {} event", kind), LogCategory::System));
            }
        }

        Ok(())
    }

    /// `fallback` is the role implied by the event type, used when the
    /// message's own role is not one we know
    fn append_message(&self, fallback: Role, event: ChatMessageEvent) {
        let role = Role::from_wire(&event.message.role).unwrap_or_else(|| {
            debug!("Unknown message role {:?}", event.message.role);
            fallback
        });

        let emotions = event
            .models
            .prosody
            .map(|prosody| EmotionDistribution::top_n(prosody.scores.0, TOP_EMOTIONS));

        let message = Message {
            role,
            content: event.message.content.unwrap_or_default(),
            timestamp: Utc::now(),
            emotions: emotions.clone(),
        };

        self.state.update(|s| {
            if let Some(emotions) = emotions {
                s.set_current_emotions(emotions);
            }
            s.push_message(message);
        });
    }
}
