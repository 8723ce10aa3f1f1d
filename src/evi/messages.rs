use base64::Engine;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Inbound (EVI → client)
// ============================================================================

/// An event received on the EVI chat socket
///
/// Only the kinds the reducer acts on are decoded; everything else is kept
/// as its `type` string.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeEvent {
    ChatMetadata(ChatMetadataEvent),
    UserMessage(ChatMessageEvent),
    AssistantMessage(ChatMessageEvent),
    AudioOutput(AudioOutputEvent),
    Error(ErrorEvent),
    Other { kind: String },
}

impl SubscribeEvent {
    /// Decode one text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Tag {
            #[serde(rename = "type")]
            kind: String,
        }

        let tag: Tag = serde_json::from_str(text)?;

        let event = match tag.kind.as_str() {
            "chat_metadata" => Self::ChatMetadata(serde_json::from_str(text)?),
            "user_message" => Self::UserMessage(serde_json::from_str(text)?),
            "assistant_message" => Self::AssistantMessage(serde_json::from_str(text)?),
            "audio_output" => Self::AudioOutput(serde_json::from_str(text)?),
            "error" => Self::Error(serde_json::from_str(text)?),
            _ => Self::Other { kind: tag.kind },
        };

        Ok(event)
    }

    /// The wire `type` of this event
    pub fn kind(&self) -> &str {
        match self {
            Self::ChatMetadata(_) => "chat_metadata",
            Self::UserMessage(_) => "user_message",
            Self::AssistantMessage(_) => "assistant_message",
            Self::AudioOutput(_) => "audio_output",
            Self::Error(_) => "error",
            Self::Other { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMetadataEvent {
    pub chat_id: String,
    pub chat_group_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessageEvent {
    pub message: ChatMessage,
    #[serde(default)]
    pub models: Inference,
    #[serde(default)]
    pub from_text: bool,
    #[serde(default)]
    pub interim: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Model outputs attached to a message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Inference {
    #[serde(default)]
    pub prosody: Option<ProsodyInference>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProsodyInference {
    pub scores: EmotionScores,
}

/// Prosody scores in the order the server sent them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionScores(pub Vec<(String, f64)>);

impl<'de> Deserialize<'de> for EmotionScores {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = EmotionScores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of emotion name to score")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut scores = Vec::with_capacity(map.size_hint().unwrap_or(48));
                while let Some((emotion, score)) = map.next_entry::<String, f64>()? {
                    scores.push((emotion, score));
                }
                Ok(EmotionScores(scores))
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioOutputEvent {
    /// Base64-encoded WAV clip
    pub data: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub slug: Option<String>,
}

// ============================================================================
// Outbound (client → EVI)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublishMessage {
    /// Base64-encoded audio in the format declared by `session_settings`
    AudioInput { data: String },
    SessionSettings { audio: AudioSettings },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSettings {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PublishMessage {
    pub fn audio_input(pcm_bytes: &[u8]) -> Self {
        Self::AudioInput {
            data: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
        }
    }

    /// Declare little-endian 16-bit PCM input
    pub fn linear16_settings(sample_rate: u32, channels: u16) -> Self {
        Self::SessionSettings {
            audio: AudioSettings {
                encoding: "linear16".to_string(),
                sample_rate,
                channels,
            },
        }
    }
}
