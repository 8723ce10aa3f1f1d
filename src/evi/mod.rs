pub mod auth;
pub mod client;
pub mod messages;

pub use client::{ConnectOptions, EviAuth, EviClient, EviReceiver, EviSender};
pub use messages::{
    AudioOutputEvent, ChatMessage, ChatMessageEvent, ChatMetadataEvent, EmotionScores, ErrorEvent,
    Inference, ProsodyInference, PublishMessage, SubscribeEvent,
};
