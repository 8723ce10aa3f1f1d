pub mod backend;
pub mod convert;
pub mod playback;
pub mod wav;

#[cfg(feature = "audio-io")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use playback::{AudioSink, NullSink};
pub use wav::{decode_wav, DecodedClip};

#[cfg(feature = "audio-io")]
pub use playback::SpeakerSink;
