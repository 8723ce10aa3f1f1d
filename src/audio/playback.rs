use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Destination for assistant speech
///
/// `play` receives one raw `audio_output` payload (a WAV clip) and must not
/// block for the duration of the clip.
pub trait AudioSink: Send + Sync {
    fn play(&self, clip: Vec<u8>) -> Result<()>;

    /// Get sink name for logging
    fn name(&self) -> &str;
}

/// Discards audio, keeping counts (headless runs and tests)
#[derive(Debug, Default)]
pub struct NullSink {
    clips: AtomicUsize,
    bytes: AtomicUsize,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clips_received(&self) -> usize {
        self.clips.load(Ordering::SeqCst)
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes.load(Ordering::SeqCst)
    }
}

impl AudioSink for NullSink {
    fn play(&self, clip: Vec<u8>) -> Result<()> {
        self.clips.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(clip.len(), Ordering::SeqCst);
        debug!("Discarding {} bytes of assistant audio", clip.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(feature = "audio-io")]
pub use speaker::SpeakerSink;

#[cfg(feature = "audio-io")]
mod speaker {
    use super::AudioSink;
    use crate::audio::convert::resample_mono_f32;
    use crate::audio::wav::decode_wav;
    use anyhow::{anyhow, Context, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use tracing::{error, info};

    /// Plays clips on the default output device
    ///
    /// The cpal stream lives on its own thread; clips are decoded on the
    /// caller's thread and appended to a shared sample queue.
    pub struct SpeakerSink {
        queue: Arc<Mutex<VecDeque<f32>>>,
        device_rate: u32,
        shutdown_tx: Mutex<Option<std_mpsc::Sender<()>>>,
        thread: Mutex<Option<JoinHandle<()>>>,
    }

    impl SpeakerSink {
        pub fn new() -> Result<Self> {
            let queue = Arc::new(Mutex::new(VecDeque::new()));
            let (ready_tx, ready_rx) = std_mpsc::channel::<Result<u32, String>>();
            let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

            let thread_queue = Arc::clone(&queue);
            let thread = std::thread::Builder::new()
                .name("speaker".to_string())
                .spawn(move || {
                    let stream = match build_output_stream(thread_queue) {
                        Ok((stream, rate)) => {
                            let _ = ready_tx.send(Ok(rate));
                            stream
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };

                    // Park until the sink is dropped
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    info!("Speaker stream stopped");
                })
                .context("Failed to spawn speaker thread")?;

            let device_rate = ready_rx
                .recv()
                .context("Speaker thread exited during setup")?
                .map_err(|e| anyhow!(e))?;

            Ok(Self {
                queue,
                device_rate,
                shutdown_tx: Mutex::new(Some(shutdown_tx)),
                thread: Mutex::new(Some(thread)),
            })
        }
    }

    fn build_output_stream(queue: Arc<Mutex<VecDeque<f32>>>) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: cpal::StreamConfig = device
            .default_output_config()
            .context("Failed to get output config")?
            .into();
        let channels = config.channels as usize;
        let rate = config.sample_rate.0;

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = queue.lock();
                    for frame in data.chunks_mut(channels) {
                        let sample = queue.pop_front().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                err_fn,
                None,
            )
            .context("Failed to build output stream")?;

        stream.play().context("Failed to start output stream")?;

        Ok((stream, rate))
    }

    impl AudioSink for SpeakerSink {
        fn play(&self, clip: Vec<u8>) -> Result<()> {
            let decoded = decode_wav(&clip)?;
            let samples = resample_mono_f32(&decoded.samples, decoded.sample_rate, self.device_rate);
            self.queue.lock().extend(samples);
            Ok(())
        }

        fn name(&self) -> &str {
            "speaker"
        }
    }

    impl Drop for SpeakerSink {
        fn drop(&mut self) {
            self.shutdown_tx.lock().take();
            if let Some(thread) = self.thread.lock().take() {
                let _ = thread.join();
            }
        }
    }
}
