// Microphone capture backend (cpal)

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::convert::f32_to_i16;

/// Captures the default input device
///
/// The cpal stream is owned by a dedicated thread (streams are not `Send`
/// on every platform); frames reach async code through a bounded channel.
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    shutdown_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            shutdown_tx: None,
            thread: None,
            capturing: false,
        }
    }
}

fn build_input_stream(frame_tx: mpsc::Sender<AudioFrame>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let config: cpal::StreamConfig = device
        .default_input_config()
        .context("Failed to get input config")?
        .into();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let captured = Arc::new(AtomicU64::new(0));

    let err_fn = |err| {
        error!("Audio input stream error: {}", err);
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let frames = data.len() as u64 / channels.max(1) as u64;
                let start = captured.fetch_add(frames, Ordering::SeqCst);

                let frame = AudioFrame {
                    samples: data.iter().map(|&s| f32_to_i16(s)).collect(),
                    sample_rate,
                    channels,
                    timestamp_ms: start * 1000 / sample_rate.max(1) as u64,
                };

                if let Err(e) = frame_tx.try_send(frame) {
                    debug!("Dropping audio frame: {}", e);
                }
            },
            err_fn,
            None,
        )
        .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;

    Ok(stream)
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            bail!("Already capturing");
        }

        info!("Starting microphone capture");

        // ~2s of buffered frames at the configured latency
        let capacity = (2000 / self.config.buffer_duration_ms.max(1)).max(4) as usize;
        let (frame_tx, frame_rx) = mpsc::channel(capacity);
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), String>>();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || {
                let stream = match build_input_stream(frame_tx) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .context("Failed to spawn microphone thread")?;

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Microphone setup task failed")?
            .context("Microphone thread exited during setup")?;
        ready.map_err(|e| anyhow!(e))?;

        self.shutdown_tx = Some(shutdown_tx);
        self.thread = Some(thread);
        self.capturing = true;

        info!("Microphone capture started");

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping microphone capture");

        self.shutdown_tx.take();
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .context("Microphone join task failed")?
                .map_err(|_| anyhow!("Microphone thread panicked"))?;
        }

        self.capturing = false;

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        self.shutdown_tx.take();
    }
}
