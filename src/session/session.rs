use super::config::SessionConfig;
use super::reducer::EventReducer;
use super::stats::SessionStats;
use crate::audio::convert::{pcm_bytes, process_frame};
use crate::audio::{AudioBackend, AudioBackendFactory, AudioFrame, AudioSink, AudioSource};
use crate::evi::{ConnectOptions, EviClient, EviReceiver, EviSender, PublishMessage};
use crate::state::SharedSessionState;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One EVI chat: a background driver task that streams microphone audio to
/// the vendor and feeds inbound events to the [`EventReducer`].
pub struct ChatSession {
    /// Session configuration
    config: SessionConfig,

    /// State holder the reducer writes into
    state: SharedSessionState,

    /// Where assistant speech goes
    playback: Arc<dyn AudioSink>,

    /// When the session started
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether the driver task is alive
    is_running: Arc<AtomicBool>,

    /// Cancellation signal honored by the driver loop
    stop_tx: watch::Sender<bool>,

    /// Handle for the driver task
    driver_handle: Mutex<Option<JoinHandle<()>>>,

    /// Audio frames forwarded to EVI
    audio_frames_sent: Arc<AtomicUsize>,

    /// Events received from EVI
    events_received: Arc<AtomicUsize>,
}

/// Everything the driver task owns
struct Driver {
    config: SessionConfig,
    reducer: EventReducer,
    stop_rx: watch::Receiver<bool>,
    audio_frames_sent: Arc<AtomicUsize>,
    events_received: Arc<AtomicUsize>,
}

impl ChatSession {
    /// Create a session; nothing is connected until [`start`](Self::start)
    pub fn new(config: SessionConfig, playback: Arc<dyn AudioSink>) -> Self {
        info!("Creating chat session: {}", config.session_id);

        let state = SharedSessionState::new(config.history);
        let (stop_tx, _) = watch::channel(false);

        Self {
            config,
            state,
            playback,
            started_at: Utc::now(),
            is_running: Arc::new(AtomicBool::new(false)),
            stop_tx,
            driver_handle: Mutex::new(None),
            audio_frames_sent: Arc::new(AtomicUsize::new(0)),
            events_received: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// The holder this session writes into
    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Spawn the driver task
    pub async fn start(&self) -> Result<()> {
        let mut handle = self.driver_handle.lock().await;

        if handle.is_some() {
            warn!("Chat session already started");
            return Ok(());
        }

        if *self.stop_tx.borrow() {
            bail!("Chat session {} has already been stopped", self.config.session_id);
        }

        info!("Starting chat session: {}", self.config.session_id);

        self.is_running.store(true, Ordering::SeqCst);

        let driver = Driver {
            config: self.config.clone(),
            reducer: EventReducer::new(self.state.clone(), Arc::clone(&self.playback)),
            stop_rx: self.stop_tx.subscribe(),
            audio_frames_sent: Arc::clone(&self.audio_frames_sent),
            events_received: Arc::clone(&self.events_received),
        };
        let is_running = Arc::clone(&self.is_running);

        *handle = Some(tokio::spawn(async move {
            driver.run().await;
            is_running.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    /// Signal the driver to close the connection and wait for it to finish
    ///
    /// Concurrent callers all wait for the same driver; none of them returns
    /// while it is still running.
    pub async fn stop(&self) -> Result<SessionStats> {
        info!("Stopping chat session: {}", self.config.session_id);

        // Latches even when no driver is subscribed
        self.stop_tx.send_replace(true);

        // Held until the driver is gone so a second stop waits here
        let mut handle = self.driver_handle.lock().await;
        if let Some(task) = handle.as_mut() {
            match tokio::time::timeout(self.config.shutdown_timeout, &mut *task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Driver task panicked: {}", e),
                Err(_) => {
                    warn!(
                        "Driver did not stop within {:?}, aborting",
                        self.config.shutdown_timeout
                    );
                    task.abort();
                    self.is_running.store(false, Ordering::SeqCst);
                    self.state.update(|s| s.set_connected(false));
                }
            }
            handle.take();
        }
        drop(handle);

        info!("Chat session stopped");

        Ok(self.get_stats())
    }

    /// Get current session statistics
    pub fn get_stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let (is_connected, message_count, log_count) = self.state.read(|s| {
            (s.connection().connected, s.message_count(), s.log_count())
        });

        SessionStats {
            session_id: self.config.session_id.clone(),
            is_running: self.is_running(),
            is_connected,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            audio_frames_sent: self.audio_frames_sent.load(Ordering::SeqCst),
            events_received: self.events_received.load(Ordering::SeqCst),
            message_count,
            log_count,
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

impl Driver {
    async fn run(mut self) {
        info!("Chat driver started");

        if let Err(e) = self.chat().await {
            error!("Chat loop error: {:#}", e);
            self.reducer.state().update(|s| {
                s.record_error(format!("Chat loop error: {:#}", e));
                s.set_connected(false);
            });
        }

        info!("Chat driver stopped");
    }

    async fn chat(&mut self) -> Result<()> {
        let config = &self.config;
        let stop_rx = &mut self.stop_rx;

        let connect = async {
            let options =
                ConnectOptions::resolve(&config.credentials, &config.evi_url, &config.token_url)
                    .await?;
            EviClient::connect(&options).await
        };

        let (mut sender, mut receiver) = tokio::select! {
            result = connect => result?,
            _ = stop_rx.changed() => {
                info!("Stop requested before connection was established");
                return Ok(());
            }
        };

        self.reducer.on_open();

        let mut backend = None;
        let outcome = self.stream(&mut sender, &mut receiver, &mut backend).await;

        if let Some(mut backend) = backend {
            if let Err(e) = backend.stop().await {
                error!("Failed to stop audio backend: {}", e);
            }
        }

        self.reducer.on_close();

        outcome
    }

    /// Pump audio out and events in until the socket closes or stop is requested
    async fn stream(
        &mut self,
        sender: &mut EviSender,
        receiver: &mut EviReceiver,
        backend_slot: &mut Option<Box<dyn AudioBackend>>,
    ) -> Result<()> {
        let audio = self.config.audio.clone();

        sender
            .send(&PublishMessage::linear16_settings(
                audio.target_sample_rate,
                audio.target_channels,
            ))
            .await
            .context("Failed to send session settings")?;

        // Without capture the idle sender keeps the channel open and silent
        let (_idle_tx, mut audio_rx) = if self.config.capture_audio {
            let mut backend = AudioBackendFactory::create(AudioSource::Microphone, audio.clone())
                .context("Failed to create audio backend")?;
            let rx = backend
                .start()
                .await
                .context("Failed to start audio capture")?;
            info!("Capturing audio with {}", backend.name());
            *backend_slot = Some(backend);
            (None, rx)
        } else {
            let (tx, rx) = mpsc::channel::<AudioFrame>(1);
            (Some(tx), rx)
        };
        let mut audio_open = true;

        loop {
            tokio::select! {
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        info!("Stop requested, closing EVI connection");
                        if let Err(e) = sender.close().await {
                            warn!("Failed to close EVI connection cleanly: {}", e);
                        }
                        return Ok(());
                    }
                }

                frame = audio_rx.recv(), if audio_open => match frame {
                    Some(frame) => {
                        let processed =
                            process_frame(frame, audio.target_sample_rate, audio.target_channels);
                        sender.send_audio(&pcm_bytes(&processed.samples)).await?;
                        self.audio_frames_sent.fetch_add(1, Ordering::SeqCst);
                    }
                    None => {
                        warn!("Audio capture ended");
                        audio_open = false;
                    }
                },

                event = receiver.next_event() => match event {
                    Some(Ok(event)) => {
                        self.events_received.fetch_add(1, Ordering::SeqCst);
                        self.reducer.on_message(event);
                    }
                    Some(Err(e)) => self.reducer.on_error(&e),
                    None => {
                        info!("EVI connection ended");
                        return Ok(());
                    }
                },
            }
        }
    }
}
