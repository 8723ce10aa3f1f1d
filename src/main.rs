use anyhow::{Context, Result};
use clap::Parser;
use hume_voice_chat::{create_router, AppState, AudioSink, Config, NullSink};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Browser dashboard for Hume EVI voice chats
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/hume-voice-chat")]
    config: String,

    /// Address to bind the HTTP server to
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Do not open the microphone (listen-only chats)
    #[arg(long)]
    no_capture: bool,

    /// Do not play assistant speech
    #[arg(long)]
    no_playback: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config).context("Failed to load configuration")?;

    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }
    if args.no_capture {
        cfg.audio.capture = false;
    }
    if args.no_playback {
        cfg.audio.playback = false;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("EVI endpoint: {}", cfg.hume.evi_url);
    info!(
        "Credentials preconfigured: {}",
        cfg.hume.credentials().is_complete()
    );

    let playback = create_playback(&cfg);
    info!("Audio playback: {}", playback.name());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let app = create_router(AppState::with_playback(cfg, playback));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Dashboard available at http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

fn create_playback(cfg: &Config) -> Arc<dyn AudioSink> {
    if !cfg.audio.playback {
        return Arc::new(NullSink::new());
    }

    #[cfg(feature = "audio-io")]
    {
        match hume_voice_chat::audio::SpeakerSink::new() {
            Ok(sink) => return Arc::new(sink),
            Err(e) => warn!("Speaker unavailable, assistant audio will be discarded: {}", e),
        }
    }

    #[cfg(not(feature = "audio-io"))]
    warn!("Built without the `audio-io` feature, assistant audio will be discarded");

    Arc::new(NullSink::new())
}
