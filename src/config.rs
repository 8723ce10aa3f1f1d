use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub hume: HumeConfig,
    pub audio: AudioConfig,
    pub session: SessionTimingConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Vendor endpoints and default credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HumeConfig {
    pub api_key: String,
    pub secret_key: String,
    pub config_id: String,
    pub evi_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture the default microphone and stream it to EVI
    pub capture: bool,
    /// Play assistant speech on the default output device
    pub playback: bool,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionTimingConfig {
    /// How long `stop` waits for the driver before aborting it
    pub shutdown_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub refresh_interval_ms: u64,
    pub max_messages: usize,
    pub max_logs: usize,
    pub visible_messages: usize,
    pub visible_logs: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "hume-voice-chat".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl Default for HumeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            config_id: String::new(),
            evi_url: "wss://api.hume.ai/v0/evi/chat".to_string(),
            token_url: "https://api.hume.ai/oauth2-cc/token".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture: true,
            playback: true,
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

impl Default for SessionTimingConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 5000,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2000,
            max_messages: 500,
            max_logs: 1000,
            visible_messages: 10,
            visible_logs: 50,
        }
    }
}

impl HumeConfig {
    /// Fill blank credentials from `HUME_API_KEY`, `HUME_SECRET_KEY` and `HUME_CONFIG_ID`
    pub fn fill_from_env(&mut self) {
        fill_blank(&mut self.api_key, "HUME_API_KEY");
        fill_blank(&mut self.secret_key, "HUME_SECRET_KEY");
        fill_blank(&mut self.config_id, "HUME_CONFIG_ID");
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            secret_key: self.secret_key.clone(),
            config_id: self.config_id.clone(),
        }
    }
}

fn fill_blank(slot: &mut String, var: &str) {
    if slot.trim().is_empty() {
        if let Ok(value) = std::env::var(var) {
            *slot = value;
        }
    }
}

/// The three strings needed to open an EVI chat
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub config_id: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty()
            && !self.secret_key.trim().is_empty()
            && !self.config_id.trim().is_empty()
    }

    /// Fields left blank in `self` are taken from `defaults`
    pub fn or_defaults(self, defaults: &Credentials) -> Credentials {
        fn pick(value: String, fallback: &str) -> String {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value
            }
        }

        Credentials {
            api_key: pick(self.api_key, &defaults.api_key),
            secret_key: pick(self.secret_key, &defaults.secret_key),
            config_id: pick(self.config_id, &defaults.config_id),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("config_id", &self.config_id)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Config {
    /// Load configuration from `path` (any format the `config` crate knows, extension optional),
    /// overridden by `HUME_VOICE__SECTION__KEY` environment variables.
    ///
    /// A missing file is not an error; every value has a default.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("HUME_VOICE").separator("__"))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;
        cfg.hume.fill_from_env();

        Ok(cfg)
    }
}
