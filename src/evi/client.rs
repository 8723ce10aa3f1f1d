use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::auth::fetch_access_token;
use super::messages::{PublishMessage, SubscribeEvent};
use crate::config::Credentials;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How the chat socket authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum EviAuth {
    ApiKey(String),
    AccessToken(String),
}

impl std::fmt::Debug for EviAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EviAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            EviAuth::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub evi_url: String,
    pub config_id: String,
    pub auth: EviAuth,
}

impl ConnectOptions {
    /// Pick the authentication mode: a secret key means "fetch an access
    /// token", otherwise the API key goes on the query string.
    pub async fn resolve(credentials: &Credentials, evi_url: &str, token_url: &str) -> Result<Self> {
        let auth = if credentials.secret_key.trim().is_empty() {
            EviAuth::ApiKey(credentials.api_key.clone())
        } else {
            let token =
                fetch_access_token(token_url, &credentials.api_key, &credentials.secret_key)
                    .await?;
            EviAuth::AccessToken(token)
        };

        Ok(Self {
            evi_url: evi_url.to_string(),
            config_id: credentials.config_id.clone(),
            auth,
        })
    }

    /// Full websocket URL including query parameters
    pub fn url(&self) -> String {
        let mut params = Vec::new();

        if !self.config_id.is_empty() {
            params.push(format!("config_id={}", urlencoding::encode(&self.config_id)));
        }

        match &self.auth {
            EviAuth::ApiKey(key) => params.push(format!("api_key={}", urlencoding::encode(key))),
            EviAuth::AccessToken(token) => {
                params.push(format!("access_token={}", urlencoding::encode(token)))
            }
        }

        let separator = if self.evi_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.evi_url, separator, params.join("&"))
    }
}

pub struct EviClient;

impl EviClient {
    /// Open a chat socket and split it into its two halves
    pub async fn connect(options: &ConnectOptions) -> Result<(EviSender, EviReceiver)> {
        info!("Connecting to EVI at {}", options.evi_url);

        let (stream, response) = connect_async(options.url())
            .await
            .context("Failed to connect to EVI")?;

        info!("Connected to EVI (HTTP {})", response.status());

        let (sink, stream) = stream.split();

        Ok((
            EviSender { sink },
            EviReceiver {
                stream,
                failed: false,
            },
        ))
    }
}

/// Write half of the chat socket
pub struct EviSender {
    sink: SplitSink<WsStream, WsMessage>,
}

impl EviSender {
    pub async fn send(&mut self, message: &PublishMessage) -> Result<()> {
        let payload = serde_json::to_string(message)?;

        self.sink
            .send(WsMessage::Text(payload))
            .await
            .context("Failed to send EVI message")?;

        Ok(())
    }

    /// Send one chunk of little-endian PCM
    pub async fn send_audio(&mut self, pcm_bytes: &[u8]) -> Result<()> {
        self.send(&PublishMessage::audio_input(pcm_bytes)).await
    }

    /// Start the websocket closing handshake
    pub async fn close(&mut self) -> Result<()> {
        info!("Closing EVI connection");

        self.sink
            .send(WsMessage::Close(None))
            .await
            .context("Failed to send close frame")?;
        self.sink.close().await.ok();

        Ok(())
    }
}

/// Read half of the chat socket
pub struct EviReceiver {
    stream: SplitStream<WsStream>,
    /// Set after a transport error; the socket is not read again
    failed: bool,
}

impl EviReceiver {
    /// Next decoded event; `None` once the socket is closed.
    ///
    /// A frame that fails to decode yields `Some(Err(_))` and reading can
    /// continue. A transport error is returned once, after which the
    /// receiver reports `None`.
    ///
    /// Cancel-safe: a frame is either fully consumed and returned, or left
    /// in the stream.
    pub async fn next_event(&mut self) -> Option<Result<SubscribeEvent>> {
        if self.failed {
            return None;
        }

        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(anyhow::Error::new(e).context("EVI socket failed")));
                }
            };

            match frame {
                WsMessage::Text(text) => {
                    return Some(
                        SubscribeEvent::parse(&text).context("Failed to decode EVI event"),
                    );
                }
                WsMessage::Close(frame) => {
                    info!("EVI closed the connection: {:?}", frame);
                    return None;
                }
                other => {
                    debug!("Ignoring non-text frame ({} bytes)", other.len());
                }
            }
        }
    }
}
