//! Outbound calls to the realtime provider: the REST accept request and the
//! per-call WebSocket event stream.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use vm_domain::config::{ProviderConfig, TranscriptionConfig};
use vm_domain::error::{Error, Result};
use vm_protocol::{Command, SESSION_TYPE_REALTIME};
use vm_providers::util::from_reqwest;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Accept payload
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Body of `POST /v1/realtime/calls/{call_id}/accept`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub model: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioConfig {
    pub input: AudioInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInput {
    pub transcription: TranscriptionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionSpec {
    pub model: String,
    pub language: String,
}

impl AcceptPayload {
    pub fn new(model: &str, instructions: &str, transcription: &TranscriptionConfig) -> Self {
        let audio = transcription.enabled.then(|| AudioConfig {
            input: AudioInput {
                transcription: TranscriptionSpec {
                    model: transcription.model.clone(),
                    language: transcription.language.clone(),
                },
            },
        });
        Self {
            kind: SESSION_TYPE_REALTIME,
            model: model.to_owned(),
            instructions: instructions.to_owned(),
            audio,
        }
    }
}

/// The provider refused the accept request or could not be reached.
#[derive(Debug, Clone, thiserror::Error)]
#[error("accept failed{}: {reason}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct AcceptError {
    pub status: Option<u16>,
    pub reason: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Seams
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Call-control operations offered by the realtime provider.
#[async_trait::async_trait]
pub trait CallControl: Send + Sync {
    /// Ask the provider to answer `call_id`.  Only a 2xx counts as success.
    async fn accept_call(
        &self,
        call_id: &str,
        payload: &AcceptPayload,
    ) -> std::result::Result<(), AcceptError>;

    /// Open the bidirectional event stream for an accepted call.
    async fn open_stream(&self, call_id: &str) -> Result<Box<dyn CallStream>>;
}

/// One call's event stream.
#[async_trait::async_trait]
pub trait CallStream: Send {
    async fn send(&mut self, command: &Command) -> Result<()>;

    /// The next inbound frame, or `None` once the stream has closed.
    /// Transport errors end the stream.
    async fn next_frame(&mut self) -> Option<Vec<u8>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RealtimeClient {
    http: reqwest::Client,
    api_base: String,
    ws_base: String,
    api_key: String,
    connect_timeout: Duration,
    ping_interval: Duration,
}

impl RealtimeClient {
    pub fn from_config(cfg: &ProviderConfig, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.accept_timeout_ms))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            ws_base: cfg.realtime_ws_base.trim_end_matches('/').to_string(),
            api_key,
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            ping_interval: Duration::from_millis(cfg.stream_ping_interval_ms),
        })
    }

    pub fn accept_url(&self, call_id: &str) -> String {
        format!("{}/v1/realtime/calls/{call_id}/accept", self.api_base)
    }

    pub fn stream_url(&self, call_id: &str) -> String {
        format!("{}/v1/realtime?call_id={call_id}", self.ws_base)
    }
}

#[async_trait::async_trait]
impl CallControl for RealtimeClient {
    async fn accept_call(
        &self,
        call_id: &str,
        payload: &AcceptPayload,
    ) -> std::result::Result<(), AcceptError> {
        let url = self.accept_url(call_id);
        tracing::debug!(call_id, url = %url, model = %payload.model, "accepting call");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| AcceptError {
                status: None,
                reason: from_reqwest(e).to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(AcceptError {
            status: Some(status.as_u16()),
            reason: body,
        })
    }

    async fn open_stream(&self, call_id: &str) -> Result<Box<dyn CallStream>> {
        let url = self.stream_url(call_id);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Http(format!("building stream request: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::Auth("API key is not a valid header value".into()))?;
        request.headers_mut().insert("Authorization", bearer);

        let (ws, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| Error::Timeout(format!("connecting to {url}")))?
                .map_err(|e| Error::Http(format!("connecting to {url}: {e}")))?;

        tracing::info!(call_id, "event stream connected");
        Ok(Box::new(WsCallStream::new(call_id, ws, self.ping_interval)))
    }
}

/// Event stream over a provider WebSocket.  Pings every `ping_interval`
/// and gives up once nothing, pongs included, has arrived for two periods.
struct WsCallStream {
    call_id: String,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    keepalive: Interval,
    ping_interval: Duration,
    last_inbound: Instant,
}

impl WsCallStream {
    fn new(
        call_id: &str,
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        ping_interval: Duration,
    ) -> Self {
        let mut keepalive = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            call_id: call_id.to_owned(),
            ws,
            keepalive,
            ping_interval,
            last_inbound: Instant::now(),
        }
    }
}

#[async_trait::async_trait]
impl CallStream for WsCallStream {
    async fn send(&mut self, command: &Command) -> Result<()> {
        let json = vm_protocol::encode(command)?;
        self.ws
            .send(Message::Text(json))
            .await
            .map_err(|e| Error::Provider {
                provider: "realtime".into(),
                message: format!("sending {}: {e}", command.kind()),
            })
    }

    async fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            tokio::select! {
                msg = self.ws.next() => {
                    self.last_inbound = Instant::now();
                    match msg? {
                        Ok(Message::Text(text)) => return Some(text.into_bytes()),
                        Ok(Message::Binary(bytes)) => return Some(bytes),
                        Ok(Message::Close(frame)) => {
                            tracing::info!(call_id = %self.call_id, ?frame, "event stream closed by provider");
                            return None;
                        }
                        // Inbound pings are answered by tungstenite itself.
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::warn!(call_id = %self.call_id, error = %e, "event stream transport error");
                            return None;
                        }
                    }
                }
                _ = self.keepalive.tick() => {
                    if self.last_inbound.elapsed() >= self.ping_interval * 2 {
                        tracing::warn!(
                            call_id = %self.call_id,
                            silent = ?self.last_inbound.elapsed(),
                            "no traffic from provider, dropping event stream"
                        );
                        return None;
                    }
                    if let Err(e) = self.ws.send(Message::Ping(Vec::new())).await {
                        tracing::warn!(call_id = %self.call_id, error = %e, "keepalive ping failed");
                        return None;
                    }
                }
            }
        }
    }
}
