use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Realtime call provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the external realtime call provider (SIP
/// connector, accept endpoint and per-call event stream).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// REST base URL used for `POST /v1/realtime/calls/{id}/accept`.
    #[serde(default = "d_api_base")]
    pub api_base: String,
    /// WebSocket base URL used for `/v1/realtime?call_id={id}`.
    #[serde(default = "d_ws_base")]
    pub realtime_ws_base: String,
    /// Realtime model named in accept payloads and session updates.
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Environment variable holding the webhook signing secret.
    #[serde(default = "d_secret_env")]
    pub webhook_secret_env: String,
    #[serde(default = "d_10000")]
    pub accept_timeout_ms: u64,
    #[serde(default = "d_10000")]
    pub connect_timeout_ms: u64,
    /// A call's event stream that yields nothing for this long is treated
    /// as closed.
    #[serde(default = "d_300000")]
    pub stream_idle_timeout_ms: u64,
    /// WebSocket keepalive ping period.  A stream with no inbound traffic
    /// (pongs included) for two periods is dropped.
    #[serde(default = "d_20000")]
    pub stream_ping_interval_ms: u64,
    /// Maximum allowed clock skew between the webhook timestamp and now.
    #[serde(default = "d_300")]
    pub signature_tolerance_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: d_api_base(),
            realtime_ws_base: d_ws_base(),
            model: d_model(),
            auth: AuthConfig::default(),
            webhook_secret_env: d_secret_env(),
            accept_timeout_ms: 10_000,
            connect_timeout_ms: 10_000,
            stream_idle_timeout_ms: 300_000,
            stream_ping_interval_ms: 20_000,
            signature_tolerance_secs: 300,
        }
    }
}

/// How to find an API key.  `key` wins over `env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Plaintext key (discouraged; logged as a warning when used).
    #[serde(default)]
    pub key: Option<String>,
    /// Environment variable to read the key from.
    #[serde(default = "d_key_env")]
    pub env: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key: None,
            env: d_key_env(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_base() -> String {
    "https://api.openai.com".into()
}

fn d_ws_base() -> String {
    "wss://api.openai.com".into()
}

fn d_model() -> String {
    "gpt-realtime".into()
}

fn d_secret_env() -> String {
    "OPENAI_WEBHOOK_SECRET".into()
}

fn d_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".into())
}

fn d_10000() -> u64 {
    10_000
}

fn d_300000() -> u64 {
    300_000
}

fn d_20000() -> u64 {
    20_000
}

fn d_300() -> u64 {
    300
}
