use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Post-call summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Language-completion settings for post-call summaries and sentiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Chat completions base URL.  Defaults to the provider's `api_base`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_500")]
    pub summary_max_tokens: u32,
    #[serde(default = "d_300")]
    pub sentiment_max_tokens: u32,
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: d_model(),
            temperature: d_temperature(),
            summary_max_tokens: 500,
            sentiment_max_tokens: 300,
            timeout_ms: 60_000,
        }
    }
}

fn d_model() -> String {
    "gpt-4".into()
}

fn d_temperature() -> f32 {
    0.3
}

fn d_500() -> u32 {
    500
}

fn d_300() -> u32 {
    300
}

fn d_60000() -> u64 {
    60_000
}
