use serde::{Deserialize, Serialize};

/// Input-audio transcription requested from the provider when a call is
/// accepted.  When disabled, no transcript segments are recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_language")]
    pub language: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: d_model(),
            language: d_language(),
        }
    }
}

fn d_true() -> bool {
    true
}

fn d_model() -> String {
    "gpt-4o-transcribe".into()
}

fn d_language() -> String {
    "en".into()
}
