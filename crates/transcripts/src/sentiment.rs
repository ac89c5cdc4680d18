//! Structured sentiment judgment attached to every call summary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// `positive`, `neutral`, `negative`, `urgent` or `unknown`.
    pub overall_sentiment: String,
    /// 0–100.
    pub confidence: u8,
    #[serde(default)]
    pub key_emotions: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<String>,
}

impl Sentiment {
    /// Stored when the completion carries no usable JSON object.
    pub fn analysis_failed() -> Self {
        Self {
            overall_sentiment: "unknown".into(),
            confidence: 0,
            key_emotions: Vec::new(),
            concerns: vec!["analysis_failed".into()],
            satisfaction: None,
        }
    }

    /// Extract the sentiment object from a completion.
    ///
    /// The model sometimes wraps the object in prose or a code fence, so the
    /// text between the first `{` and the last `}` is parsed.  Returns `None`
    /// when there is no such span or it is not a JSON object.
    pub fn parse(content: &str) -> Option<Self> {
        let start = content.find('{')?;
        let end = content.rfind('}')?;
        if end < start {
            return None;
        }
        let raw: RawSentiment = serde_json::from_str(&content[start..=end]).ok()?;
        Some(raw.into())
    }
}

// ── Permissive wire shape ──────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawSentiment {
    #[serde(default)]
    overall_sentiment: Option<String>,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
    #[serde(default)]
    key_emotions: Option<serde_json::Value>,
    #[serde(default)]
    concerns: Option<serde_json::Value>,
    #[serde(default)]
    satisfaction: Option<String>,
}

impl From<RawSentiment> for Sentiment {
    fn from(raw: RawSentiment) -> Self {
        Self {
            overall_sentiment: raw
                .overall_sentiment
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "neutral".into()),
            confidence: raw.confidence.as_ref().map(confidence_of).unwrap_or(0),
            key_emotions: string_list(raw.key_emotions),
            concerns: string_list(raw.concerns),
            satisfaction: raw.satisfaction.filter(|s| !s.trim().is_empty()),
        }
    }
}

fn confidence_of(v: &serde_json::Value) -> u8 {
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    n.round().clamp(0.0, 100.0) as u8
}

fn string_list(v: Option<serde_json::Value>) -> Vec<String> {
    match v {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(serde_json::Value::String(s)) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    }
}
