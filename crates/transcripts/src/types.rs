use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::Sentiment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Patient,
    Agent,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::Patient => "patient",
            Speaker::Agent => "agent",
        }
    }

    /// Upper-case label used in assembled transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Speaker::Patient => "PATIENT",
            Speaker::Agent => "AGENT",
        }
    }

    pub(crate) fn from_db(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("patient") {
            Speaker::Patient
        } else {
            Speaker::Agent
        }
    }
}

/// One transcribed utterance, unique per `(call_id, item_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub call_id: String,
    pub item_id: String,
    pub speaker: Speaker,
    pub text: String,
    pub agent_name: String,
    pub recorded_at: DateTime<Utc>,
}

impl TranscriptSegment {
    pub fn patient(
        call_id: impl Into<String>,
        item_id: impl Into<String>,
        text: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            item_id: item_id.into(),
            speaker: Speaker::Patient,
            text: text.into(),
            agent_name: agent_name.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// The post-call summary row, one per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    pub call_id: String,
    pub summary_text: String,
    pub full_transcript: String,
    pub sentiment: Sentiment,
    pub agent_name: String,
    pub created_at: DateTime<Utc>,
}

/// A row of the `voxgate calls` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentCall {
    pub call_id: String,
    pub first_recorded_at: DateTime<Utc>,
    pub segments: u32,
    pub agent_name: Option<String>,
    pub overall_sentiment: Option<String>,
}
