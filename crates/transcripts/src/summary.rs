//! Post-call summary and sentiment generation.

use std::sync::Arc;

use chrono::Utc;

use vm_domain::config::SummaryConfig;
use vm_domain::trace::TraceEvent;
use vm_providers::{ChatRequest, LlmProvider, Message};

use crate::recorder::assemble_full_transcript;
use crate::sentiment::Sentiment;
use crate::store::TranscriptStore;
use crate::types::CallSummary;

const SUMMARY_INSTRUCTIONS: &str = "You are a medical assistant summarizing patient calls. \
Create a concise summary with:\n\
1. Patient Information (name if mentioned)\n\
2. Reason for Call\n\
3. Key Discussion Points\n\
4. Action Items/Outcome\n\
5. Follow-up Required (if any)\n\n\
Keep it professional and under 200 words.";

const SENTIMENT_INSTRUCTIONS: &str = "Analyze the patient's sentiment and emotional state \
in this medical call. Provide:\n\
1. Overall sentiment (positive/neutral/negative/urgent)\n\
2. Confidence score (0-100)\n\
3. Key emotions detected (e.g., anxious, frustrated, satisfied, confused, worried)\n\
4. Any concerns or red flags (e.g., pain level, urgency, dissatisfaction)\n\
5. Patient satisfaction indicator (satisfied/neutral/dissatisfied)\n\n\
Return as JSON with these exact keys: overall_sentiment, confidence, \
key_emotions (array), concerns (array), satisfaction";

/// Builds and stores the one-per-call summary row.
#[derive(Clone)]
pub struct SummaryGenerator {
    store: Arc<dyn TranscriptStore>,
    llm: Arc<dyn LlmProvider>,
    config: SummaryConfig,
}

impl SummaryGenerator {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        llm: Arc<dyn LlmProvider>,
        config: SummaryConfig,
    ) -> Self {
        Self { store, llm, config }
    }

    /// Summarize `call_id` and upsert the result.
    ///
    /// Returns `None` (and writes nothing) when the call has no segments,
    /// when the summary completion fails, or when the row cannot be stored.
    /// A failed sentiment request only degrades the sentiment field.
    pub async fn generate(&self, call_id: &str, agent_name: &str) -> Option<CallSummary> {
        let segments = match self.store.segments_for_call(call_id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(call_id, error = %e, "loading segments for summary failed");
                return None;
            }
        };
        if segments.is_empty() {
            tracing::info!(call_id, "no transcript recorded, skipping summary");
            return None;
        }
        let full_transcript = assemble_full_transcript(&segments);

        let summary_text = match self
            .complete(
                SUMMARY_INSTRUCTIONS,
                format!("Summarize this medical centre call:\n\n{full_transcript}"),
                self.config.summary_max_tokens,
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(call_id, error = %e, "summary completion failed");
                return None;
            }
        };

        let sentiment = self.analyze_sentiment(call_id, &full_transcript).await;

        let summary = CallSummary {
            call_id: call_id.to_owned(),
            summary_text,
            full_transcript,
            sentiment,
            agent_name: agent_name.to_owned(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.upsert_summary(&summary).await {
            tracing::error!(call_id, error = %e, "storing call summary failed");
            return None;
        }

        TraceEvent::SummaryGenerated {
            call_id: call_id.to_owned(),
            agent: agent_name.to_owned(),
            overall_sentiment: summary.sentiment.overall_sentiment.clone(),
            summary_chars: summary.summary_text.chars().count(),
        }
        .emit();

        Some(summary)
    }

    async fn analyze_sentiment(&self, call_id: &str, full_transcript: &str) -> Sentiment {
        let content = match self
            .complete(
                SENTIMENT_INSTRUCTIONS,
                format!("Analyze patient sentiment:\n\n{full_transcript}"),
                self.config.sentiment_max_tokens,
            )
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(call_id, error = %e, "sentiment completion failed");
                return Sentiment::analysis_failed();
            }
        };

        match Sentiment::parse(&content) {
            Some(s) => {
                tracing::debug!(
                    call_id,
                    overall = %s.overall_sentiment,
                    confidence = s.confidence,
                    "sentiment analysed"
                );
                s
            }
            None => {
                tracing::warn!(call_id, "sentiment response carried no JSON object");
                Sentiment::analysis_failed()
            }
        }
    }

    async fn complete(
        &self,
        system: &str,
        user: String,
        max_tokens: u32,
    ) -> vm_domain::error::Result<String> {
        let req = ChatRequest {
            messages: vec![Message::system(system), Message::user(user)],
            temperature: Some(self.config.temperature),
            max_tokens: Some(max_tokens),
            model: Some(self.config.model.clone()),
        };
        Ok(self.llm.chat(&req).await?.content)
    }
}
