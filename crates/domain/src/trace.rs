use serde::Serialize;

/// Structured lifecycle events emitted across all voxgate crates.
///
/// Each event is logged as a single JSON line tagged `vx_event`, so call
/// lifecycles can be reconstructed from logs alone.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CallAccepted {
        call_id: String,
        agent: String,
        from: String,
        to: String,
    },
    CallAcceptFailed {
        call_id: String,
        status: Option<u16>,
        reason: String,
    },
    SessionStarted {
        call_id: String,
        agent: String,
        tools: usize,
    },
    AgentTransferred {
        call_id: String,
        from_agent: String,
        to_agent: String,
        reason: String,
    },
    AppointmentRequested {
        call_id: String,
        date: String,
        time: String,
    },
    SegmentRecorded {
        call_id: String,
        item_id: String,
        speaker: String,
        chars: usize,
    },
    SummaryGenerated {
        call_id: String,
        agent: String,
        overall_sentiment: String,
        summary_chars: usize,
    },
    SessionClosed {
        call_id: String,
        agent: String,
        events: u64,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "vx_event");
    }
}
