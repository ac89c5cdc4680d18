use std::sync::Arc;

use vm_domain::error::Result;
use vm_domain::trace::TraceEvent;

use crate::store::TranscriptStore;
use crate::types::TranscriptSegment;

/// Appends speech segments for live calls.
#[derive(Clone)]
pub struct TranscriptRecorder {
    store: Arc<dyn TranscriptStore>,
}

impl TranscriptRecorder {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self { store }
    }

    /// Idempotent upsert keyed by `(call_id, item_id)`.
    pub async fn record(&self, segment: &TranscriptSegment) -> Result<()> {
        self.store.upsert_segment(segment).await?;
        TraceEvent::SegmentRecorded {
            call_id: segment.call_id.clone(),
            item_id: segment.item_id.clone(),
            speaker: segment.speaker.as_str().into(),
            chars: segment.text.chars().count(),
        }
        .emit();
        Ok(())
    }

    pub async fn full_transcript(&self, call_id: &str) -> Result<String> {
        let segments = self.store.segments_for_call(call_id).await?;
        Ok(assemble_full_transcript(&segments))
    }
}

/// `SPEAKER: text` lines joined by `\n`, in the order given.
pub fn assemble_full_transcript(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}: {}", s.speaker.label(), s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteTranscriptStore;
    use crate::types::Speaker;
    use chrono::{Duration, Utc};

    #[test]
    fn assembles_labelled_lines() {
        let now = Utc::now();
        let segs = vec![
            TranscriptSegment {
                recorded_at: now,
                ..TranscriptSegment::patient("c", "1", "My tooth hurts", "receptionist")
            },
            TranscriptSegment {
                speaker: Speaker::Agent,
                recorded_at: now + Duration::seconds(1),
                ..TranscriptSegment::patient("c", "2", "Let me transfer you", "receptionist")
            },
        ];
        assert_eq!(
            assemble_full_transcript(&segs),
            "PATIENT: My tooth hurts\nAGENT: Let me transfer you"
        );
        assert_eq!(assemble_full_transcript(&[]), "");
    }

    #[tokio::test]
    async fn transcript_follows_timestamps_not_arrival() {
        let store = Arc::new(SqliteTranscriptStore::open_in_memory().unwrap());
        let recorder = TranscriptRecorder::new(store);
        let t0 = Utc::now();

        let second = TranscriptSegment {
            recorded_at: t0 + Duration::seconds(5),
            ..TranscriptSegment::patient("c1", "item_b", "I need an appointment", "dentist")
        };
        let first = TranscriptSegment {
            recorded_at: t0,
            ..TranscriptSegment::patient("c1", "item_a", "Hello", "receptionist")
        };
        recorder.record(&second).await.unwrap();
        recorder.record(&first).await.unwrap();

        assert_eq!(
            recorder.full_transcript("c1").await.unwrap(),
            "PATIENT: Hello\nPATIENT: I need an appointment"
        );
    }
}
