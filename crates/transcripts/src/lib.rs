//! Durable call records: transcript segments, post-call summaries and
//! the JSON export used by operators.

pub mod export;
pub mod migrations;
pub mod recorder;
pub mod sentiment;
pub mod store;
pub mod summary;
pub mod types;

pub use export::{export_call, ExportDocument};
pub use recorder::{assemble_full_transcript, TranscriptRecorder};
pub use sentiment::Sentiment;
pub use store::{SqliteTranscriptStore, TranscriptStore};
pub use summary::SummaryGenerator;
pub use types::{CallSummary, RecentCall, Speaker, TranscriptSegment};
