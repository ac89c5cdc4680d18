//! JSON export of one call: segments plus summary.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use vm_domain::error::Result;

use crate::store::TranscriptStore;
use crate::types::{CallSummary, TranscriptSegment};

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub call_id: String,
    pub transcripts: Vec<TranscriptSegment>,
    pub summary: Option<CallSummary>,
    pub exported_at: DateTime<Utc>,
}

impl ExportDocument {
    pub async fn collect(store: &dyn TranscriptStore, call_id: &str) -> Result<Self> {
        Ok(Self {
            call_id: call_id.to_owned(),
            transcripts: store.segments_for_call(call_id).await?,
            summary: store.summary_for_call(call_id).await?,
            exported_at: Utc::now(),
        })
    }

    /// `call_<id>_<YYYYmmdd_HHMMSS>.json`
    pub fn default_file_name(&self) -> String {
        format!(
            "call_{}_{}.json",
            self.call_id,
            self.exported_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Write the export for `call_id` to `output`, or into `export_dir` under
/// the default file name.  Returns the written path.
pub async fn export_call(
    store: &dyn TranscriptStore,
    call_id: &str,
    export_dir: &Path,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let doc = ExportDocument::collect(store, call_id).await?;
    let path = match output {
        Some(p) => p.to_path_buf(),
        None => export_dir.join(doc.default_file_name()),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(&doc)?;
    tokio::fs::write(&path, body).await?;

    tracing::info!(
        call_id,
        path = %path.display(),
        segments = doc.transcripts.len(),
        has_summary = doc.summary.is_some(),
        "call exported"
    );
    Ok(path)
}
