use std::path::Path;

use anyhow::Context;

use vm_transcripts::TranscriptStore;

/// `voxgate export`: write one call as JSON and print the path.
pub async fn export(
    store: &dyn TranscriptStore,
    call_id: &str,
    export_dir: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let path = vm_transcripts::export_call(store, call_id, export_dir, output)
        .await
        .with_context(|| format!("exporting call {call_id}"))?;
    println!("Exported {call_id} to {}", path.display());
    Ok(())
}
