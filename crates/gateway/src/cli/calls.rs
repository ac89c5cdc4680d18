use vm_transcripts::{RecentCall, TranscriptStore};

/// `voxgate calls`: print the most recent calls, newest first.
pub async fn list(store: &dyn TranscriptStore, limit: u32) -> anyhow::Result<()> {
    let calls = store.recent_calls(limit as usize).await?;
    print!("{}", render(&calls));
    Ok(())
}

fn render(calls: &[RecentCall]) -> String {
    if calls.is_empty() {
        return "No calls recorded.\n".into();
    }

    let mut out = format!(
        "{:<28} {:<20} {:>8}  {:<14} {}\n",
        "CALL ID", "STARTED (UTC)", "SEGMENTS", "AGENT", "SENTIMENT"
    );
    for call in calls {
        out.push_str(&format!(
            "{:<28} {:<20} {:>8}  {:<14} {}\n",
            call.call_id,
            call.first_recorded_at.format("%Y-%m-%d %H:%M:%S"),
            call.segments,
            call.agent_name.as_deref().unwrap_or("-"),
            call.overall_sentiment.as_deref().unwrap_or("-"),
        ));
    }
    out
}
