use vm_transcripts::{SummaryGenerator, TranscriptStore};

/// `voxgate summarize`: regenerate a call's summary through the same upsert
/// path used when a call closes.
///
/// Without `--agent` the summary is attributed to the agent recorded on the
/// call's last segment, or `fallback_agent` when no segment names one.
pub async fn summarize(
    store: &dyn TranscriptStore,
    generator: &SummaryGenerator,
    call_id: &str,
    agent: Option<String>,
    fallback_agent: &str,
) -> anyhow::Result<()> {
    let agent = match agent {
        Some(a) => a,
        None => store
            .segments_for_call(call_id)
            .await?
            .last()
            .map(|s| s.agent_name.clone())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| fallback_agent.to_owned()),
    };

    match generator.generate(call_id, &agent).await {
        Some(summary) => {
            println!("Summary for {call_id} ({agent})");
            println!("Sentiment: {} ({}%)", summary.sentiment.overall_sentiment, summary.sentiment.confidence);
            println!();
            println!("{}", summary.summary_text);
            Ok(())
        }
        None => anyhow::bail!("no summary generated for {call_id} (no transcript, or the completion failed)"),
    }
}
