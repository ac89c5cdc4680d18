//! SQLite-backed persistence for transcript segments and call summaries.
//!
//! A single connection is shared behind a mutex.  Every async operation
//! hops onto the blocking pool so the runtime never waits on disk I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use vm_domain::error::{Error, Result};

use crate::migrations;
use crate::sentiment::Sentiment;
use crate::types::{CallSummary, RecentCall, Speaker, TranscriptSegment};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Persistence seam used by the recorder and the summary generator.
#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Insert or overwrite the segment keyed by `(call_id, item_id)`.
    async fn upsert_segment(&self, segment: &TranscriptSegment) -> Result<()>;

    /// All segments of a call ordered by `recorded_at`, then insertion.
    async fn segments_for_call(&self, call_id: &str) -> Result<Vec<TranscriptSegment>>;

    /// Insert or overwrite the summary keyed by `call_id`.
    async fn upsert_summary(&self, summary: &CallSummary) -> Result<()>;

    async fn summary_for_call(&self, call_id: &str) -> Result<Option<CallSummary>>;

    /// Calls with at least one segment, newest first.
    async fn recent_calls(&self, limit: usize) -> Result<Vec<RecentCall>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SQLite implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone)]
pub struct SqliteTranscriptStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteTranscriptStore {
    /// Open (creating if needed) the database at `db_path` and migrate it.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(storage_err)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(storage_err)?;
        migrations::run_migrations(&conn).map_err(storage_err)?;

        tracing::info!(path = %db_path.display(), "transcript database ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(db_path.to_path_buf()),
        })
    }

    /// A private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        migrations::run_migrations(&conn).map_err(storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard).map_err(storage_err)
        })
        .await
        .map_err(|e| Error::Storage(format!("storage task failed: {e}")))?
    }
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

fn from_micros(v: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(v).unwrap_or_default()
}

#[async_trait::async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn upsert_segment(&self, segment: &TranscriptSegment) -> Result<()> {
        let seg = segment.clone();
        self.with_connection(move |conn| upsert_segment_impl(conn, &seg))
            .await
    }

    async fn segments_for_call(&self, call_id: &str) -> Result<Vec<TranscriptSegment>> {
        let call_id = call_id.to_owned();
        self.with_connection(move |conn| segments_for_call_impl(conn, &call_id))
            .await
    }

    async fn upsert_summary(&self, summary: &CallSummary) -> Result<()> {
        let sentiment_json = serde_json::to_string(&summary.sentiment)?;
        let summary = summary.clone();
        self.with_connection(move |conn| upsert_summary_impl(conn, &summary, &sentiment_json))
            .await
    }

    async fn summary_for_call(&self, call_id: &str) -> Result<Option<CallSummary>> {
        let call_id = call_id.to_owned();
        self.with_connection(move |conn| summary_for_call_impl(conn, &call_id))
            .await
    }

    async fn recent_calls(&self, limit: usize) -> Result<Vec<RecentCall>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_connection(move |conn| recent_calls_impl(conn, limit))
            .await
    }
}

// ── Statements ─────────────────────────────────────────────────────

fn upsert_segment_impl(conn: &Connection, seg: &TranscriptSegment) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO transcripts (call_id, item_id, speaker, transcript, agent_name, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(call_id, item_id) DO UPDATE SET
            speaker = excluded.speaker,
            transcript = excluded.transcript,
            agent_name = excluded.agent_name,
            recorded_at = excluded.recorded_at
        "#,
        params![
            seg.call_id,
            seg.item_id,
            seg.speaker.as_str(),
            seg.text,
            seg.agent_name,
            seg.recorded_at.timestamp_micros(),
        ],
    )?;
    Ok(())
}

fn segments_for_call_impl(
    conn: &Connection,
    call_id: &str,
) -> rusqlite::Result<Vec<TranscriptSegment>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT call_id, item_id, speaker, transcript, COALESCE(agent_name, ''), recorded_at
        FROM transcripts
        WHERE call_id = ?1
        ORDER BY recorded_at ASC, id ASC
        "#,
    )?;
    let rows = stmt.query_map(params![call_id], |row| {
        let speaker: String = row.get(2)?;
        Ok(TranscriptSegment {
            call_id: row.get(0)?,
            item_id: row.get(1)?,
            speaker: Speaker::from_db(&speaker),
            text: row.get(3)?,
            agent_name: row.get(4)?,
            recorded_at: from_micros(row.get(5)?),
        })
    })?;
    rows.collect()
}

fn upsert_summary_impl(
    conn: &Connection,
    summary: &CallSummary,
    sentiment_json: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO call_summaries
            (call_id, summary, full_transcript, agent_name, sentiment_analysis,
             overall_sentiment, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(call_id) DO UPDATE SET
            summary = excluded.summary,
            full_transcript = excluded.full_transcript,
            agent_name = excluded.agent_name,
            sentiment_analysis = excluded.sentiment_analysis,
            overall_sentiment = excluded.overall_sentiment,
            created_at = excluded.created_at
        "#,
        params![
            summary.call_id,
            summary.summary_text,
            summary.full_transcript,
            summary.agent_name,
            sentiment_json,
            summary.sentiment.overall_sentiment,
            summary.created_at.timestamp_micros(),
        ],
    )?;
    Ok(())
}

fn summary_for_call_impl(conn: &Connection, call_id: &str) -> rusqlite::Result<Option<CallSummary>> {
    conn.query_row(
        r#"
        SELECT call_id, summary, full_transcript, COALESCE(agent_name, ''),
               sentiment_analysis, created_at
        FROM call_summaries
        WHERE call_id = ?1
        "#,
        params![call_id],
        |row| {
            let sentiment_json: String = row.get(4)?;
            let sentiment = serde_json::from_str(&sentiment_json)
                .unwrap_or_else(|_| Sentiment::analysis_failed());
            Ok(CallSummary {
                call_id: row.get(0)?,
                summary_text: row.get(1)?,
                full_transcript: row.get(2)?,
                agent_name: row.get(3)?,
                sentiment,
                created_at: from_micros(row.get(5)?),
            })
        },
    )
    .optional()
}

fn recent_calls_impl(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<RecentCall>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.call_id, MIN(t.recorded_at) AS started, COUNT(*),
               s.agent_name, s.overall_sentiment
        FROM transcripts t
        LEFT JOIN call_summaries s ON s.call_id = t.call_id
        GROUP BY t.call_id
        ORDER BY started DESC
        LIMIT ?1
        "#,
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(RecentCall {
            call_id: row.get(0)?,
            first_recorded_at: from_micros(row.get(1)?),
            segments: row.get(2)?,
            agent_name: row.get(3)?,
            overall_sentiment: row.get(4)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(call: &str, item: &str, text: &str, micros: i64) -> TranscriptSegment {
        TranscriptSegment {
            call_id: call.into(),
            item_id: item.into(),
            speaker: Speaker::Patient,
            text: text.into(),
            agent_name: "receptionist".into(),
            recorded_at: from_micros(micros),
        }
    }

    #[tokio::test]
    async fn redelivered_segment_overwrites() {
        let store = SqliteTranscriptStore::open_in_memory().unwrap();
        store.upsert_segment(&seg("c1", "item_1", "first", 10)).await.unwrap();
        store.upsert_segment(&seg("c1", "item_1", "second", 20)).await.unwrap();

        let segs = store.segments_for_call("c1").await.unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "second");
        assert_eq!(segs[0].recorded_at.timestamp_micros(), 20);
    }

    #[tokio::test]
    async fn segments_are_ordered_by_recorded_at() {
        let store = SqliteTranscriptStore::open_in_memory().unwrap();
        store.upsert_segment(&seg("c1", "b", "later", 200)).await.unwrap();
        store.upsert_segment(&seg("c1", "a", "earlier", 100)).await.unwrap();
        store.upsert_segment(&seg("other", "a", "elsewhere", 50)).await.unwrap();

        let texts: Vec<_> = store
            .segments_for_call("c1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(texts, vec!["earlier", "later"]);
    }

    #[tokio::test]
    async fn ties_fall_back_to_insertion_order() {
        let store = SqliteTranscriptStore::open_in_memory().unwrap();
        store.upsert_segment(&seg("c1", "z", "one", 100)).await.unwrap();
        store.upsert_segment(&seg("c1", "a", "two", 100)).await.unwrap();

        let segs = store.segments_for_call("c1").await.unwrap();
        assert_eq!(segs[0].text, "one");
        assert_eq!(segs[1].text, "two");
    }

    #[tokio::test]
    async fn summary_upsert_keeps_one_row() {
        let store = SqliteTranscriptStore::open_in_memory().unwrap();
        let mut summary = CallSummary {
            call_id: "c1".into(),
            summary_text: "v1".into(),
            full_transcript: "PATIENT: hi".into(),
            sentiment: Sentiment::analysis_failed(),
            agent_name: "receptionist".into(),
            created_at: Utc::now(),
        };
        store.upsert_summary(&summary).await.unwrap();
        summary.summary_text = "v2".into();
        store.upsert_summary(&summary).await.unwrap();

        let got = store.summary_for_call("c1").await.unwrap().unwrap();
        assert_eq!(got.summary_text, "v2");
        assert_eq!(got.sentiment, Sentiment::analysis_failed());

        let rows: i64 = store
            .with_connection(|conn| {
                conn.query_row("SELECT COUNT(*) FROM call_summaries", [], |r| r.get(0))
            })
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn unknown_summary_is_none() {
        let store = SqliteTranscriptStore::open_in_memory().unwrap();
        assert!(store.summary_for_call("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_calls_newest_first() {
        let store = SqliteTranscriptStore::open_in_memory().unwrap();
        store.upsert_segment(&seg("old", "a", "x", 100)).await.unwrap();
        store.upsert_segment(&seg("old", "b", "y", 150)).await.unwrap();
        store.upsert_segment(&seg("new", "a", "z", 500)).await.unwrap();

        let calls = store.recent_calls(10).await.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].call_id, "new");
        assert_eq!(calls[1].call_id, "old");
        assert_eq!(calls[1].segments, 2);
        assert!(calls[1].overall_sentiment.is_none());

        assert_eq!(store.recent_calls(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("calls.db");
        let store = SqliteTranscriptStore::open(&path).unwrap();
        store.upsert_segment(&seg("c1", "a", "hi", 1)).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.db_path(), Some(path.as_path()));

        drop(store);
        let reopened = SqliteTranscriptStore::open(&path).unwrap();
        assert_eq!(reopened.segments_for_call("c1").await.unwrap().len(), 1);
    }
}
