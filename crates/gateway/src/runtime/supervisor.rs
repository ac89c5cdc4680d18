//! Owns every in-flight call monitoring task.
//!
//! Spawning never blocks the webhook handler: requests go over a channel to
//! the supervisor loop, which starts one task per call.  A panic inside a
//! call's task is caught and logged and never reaches other calls.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::session::{run_call, SessionContext};

#[derive(Debug)]
struct SpawnRequest {
    call_id: String,
    entry_agent: String,
}

#[derive(Debug, Clone)]
pub struct ActiveCall {
    pub call_id: String,
    pub entry_agent: String,
    pub started_at: DateTime<Utc>,
}

struct Inner {
    active: Mutex<HashMap<String, ActiveCall>>,
    idle: Notify,
}

#[derive(Clone)]
pub struct SessionSupervisor {
    tx: mpsc::UnboundedSender<SpawnRequest>,
    inner: Arc<Inner>,
}

impl SessionSupervisor {
    /// Start the supervisor loop.  It runs until every handle is dropped.
    pub fn start(ctx: Arc<SessionContext>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SpawnRequest>();
        let inner = Arc::new(Inner {
            active: Mutex::new(HashMap::new()),
            idle: Notify::new(),
        });

        let loop_inner = inner.clone();
        let handle = tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                let ctx = ctx.clone();
                let inner = loop_inner.clone();
                let span = tracing::info_span!("call", call_id = %req.call_id, agent = %req.entry_agent);
                tokio::spawn(
                    async move {
                        let outcome = AssertUnwindSafe(run_call(&ctx, &req.call_id, &req.entry_agent))
                            .catch_unwind()
                            .await;
                        match outcome {
                            Ok(report) => tracing::info!(
                                final_agent = %report.final_agent,
                                events = report.events,
                                summarized = report.summary.is_some(),
                                "call finished"
                            ),
                            Err(panic) => tracing::error!(
                                panic = %panic_message(panic.as_ref()),
                                "call task panicked"
                            ),
                        }
                        inner.active.lock().remove(&req.call_id);
                        inner.idle.notify_waiters();
                    }
                    .instrument(span),
                );
            }
            tracing::debug!("session supervisor stopped");
        });

        (Self { tx, inner }, handle)
    }

    /// Start monitoring `call_id`.  Returns `false` if the call is already
    /// being monitored or the supervisor has stopped.
    pub fn spawn(&self, call_id: &str, entry_agent: &str) -> bool {
        {
            let mut active = self.inner.active.lock();
            if active.contains_key(call_id) {
                tracing::warn!(call_id, "call already monitored, ignoring duplicate");
                return false;
            }
            active.insert(
                call_id.to_owned(),
                ActiveCall {
                    call_id: call_id.to_owned(),
                    entry_agent: entry_agent.to_owned(),
                    started_at: Utc::now(),
                },
            );
        }

        let req = SpawnRequest {
            call_id: call_id.to_owned(),
            entry_agent: entry_agent.to_owned(),
        };
        if self.tx.send(req).is_err() {
            tracing::error!(call_id, "session supervisor is not running");
            self.inner.active.lock().remove(call_id);
            return false;
        }
        true
    }

    pub fn is_active(&self, call_id: &str) -> bool {
        self.inner.active.lock().contains_key(call_id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.active.lock().len()
    }

    /// Snapshot of in-flight calls, oldest first.
    pub fn active_calls(&self) -> Vec<ActiveCall> {
        let mut calls: Vec<_> = self.inner.active.lock().values().cloned().collect();
        calls.sort_by_key(|c| c.started_at);
        calls
    }

    /// Resolves once no call is being monitored.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.active.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
