//! Webhook-triggered call acceptance.
//!
//! Verifies the signed envelope, answers incoming calls as the entry agent
//! and hands accepted calls to the supervisor.  Never waits on the call
//! itself.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Deserialize;

use vm_domain::config::TranscriptionConfig;
use vm_domain::trace::TraceEvent;

use super::agent::AgentResolver;
use super::supervisor::SessionSupervisor;
use crate::realtime::{AcceptPayload, AuthenticationError, CallControl, WebhookVerifier};

pub const EVENT_CALL_INCOMING: &str = "realtime.call.incoming";
pub const EVENT_CALL_ENDED: &str = "realtime.call.ended";

// ── envelope ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: EnvelopeData,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    sip_headers: Vec<SipHeader>,
}

#[derive(Debug, Deserialize)]
struct SipHeader {
    name: String,
    #[serde(default)]
    value: String,
}

impl EnvelopeData {
    fn sip_header(&self, name: &str) -> &str {
        self.sip_headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .unwrap_or("Unknown")
    }
}

/// What happened to one authenticated webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The provider answered and monitoring has been handed off.
    Accepted { call_id: String, agent: String },
    /// The provider refused or was unreachable.  The call is not monitored.
    AcceptFailed { call_id: String },
    Ended { call_id: String },
    /// A recognized envelope needing no action.
    Ignored { event_type: String },
}

pub struct CallAcceptor {
    verifier: WebhookVerifier,
    resolver: AgentResolver,
    control: Arc<dyn CallControl>,
    supervisor: SessionSupervisor,
    model: String,
    transcription: TranscriptionConfig,
}

impl CallAcceptor {
    pub fn new(
        verifier: WebhookVerifier,
        resolver: AgentResolver,
        control: Arc<dyn CallControl>,
        supervisor: SessionSupervisor,
        model: String,
        transcription: TranscriptionConfig,
    ) -> Self {
        Self {
            verifier,
            resolver,
            control,
            supervisor,
            model,
            transcription,
        }
    }

    /// Authenticate and dispatch one webhook.  Only authentication and
    /// envelope problems are errors; provider failures are outcomes.
    pub async fn handle(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<AcceptOutcome, AuthenticationError> {
        self.verifier.verify(headers, body)?;
        self.dispatch(body).await
    }

    async fn dispatch(&self, body: &[u8]) -> Result<AcceptOutcome, AuthenticationError> {
        let envelope: WebhookEnvelope = serde_json::from_slice(body)
            .map_err(|e| AuthenticationError::MalformedEnvelope(e.to_string()))?;
        tracing::debug!(webhook_id = %envelope.id, event_type = %envelope.kind, "webhook verified");

        match envelope.kind.as_str() {
            EVENT_CALL_INCOMING => {
                let call_id = envelope.data.call_id.clone().ok_or_else(|| {
                    AuthenticationError::MalformedEnvelope("incoming call without call_id".into())
                })?;
                Ok(self.accept(&call_id, &envelope.data).await)
            }
            EVENT_CALL_ENDED => {
                let call_id = envelope.data.call_id.unwrap_or_default();
                tracing::info!(call_id = %call_id, "call ended");
                Ok(AcceptOutcome::Ended { call_id })
            }
            other => {
                tracing::info!(event_type = other, "unhandled webhook event");
                Ok(AcceptOutcome::Ignored {
                    event_type: other.to_owned(),
                })
            }
        }
    }

    async fn accept(&self, call_id: &str, data: &EnvelopeData) -> AcceptOutcome {
        let from = data.sip_header("From").to_owned();
        let to = data.sip_header("To").to_owned();
        tracing::info!(call_id, from = %from, to = %to, "incoming call");

        // First contact always lands on the entry agent.
        let agent = self.resolver.resolve(self.resolver.entry_agent());
        let payload = AcceptPayload::new(&self.model, &agent.instructions, &self.transcription);

        match self.control.accept_call(call_id, &payload).await {
            Ok(()) => {
                TraceEvent::CallAccepted {
                    call_id: call_id.to_owned(),
                    agent: agent.agent_id.clone(),
                    from,
                    to,
                }
                .emit();
                self.supervisor.spawn(call_id, &agent.agent_id);
                AcceptOutcome::Accepted {
                    call_id: call_id.to_owned(),
                    agent: agent.agent_id,
                }
            }
            Err(e) => {
                tracing::error!(call_id, error = %e, "call acceptance failed");
                TraceEvent::CallAcceptFailed {
                    call_id: call_id.to_owned(),
                    status: e.status,
                    reason: e.reason,
                }
                .emit();
                AcceptOutcome::AcceptFailed {
                    call_id: call_id.to_owned(),
                }
            }
        }
    }
}
