//! The per-call session state machine and the loop that drives it against
//! the provider's event stream.
//!
//! [`CallSession`] is pure: it turns decoded events into outbound commands
//! and segments to record.  [`run_call`] owns the stream, the recorder and
//! the closing summary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use vm_domain::trace::TraceEvent;
use vm_protocol::{Command, SessionConfig, TypedEvent};
use vm_transcripts::{CallSummary, SummaryGenerator, TranscriptRecorder, TranscriptSegment};

use super::agent::{AgentConfig, AgentResolver};
use super::functions::{self, SCHEDULE_APPOINTMENT, TRANSFER_CALL};
use crate::realtime::CallControl;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Connecting,
    Active,
    Transferring,
    Closed,
}

/// What the driver must do in response to one event.
#[derive(Debug, Default, PartialEq)]
pub struct Reaction {
    /// Outbound commands, in the order they must be sent.
    pub commands: Vec<Command>,
    pub segment: Option<TranscriptSegment>,
}

pub struct CallSession {
    call_id: String,
    model: String,
    resolver: AgentResolver,
    entry_agent: String,
    current_agent: String,
    state: CallState,
    events: u64,
}

impl CallSession {
    pub fn new(call_id: &str, entry_agent: &str, model: &str, resolver: AgentResolver) -> Self {
        Self {
            call_id: call_id.to_owned(),
            model: model.to_owned(),
            resolver,
            entry_agent: entry_agent.to_owned(),
            current_agent: entry_agent.to_owned(),
            state: CallState::Connecting,
            events: 0,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn current_agent(&self) -> &str {
        &self.current_agent
    }

    pub fn events_seen(&self) -> u64 {
        self.events
    }

    /// Register tools and greet the caller.  `Connecting` becomes `Active`.
    pub fn start(&mut self) -> Vec<Command> {
        if self.state != CallState::Connecting {
            return Vec::new();
        }
        let agent = self.resolver.resolve(&self.current_agent);
        self.current_agent = agent.agent_id.clone();
        self.state = CallState::Active;

        TraceEvent::SessionStarted {
            call_id: self.call_id.clone(),
            agent: agent.agent_id.clone(),
            tools: agent.tools.len(),
        }
        .emit();

        vec![
            Command::SessionUpdate(SessionConfig {
                model: self.model.clone(),
                instructions: None,
                tools: Some(agent.tools.clone()),
                tool_choice: Some("auto".into()),
            }),
            Command::ResponseCreate {
                instructions: Some(agent.greeting_instruction()),
            },
        ]
    }

    pub fn on_event(&mut self, event: TypedEvent) -> Reaction {
        if self.state != CallState::Active {
            tracing::debug!(
                call_id = %self.call_id,
                state = ?self.state,
                event_type = event.type_tag(),
                "event outside active state ignored"
            );
            return Reaction::default();
        }
        self.events += 1;

        match event {
            TypedEvent::TranscriptionCompleted { item_id, text } => {
                tracing::info!(call_id = %self.call_id, item_id = %item_id, "patient said: {text}");
                if text.trim().is_empty() {
                    return Reaction::default();
                }
                // The segment key is (call_id, item_id); an empty id would
                // collide with every other id-less segment of the call.
                if item_id.is_empty() {
                    tracing::warn!(call_id = %self.call_id, "transcription without item_id not recorded");
                    return Reaction::default();
                }
                Reaction {
                    commands: Vec::new(),
                    segment: Some(TranscriptSegment::patient(
                        self.call_id.clone(),
                        item_id,
                        text,
                        self.current_agent.clone(),
                    )),
                }
            }
            TypedEvent::FunctionCallArgumentsDone {
                name,
                call_ref,
                arguments,
            } => {
                tracing::info!(
                    call_id = %self.call_id,
                    function = %name,
                    arguments = %arguments,
                    "function call"
                );
                let commands = match name.as_str() {
                    TRANSFER_CALL => self.transfer(&call_ref, &arguments),
                    SCHEDULE_APPOINTMENT => self.schedule(&call_ref, &arguments),
                    other => {
                        tracing::warn!(call_id = %self.call_id, function = other, "unknown function");
                        vec![Command::FunctionCallOutput {
                            call_ref,
                            payload: functions::error_payload(format!("unknown function: {other}")),
                        }]
                    }
                };
                Reaction {
                    commands,
                    segment: None,
                }
            }
            TypedEvent::ConversationItemCreated { item } => {
                if item.get("type").and_then(|t| t.as_str()) == Some("function_call") {
                    let name = item.get("name").and_then(|n| n.as_str()).unwrap_or("unknown");
                    tracing::info!(call_id = %self.call_id, function = name, "function call item created");
                } else {
                    tracing::debug!(call_id = %self.call_id, "conversation item created");
                }
                Reaction::default()
            }
            TypedEvent::AudioTranscriptDelta { text } => {
                if !text.is_empty() {
                    tracing::debug!(call_id = %self.call_id, agent = %self.current_agent, "agent speaking: {text}");
                }
                Reaction::default()
            }
            TypedEvent::TranscriptionDelta { item_id, delta } => {
                tracing::trace!(call_id = %self.call_id, item_id = %item_id, delta = %delta, "transcription delta");
                Reaction::default()
            }
            TypedEvent::ProviderError { detail } => {
                tracing::error!(call_id = %self.call_id, detail = %detail, "provider error event");
                Reaction::default()
            }
            TypedEvent::Unknown { type_tag } => {
                tracing::debug!(call_id = %self.call_id, event_type = %type_tag, "unhandled event");
                Reaction::default()
            }
        }
    }

    /// Stream closed.  Terminal.
    pub fn close(&mut self) {
        self.state = CallState::Closed;
    }

    fn transfer(&mut self, call_ref: &str, arguments: &str) -> Vec<Command> {
        let args = match functions::parse_transfer(arguments) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(call_id = %self.call_id, error = %e, "transfer_call arguments rejected");
                return vec![Command::FunctionCallOutput {
                    call_ref: call_ref.to_owned(),
                    payload: functions::error_payload(e),
                }];
            }
        };

        self.state = CallState::Transferring;
        let requested = args.target_agent.unwrap_or_else(|| self.entry_agent.clone());
        let target: AgentConfig = self.resolver.resolve(&requested);

        TraceEvent::AgentTransferred {
            call_id: self.call_id.clone(),
            from_agent: self.current_agent.clone(),
            to_agent: target.agent_id.clone(),
            reason: args.reason,
        }
        .emit();

        self.current_agent = target.agent_id.clone();
        self.state = CallState::Active;

        vec![
            Command::FunctionCallOutput {
                call_ref: call_ref.to_owned(),
                payload: functions::transferred_payload(&target.agent_id),
            },
            Command::SessionUpdate(SessionConfig {
                model: self.model.clone(),
                instructions: Some(target.instructions.clone()),
                tools: None,
                tool_choice: None,
            }),
            Command::ResponseCreate {
                instructions: Some(target.greeting_instruction()),
            },
        ]
    }

    fn schedule(&mut self, call_ref: &str, arguments: &str) -> Vec<Command> {
        let appt = functions::parse_appointment(arguments);
        TraceEvent::AppointmentRequested {
            call_id: self.call_id.clone(),
            date: appt.date.clone(),
            time: appt.time.clone(),
        }
        .emit();

        vec![
            Command::FunctionCallOutput {
                call_ref: call_ref.to_owned(),
                payload: functions::scheduled_payload(&appt),
            },
            Command::ResponseCreate { instructions: None },
        ]
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Driver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Collaborators shared by every call's monitoring task.
pub struct SessionContext {
    pub control: Arc<dyn CallControl>,
    pub resolver: AgentResolver,
    /// Realtime model named in session updates.
    pub model: String,
    /// `None` when transcription is disabled.
    pub recorder: Option<TranscriptRecorder>,
    pub summaries: SummaryGenerator,
    /// A stream silent for this long counts as closed.
    pub idle_timeout: Duration,
}

#[derive(Debug)]
pub struct CallReport {
    pub call_id: String,
    pub final_agent: String,
    pub events: u64,
    pub summary: Option<CallSummary>,
}

/// Monitor one accepted call until its stream closes, then summarize it.
pub async fn run_call(ctx: &SessionContext, call_id: &str, entry_agent: &str) -> CallReport {
    let started = Instant::now();
    let mut session = CallSession::new(call_id, entry_agent, &ctx.model, ctx.resolver.clone());

    match ctx.control.open_stream(call_id).await {
        Ok(mut stream) => {
            for cmd in session.start() {
                if let Err(e) = stream.send(&cmd).await {
                    tracing::warn!(call_id, command = cmd.kind(), error = %e, "sending command failed");
                }
            }

            loop {
                let frame = match tokio::time::timeout(ctx.idle_timeout, stream.next_frame()).await {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(_) => {
                        tracing::warn!(
                            call_id,
                            idle = ?ctx.idle_timeout,
                            "event stream idle, treating as closed"
                        );
                        break;
                    }
                };
                let event = match vm_protocol::decode(&frame) {
                    Ok(ev) => ev,
                    Err(e) => {
                        tracing::warn!(call_id, error = %e, "skipping undecodable frame");
                        continue;
                    }
                };

                let reaction = session.on_event(event);

                if let (Some(segment), Some(recorder)) = (reaction.segment, &ctx.recorder) {
                    if let Err(e) = recorder.record(&segment).await {
                        tracing::error!(call_id, item_id = %segment.item_id, error = %e, "recording segment failed");
                    }
                }

                for cmd in reaction.commands {
                    if let Err(e) = stream.send(&cmd).await {
                        tracing::warn!(call_id, command = cmd.kind(), error = %e, "sending command failed");
                    }
                }
            }
            tracing::info!(call_id, "event stream ended");
        }
        Err(e) => {
            tracing::error!(call_id, error = %e, "event stream connection failed");
        }
    }

    session.close();

    let final_agent = session.current_agent().to_owned();
    let summary = ctx.summaries.generate(call_id, &final_agent).await;

    TraceEvent::SessionClosed {
        call_id: call_id.to_owned(),
        agent: final_agent.clone(),
        events: session.events_seen(),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
    .emit();

    CallReport {
        call_id: call_id.to_owned(),
        final_agent,
        events: session.events_seen(),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vm_domain::catalog::PromptCatalog;

    fn session() -> CallSession {
        let raw = r#"{
            "medical_centre": {"name": "Happy Medical Centre"},
            "agents": {
                "receptionist": {"instructions": "Front desk."},
                "dentist": {"instructions": "Dental care."}
            },
            "prompts": {
                "receptionist": {"greeting": "Welcome to Happy Medical Centre!"},
                "dentist": {"greeting": "Dentist speaking."}
            },
            "functions": [
                {"name": "transfer_call"},
                {"name": "schedule_appointment"}
            ]
        }"#;
        let catalog = PromptCatalog::from_json_str(raw, "receptionist").unwrap();
        CallSession::new(
            "call_1",
            "receptionist",
            "gpt-realtime",
            AgentResolver::new(Arc::new(catalog)),
        )
    }

    fn fn_call(name: &str, args: &str) -> TypedEvent {
        TypedEvent::FunctionCallArgumentsDone {
            name: name.into(),
            call_ref: "fc_1".into(),
            arguments: args.into(),
        }
    }

    #[test]
    fn start_registers_tools_then_greets() {
        let mut s = session();
        assert_eq!(s.state(), CallState::Connecting);
        let cmds = s.start();
        assert_eq!(s.state(), CallState::Active);
        assert_eq!(cmds.len(), 2);
        match &cmds[0] {
            Command::SessionUpdate(cfg) => {
                assert_eq!(cfg.model, "gpt-realtime");
                assert_eq!(cfg.tools.as_ref().unwrap().len(), 2);
                assert_eq!(cfg.tool_choice.as_deref(), Some("auto"));
                assert!(cfg.instructions.is_none());
            }
            other => panic!("expected session update, got {other:?}"),
        }
        assert_eq!(
            cmds[1],
            Command::ResponseCreate {
                instructions: Some("Say: Welcome to Happy Medical Centre!".into())
            }
        );
        assert!(s.start().is_empty());
    }

    #[test]
    fn transfer_emits_three_commands_in_order() {
        let mut s = session();
        s.start();
        let r = s.on_event(fn_call("transfer_call", r#"{"target_agent":"dentist","reason":"toothache"}"#));

        assert_eq!(r.commands.len(), 3);
        match &r.commands[0] {
            Command::FunctionCallOutput { call_ref, payload } => {
                assert_eq!(call_ref, "fc_1");
                assert_eq!(payload["status"], "transferred");
                assert_eq!(payload["target_agent"], "dentist");
            }
            other => panic!("expected function output, got {other:?}"),
        }
        match &r.commands[1] {
            Command::SessionUpdate(cfg) => {
                assert_eq!(cfg.instructions.as_deref(), Some("Dental care."));
            }
            other => panic!("expected session update, got {other:?}"),
        }
        assert_eq!(
            r.commands[2],
            Command::ResponseCreate {
                instructions: Some("Say: Dentist speaking.".into())
            }
        );
        assert_eq!(s.current_agent(), "dentist");
        assert_eq!(s.state(), CallState::Active);
    }

    #[test]
    fn transfer_without_target_returns_to_entry_agent() {
        let mut s = session();
        s.start();
        s.on_event(fn_call("transfer_call", r#"{"target_agent":"dentist"}"#));
        s.on_event(fn_call("transfer_call", r#"{"reason":"wrong desk"}"#));
        assert_eq!(s.current_agent(), "receptionist");
    }

    #[test]
    fn transfer_to_unknown_agent_uses_default() {
        let mut s = session();
        s.start();
        let r = s.on_event(fn_call("transfer_call", r#"{"target_agent":"surgeon"}"#));
        assert_eq!(r.commands.len(), 3);
        assert_eq!(s.current_agent(), "receptionist");
    }

    #[test]
    fn malformed_transfer_yields_error_output() {
        let mut s = session();
        s.start();
        let r = s.on_event(fn_call("transfer_call", "not json"));
        assert_eq!(r.commands.len(), 1);
        match &r.commands[0] {
            Command::FunctionCallOutput { payload, .. } => assert_eq!(payload["status"], "error"),
            other => panic!("expected function output, got {other:?}"),
        }
        assert_eq!(s.current_agent(), "receptionist");
        assert_eq!(s.state(), CallState::Active);
    }

    #[test]
    fn schedule_with_no_fields_still_confirms() {
        let mut s = session();
        s.start();
        let r = s.on_event(fn_call("schedule_appointment", ""));
        assert_eq!(r.commands.len(), 2);
        match &r.commands[0] {
            Command::FunctionCallOutput { payload, .. } => {
                assert_eq!(payload["status"], "scheduled");
                assert_eq!(payload["appointment"]["date"], "");
            }
            other => panic!("expected function output, got {other:?}"),
        }
        assert_eq!(r.commands[1], Command::ResponseCreate { instructions: None });
    }

    #[test]
    fn unknown_function_gets_error_output() {
        let mut s = session();
        s.start();
        let r = s.on_event(fn_call("order_pizza", "{}"));
        match &r.commands[..] {
            [Command::FunctionCallOutput { payload, .. }] => {
                assert_eq!(payload["message"], "unknown function: order_pizza");
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn completed_transcription_becomes_patient_segment() {
        let mut s = session();
        s.start();
        s.on_event(fn_call("transfer_call", r#"{"target_agent":"dentist"}"#));
        let r = s.on_event(TypedEvent::TranscriptionCompleted {
            item_id: "item_9".into(),
            text: "It hurts".into(),
        });
        let seg = r.segment.unwrap();
        assert_eq!(seg.call_id, "call_1");
        assert_eq!(seg.item_id, "item_9");
        assert_eq!(seg.text, "It hurts");
        assert_eq!(seg.agent_name, "dentist");
        assert!(r.commands.is_empty());
    }

    #[test]
    fn empty_transcription_is_not_recorded() {
        let mut s = session();
        s.start();
        let r = s.on_event(TypedEvent::TranscriptionCompleted {
            item_id: "item_1".into(),
            text: "  ".into(),
        });
        assert!(r.segment.is_none());
    }

    #[test]
    fn transcription_without_item_id_is_not_recorded() {
        let mut s = session();
        s.start();
        let r = s.on_event(TypedEvent::TranscriptionCompleted {
            item_id: String::new(),
            text: "Do you open on Saturdays?".into(),
        });
        assert!(r.segment.is_none());
        assert!(r.commands.is_empty());
    }

    #[test]
    fn observational_events_change_nothing() {
        let mut s = session();
        s.start();
        for ev in [
            TypedEvent::AudioTranscriptDelta { text: "Hello".into() },
            TypedEvent::ProviderError { detail: serde_json::json!({"message": "x"}) },
            TypedEvent::Unknown { type_tag: "rate_limits.updated".into() },
            TypedEvent::ConversationItemCreated { item: serde_json::json!({"type": "message"}) },
        ] {
            assert_eq!(s.on_event(ev), Reaction::default());
        }
        assert_eq!(s.state(), CallState::Active);
        assert_eq!(s.events_seen(), 4);
    }

    #[test]
    fn closed_session_ignores_events() {
        let mut s = session();
        s.start();
        s.close();
        let r = s.on_event(fn_call("transfer_call", r#"{"target_agent":"dentist"}"#));
        assert!(r.commands.is_empty());
        assert_eq!(s.state(), CallState::Closed);
    }
}
