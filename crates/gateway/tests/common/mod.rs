#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use vm_domain::catalog::PromptCatalog;
use vm_domain::error::{Error, Result};
use vm_providers::{ChatRequest, ChatResponse, LlmProvider};
use vm_protocol::Command;
use vm_gateway::realtime::{AcceptError, AcceptPayload, CallControl, CallStream};

pub const SECRET: &str = "whsec_dGVzdC1zZWNyZXQta2V5";

pub fn catalog() -> Arc<PromptCatalog> {
    let raw = json!({
        "medical_centre": {"name": "Happy Medical Centre"},
        "agents": {
            "receptionist": {"instructions": "You are the receptionist."},
            "dentist": {"instructions": "You are the dentist."},
            "nutritionist": {"instructions": "You are the nutritionist."}
        },
        "prompts": {
            "receptionist": {"greeting": "Welcome to Happy Medical Centre!"},
            "dentist": {"greeting": "Hi, this is the dental team."}
        },
        "functions": [
            {"name": "transfer_call", "description": "Transfer to a specialist",
             "parameters": {"type": "object", "properties": {"target_agent": {"type": "string"}}}},
            {"name": "schedule_appointment", "description": "Book an appointment",
             "parameters": {"type": "object", "properties": {}}}
        ]
    });
    Arc::new(PromptCatalog::from_json_str(&raw.to_string(), "receptionist").unwrap())
}

// ── provider fake ────────────────────────────────────────────────────

/// Scripted call provider.  Each call id gets the frames registered for it;
/// commands sent on any stream are captured per call.
#[derive(Default)]
pub struct FakeControl {
    pub accepted: Mutex<Vec<(String, AcceptPayload)>>,
    pub sent: Arc<Mutex<HashMap<String, Vec<Command>>>>,
    frames: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    reject_with: Mutex<Option<u16>>,
    fail_connect: Mutex<bool>,
    panic_on: Mutex<Option<String>>,
    stalled: Mutex<Vec<String>>,
}

impl FakeControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, call_id: &str, frames: Vec<serde_json::Value>) {
        self.script_raw(
            call_id,
            frames.into_iter().map(|f| f.to_string().into_bytes()).collect(),
        );
    }

    pub fn script_raw(&self, call_id: &str, frames: Vec<Vec<u8>>) {
        self.frames.lock().insert(call_id.to_owned(), frames);
    }

    pub fn reject_accepts(&self, status: u16) {
        *self.reject_with.lock() = Some(status);
    }

    pub fn fail_connects(&self) {
        *self.fail_connect.lock() = true;
    }

    /// After its scripted frames the stream goes silent instead of closing.
    pub fn stall(&self, call_id: &str) {
        self.stalled.lock().push(call_id.to_owned());
    }

    pub fn panic_on(&self, call_id: &str) {
        *self.panic_on.lock() = Some(call_id.to_owned());
    }

    pub fn sent_to(&self, call_id: &str) -> Vec<Command> {
        self.sent.lock().get(call_id).cloned().unwrap_or_default()
    }

    pub fn accepted_ids(&self) -> Vec<String> {
        self.accepted.lock().iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait::async_trait]
impl CallControl for FakeControl {
    async fn accept_call(
        &self,
        call_id: &str,
        payload: &AcceptPayload,
    ) -> std::result::Result<(), AcceptError> {
        self.accepted.lock().push((call_id.to_owned(), payload.clone()));
        match *self.reject_with.lock() {
            Some(status) => Err(AcceptError {
                status: Some(status),
                reason: "rejected by fake".into(),
            }),
            None => Ok(()),
        }
    }

    async fn open_stream(&self, call_id: &str) -> Result<Box<dyn CallStream>> {
        if self.panic_on.lock().as_deref() == Some(call_id) {
            panic!("stream exploded for {call_id}");
        }
        if *self.fail_connect.lock() {
            return Err(Error::Timeout(format!("connecting {call_id}")));
        }
        let frames = self.frames.lock().remove(call_id).unwrap_or_default();
        let stall = self.stalled.lock().iter().any(|id| id == call_id);
        Ok(Box::new(FakeStream {
            call_id: call_id.to_owned(),
            frames: frames.into(),
            sent: self.sent.clone(),
            stall,
        }))
    }
}

struct FakeStream {
    call_id: String,
    frames: VecDeque<Vec<u8>>,
    sent: Arc<Mutex<HashMap<String, Vec<Command>>>>,
    stall: bool,
}

#[async_trait::async_trait]
impl CallStream for FakeStream {
    async fn send(&mut self, command: &Command) -> Result<()> {
        self.sent
            .lock()
            .entry(self.call_id.clone())
            .or_default()
            .push(command.clone());
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Vec<u8>> {
        match self.frames.pop_front() {
            Some(frame) => Some(frame),
            None if self.stall => std::future::pending().await,
            None => None,
        }
    }
}

// ── completion fake ──────────────────────────────────────────────────

/// Prose for the summary prompt, JSON for the sentiment prompt.
#[derive(Default)]
pub struct CannedLlm {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl LlmProvider for CannedLlm {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let user = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.calls.lock().push(user.clone());
        let content = if user.starts_with("Analyze patient sentiment") {
            r#"{"overall_sentiment":"negative","confidence":75,"key_emotions":["worried"],"concerns":["pain"],"satisfaction":"neutral"}"#
        } else {
            "Reason for Call: tooth pain."
        };
        Ok(ChatResponse {
            content: content.into(),
            usage: None,
            model: "canned".into(),
            finish_reason: None,
        })
    }

    fn provider_id(&self) -> &str {
        "canned"
    }
}

// ── inbound frames ───────────────────────────────────────────────────

pub fn transcription(item_id: &str, text: &str) -> serde_json::Value {
    json!({
        "type": "conversation.item.input_audio_transcription.completed",
        "item_id": item_id,
        "content_index": 0,
        "transcript": text
    })
}

pub fn function_call(name: &str, call_ref: &str, arguments: serde_json::Value) -> serde_json::Value {
    json!({
        "type": "response.function_call_arguments.done",
        "name": name,
        "call_id": call_ref,
        "arguments": arguments.to_string()
    })
}
