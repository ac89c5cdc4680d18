//! Realtime call protocol: the JSON event envelope exchanged with the call
//! provider over the per-call WebSocket.
//!
//! Inbound frames decode into the closed [`TypedEvent`] set.  Tags this
//! crate does not model decode to [`TypedEvent::Unknown`] instead of
//! failing, so provider protocol additions never break a live call.
//! Outbound traffic is limited to the three [`Command`]s.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire tags
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const TAG_TRANSCRIPTION_DELTA: &str = "conversation.item.input_audio_transcription.delta";
pub const TAG_TRANSCRIPTION_COMPLETED: &str =
    "conversation.item.input_audio_transcription.completed";
pub const TAG_FUNCTION_ARGS_DONE: &str = "response.function_call_arguments.done";
pub const TAG_ITEM_CREATED: &str = "conversation.item.created";
pub const TAG_AUDIO_TRANSCRIPT_DELTA: &str = "response.audio_transcript.delta";
/// Name used by the GA realtime API for the same event.
pub const TAG_OUTPUT_AUDIO_TRANSCRIPT_DELTA: &str = "response.output_audio_transcript.delta";
pub const TAG_ERROR: &str = "error";

/// Session type sent in every `session.update`.
pub const SESSION_TYPE_REALTIME: &str = "realtime";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A decoded provider event.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedEvent {
    /// Incremental transcription of caller audio.
    TranscriptionDelta { item_id: String, delta: String },
    /// Final transcription of one caller utterance.
    TranscriptionCompleted { item_id: String, text: String },
    /// The model finished streaming arguments for a function call.
    FunctionCallArgumentsDone {
        name: String,
        /// Provider-side function call id, echoed back in the output item.
        call_ref: String,
        /// Raw JSON argument text as produced by the model.
        arguments: String,
    },
    ConversationItemCreated { item: Value },
    /// Incremental transcript of the agent's spoken audio.
    AudioTranscriptDelta { text: String },
    ProviderError { detail: Value },
    Unknown { type_tag: String },
}

impl TypedEvent {
    /// The wire tag this event was decoded from (canonical name for
    /// events that have aliases).
    pub fn type_tag(&self) -> &str {
        match self {
            Self::TranscriptionDelta { .. } => TAG_TRANSCRIPTION_DELTA,
            Self::TranscriptionCompleted { .. } => TAG_TRANSCRIPTION_COMPLETED,
            Self::FunctionCallArgumentsDone { .. } => TAG_FUNCTION_ARGS_DONE,
            Self::ConversationItemCreated { .. } => TAG_ITEM_CREATED,
            Self::AudioTranscriptDelta { .. } => TAG_AUDIO_TRANSCRIPT_DELTA,
            Self::ProviderError { .. } => TAG_ERROR,
            Self::Unknown { type_tag } => type_tag,
        }
    }
}

/// Why an inbound frame could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no string \"type\" field")]
    MissingType,

    #[error("malformed '{type_tag}' payload: {source}")]
    Payload {
        type_tag: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct TranscriptionDeltaWire {
    #[serde(default)]
    item_id: String,
    #[serde(default)]
    delta: String,
}

#[derive(Deserialize)]
struct TranscriptionCompletedWire {
    #[serde(default)]
    item_id: String,
    #[serde(default)]
    transcript: String,
}

#[derive(Deserialize)]
struct FunctionArgsDoneWire {
    #[serde(default)]
    name: String,
    #[serde(default)]
    call_id: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ItemCreatedWire {
    #[serde(default)]
    item: Value,
}

#[derive(Deserialize)]
struct DeltaWire {
    #[serde(default)]
    delta: String,
}

#[derive(Deserialize)]
struct ErrorWire {
    #[serde(default)]
    error: Value,
}

/// Decode one inbound frame.
pub fn decode(raw: &[u8]) -> Result<TypedEvent, DecodeError> {
    let value: Value = serde_json::from_slice(raw).map_err(DecodeError::Json)?;
    let tag = value
        .as_object()
        .ok_or(DecodeError::NotAnObject)?
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_owned();

    let event = match tag.as_str() {
        TAG_TRANSCRIPTION_DELTA => {
            let w: TranscriptionDeltaWire = payload(&tag, value)?;
            TypedEvent::TranscriptionDelta {
                item_id: w.item_id,
                delta: w.delta,
            }
        }
        TAG_TRANSCRIPTION_COMPLETED => {
            let w: TranscriptionCompletedWire = payload(&tag, value)?;
            TypedEvent::TranscriptionCompleted {
                item_id: w.item_id,
                text: w.transcript,
            }
        }
        TAG_FUNCTION_ARGS_DONE => {
            let w: FunctionArgsDoneWire = payload(&tag, value)?;
            TypedEvent::FunctionCallArgumentsDone {
                name: w.name,
                call_ref: w.call_id,
                arguments: w.arguments,
            }
        }
        TAG_ITEM_CREATED => {
            let w: ItemCreatedWire = payload(&tag, value)?;
            TypedEvent::ConversationItemCreated { item: w.item }
        }
        TAG_AUDIO_TRANSCRIPT_DELTA | TAG_OUTPUT_AUDIO_TRANSCRIPT_DELTA => {
            let w: DeltaWire = payload(&tag, value)?;
            TypedEvent::AudioTranscriptDelta { text: w.delta }
        }
        TAG_ERROR => {
            let w: ErrorWire = payload(&tag, value)?;
            TypedEvent::ProviderError { detail: w.error }
        }
        _ => TypedEvent::Unknown { type_tag: tag },
    };
    Ok(event)
}

fn payload<T: DeserializeOwned>(tag: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::Payload {
        type_tag: tag.to_owned(),
        source,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A function tool registered on the realtime session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: "function".into(),
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Session fields carried by a `session.update`.  Unset fields are left
/// untouched by the provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionConfig {
    pub model: String,
    pub instructions: Option<String>,
    pub tools: Option<Vec<ToolSpec>>,
    pub tool_choice: Option<String>,
}

/// Session-control commands sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SessionUpdate(SessionConfig),
    ResponseCreate { instructions: Option<String> },
    /// Result of a function call, `payload` is serialized into the
    /// item's `output` string.
    FunctionCallOutput { call_ref: String, payload: Value },
}

impl Command {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionUpdate(_) => "session.update",
            Self::ResponseCreate { .. } => "response.create",
            Self::FunctionCallOutput { .. } => "function_call_output",
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum WireCommand<'a> {
    #[serde(rename = "session.update")]
    SessionUpdate { session: WireSession<'a> },
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<WireResponse<'a>>,
    },
    #[serde(rename = "conversation.item.create")]
    ItemCreate { item: WireItem<'a> },
}

#[derive(Serialize)]
struct WireSession<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
}

#[derive(Serialize)]
struct WireResponse<'a> {
    instructions: &'a str,
}

#[derive(Serialize)]
struct WireItem<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    call_id: &'a str,
    output: String,
}

/// Serialize a command into the JSON text frame the provider expects.
pub fn encode(cmd: &Command) -> Result<String, serde_json::Error> {
    let wire = match cmd {
        Command::SessionUpdate(cfg) => WireCommand::SessionUpdate {
            session: WireSession {
                kind: SESSION_TYPE_REALTIME,
                model: &cfg.model,
                instructions: cfg.instructions.as_deref(),
                tools: cfg.tools.as_deref(),
                tool_choice: cfg.tool_choice.as_deref(),
            },
        },
        Command::ResponseCreate { instructions } => WireCommand::ResponseCreate {
            response: instructions
                .as_deref()
                .map(|instructions| WireResponse { instructions }),
        },
        Command::FunctionCallOutput { call_ref, payload } => WireCommand::ItemCreate {
            item: WireItem {
                kind: "function_call_output",
                call_id: call_ref,
                output: serde_json::to_string(payload)?,
            },
        },
    };
    serde_json::to_string(&wire)
}
