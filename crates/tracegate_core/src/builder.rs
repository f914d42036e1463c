//! Turns a submission into sink records.
//!
//! The pure derivations (record kind, tags, usage, session key) are free
//! functions; [`TraceBuilder`] applies them against a [`TraceSink`].

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::registry::{ChatTrace, RecordKind, RecordRef};
use crate::sink::{
    EventRecord, GenerationRecord, Metadata, TraceBody, TraceSink, TraceUpdate, Usage,
};
use crate::types::{AttributeValue, Role, SubmitTraceRequest, TraceMetadata, UsageInput};

/// Default task for user-authored events.
pub const USER_MESSAGE_TASK: &str = "user_message";
/// Default task for model output; also forces a generation record.
pub const LLM_RESPONSE_TASK: &str = "llm_response";

pub const TRACE_NAME: &str = "chat-session";
const UNKNOWN_MODEL: &str = "unknown";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn record_kind(role: Role, task: Option<&str>) -> RecordKind {
    if role == Role::Assistant || non_blank(task) == Some(LLM_RESPONSE_TASK) {
        RecordKind::Generation
    } else {
        RecordKind::Event
    }
}

/// Defaults, then caller tags, then source, then task (unless reserved).
/// First appearance wins; blanks are skipped.
pub fn derive_tags(defaults: &[String], metadata: &TraceMetadata) -> Vec<String> {
    let task = non_blank(metadata.task.as_deref())
        .filter(|t| *t != USER_MESSAGE_TASK && *t != LLM_RESPONSE_TASK);

    let candidates = defaults
        .iter()
        .map(String::as_str)
        .chain(metadata.tags.iter().map(String::as_str))
        .chain(non_blank(metadata.source.as_deref()))
        .chain(task);

    let mut tags: Vec<String> = Vec::new();
    for tag in candidates {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// `None` unless at least one of prompt/completion counts is known.
pub fn shape_usage(usage: Option<&UsageInput>) -> Option<Usage> {
    let usage = usage?;
    if usage.prompt_tokens.is_none() && usage.completion_tokens.is_none() {
        return None;
    }
    let total = usage.total_tokens.or(match (usage.prompt_tokens, usage.completion_tokens) {
        (Some(prompt), Some(completion)) => prompt.checked_add(completion),
        _ => None,
    });
    Some(Usage {
        input: usage.prompt_tokens,
        output: usage.completion_tokens,
        total,
    })
}

/// Explicit `chatId`, else `sessionId`, else a one-off key that no later
/// submission can resume.
pub fn session_key(identity: &str, metadata: &TraceMetadata) -> String {
    if let Some(key) = explicit_session_key(metadata) {
        return key.to_string();
    }
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        identity.trim(),
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}

pub fn explicit_session_key(metadata: &TraceMetadata) -> Option<&str> {
    non_blank(metadata.chat_id.as_deref()).or(non_blank(metadata.session_id.as_deref()))
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Number(n) => Value::Number(n.clone()),
        AttributeValue::Text(s) => Value::String(s.clone()),
    }
}

/// Metadata forwarded with a record: extras first, so the known keys win.
pub fn record_metadata(request: &SubmitTraceRequest) -> Metadata {
    let mut metadata: Metadata = request
        .metadata
        .extra
        .iter()
        .map(|(key, value)| (key.clone(), attribute_to_json(value)))
        .collect();

    let text =
        |value: Option<&str>| non_blank(value).map_or(Value::Null, |v| Value::String(v.into()));
    let source = text(request.metadata.source.as_deref());
    let task = text(request.metadata.task.as_deref());
    metadata.insert("source".into(), source);
    metadata.insert("task".into(), task);
    metadata.insert("role".into(), Value::String(request.role.as_str().into()));
    metadata
}

#[derive(Clone)]
pub struct TraceBuilder {
    sink: Arc<dyn TraceSink>,
    default_tags: Vec<String>,
}

impl TraceBuilder {
    pub fn new(sink: Arc<dyn TraceSink>, default_tags: Vec<String>) -> Self {
        Self { sink, default_tags }
    }

    pub fn tags_for(&self, metadata: &TraceMetadata) -> Vec<String> {
        derive_tags(&self.default_tags, metadata)
    }

    /// Open a new trace in the sink. Buffered only, so safe under the registry lock.
    pub fn open(
        &self,
        session_key: &str,
        request: &SubmitTraceRequest,
        tags: &[String],
    ) -> Result<ChatTrace> {
        let trace_id = Uuid::new_v4().to_string();

        let mut metadata = Metadata::new();
        if let Some(source) = non_blank(request.metadata.source.as_deref()) {
            metadata.insert("source".into(), Value::String(source.into()));
        }

        self.sink.open_trace(TraceBody {
            id: trace_id.clone(),
            name: TRACE_NAME.to_string(),
            user_id: request.identity.trim().to_string(),
            session_id: session_key.to_string(),
            tags: tags.to_vec(),
            input: Some(request.message.clone()),
            output: None,
            metadata,
            timestamp: Utc::now(),
        })?;

        Ok(ChatTrace::new(trace_id, session_key))
    }

    /// Update the trace and attach one generation or event to it.
    pub fn attach(
        &self,
        trace: &ChatTrace,
        request: &SubmitTraceRequest,
        tags: Vec<String>,
    ) -> Result<RecordRef> {
        trace.update(tags.clone(), request.message.clone());
        self.sink.update_trace(
            trace.id(),
            TraceUpdate {
                tags: Some(tags),
                input: Some(request.message.clone()),
                output: None,
            },
        )?;

        let task = non_blank(request.metadata.task.as_deref());
        let kind = record_kind(request.role, task);
        let record_id = Uuid::new_v4().to_string();
        let metadata = record_metadata(request);

        match kind {
            RecordKind::Generation => {
                self.sink.add_generation(GenerationRecord {
                    id: record_id.clone(),
                    trace_id: trace.id().to_string(),
                    name: task.unwrap_or(LLM_RESPONSE_TASK).to_string(),
                    model: request
                        .metadata
                        .model_label()
                        .unwrap_or(UNKNOWN_MODEL)
                        .to_string(),
                    input: request.message.clone(),
                    output: request.response.clone(),
                    usage: shape_usage(request.metadata.usage.as_ref()),
                    metadata,
                    start_time: Utc::now(),
                })?;

                if let Some(response) = &request.response {
                    trace.set_output(response.clone());
                    self.sink.update_trace(
                        trace.id(),
                        TraceUpdate {
                            output: Some(response.clone()),
                            ..TraceUpdate::default()
                        },
                    )?;
                }
            }
            RecordKind::Event => {
                self.sink.add_event(EventRecord {
                    id: record_id.clone(),
                    trace_id: trace.id().to_string(),
                    name: task.unwrap_or(USER_MESSAGE_TASK).to_string(),
                    input: request.message.clone(),
                    metadata,
                    start_time: Utc::now(),
                })?;
            }
        }

        trace.push_record(record_id.clone(), kind);
        Ok(RecordRef {
            id: record_id,
            kind,
        })
    }
}
