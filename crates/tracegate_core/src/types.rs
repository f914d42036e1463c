//! Request and result types for the gateway's two operations.
//!
//! Field names follow the external JSON contract (camelCase).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Author of a submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Primitive value allowed in free-form metadata.
///
/// Nested objects and arrays fail to deserialize, which rejects them at the
/// request boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value.into())
    }
}

/// Token counts reported by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Caller-supplied metadata: known fields plus primitive extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Anything else the caller sent
    #[serde(flatten)]
    pub extra: BTreeMap<String, AttributeValue>,
}

impl TraceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn chat_id(mut self, id: impl Into<String>) -> Self {
        self.chat_id = Some(id.into());
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn usage(mut self, usage: UsageInput) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The model name, preferring `model` over `modelName`.
    pub fn model_label(&self) -> Option<&str> {
        self.model
            .as_deref()
            .or(self.model_name.as_deref())
            .filter(|m| !m.is_empty())
    }
}

/// Input of the submit-trace operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTraceRequest {
    #[serde(alias = "email")]
    pub identity: String,
    #[serde(default)]
    pub message: String,
    pub client_address: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default)]
    pub metadata: TraceMetadata,
}

impl SubmitTraceRequest {
    pub fn new(
        identity: impl Into<String>,
        message: impl Into<String>,
        client_address: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            message: message.into(),
            client_address: client_address.into(),
            role: Role::User,
            response: None,
            metadata: TraceMetadata::default(),
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn metadata(mut self, metadata: TraceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of the submit-trace operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitOutcome {
    pub fn accepted(trace_id: impl Into<String>) -> Self {
        Self {
            success: true,
            trace_id: Some(trace_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            trace_id: None,
            error: Some(error.into()),
        }
    }
}

/// Input of the submit-feedback operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub trace_id: Option<String>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FeedbackRequest {
    pub fn new(trace_id: impl Into<String>, value: f64) -> Self {
        Self {
            trace_id: Some(trace_id.into()),
            value,
            comment: None,
            name: None,
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Result of the submit-feedback operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeedbackOutcome {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request: SubmitTraceRequest = serde_json::from_value(json!({
            "identity": "a@b.com",
            "clientAddress": "1.2.3.4"
        }))
        .unwrap();

        assert_eq!(request.role, Role::User);
        assert_eq!(request.message, "");
        assert!(request.response.is_none());
        assert_eq!(request.metadata, TraceMetadata::default());
    }

    #[test]
    fn test_email_alias() {
        let request: SubmitTraceRequest = serde_json::from_value(json!({
            "email": "a@b.com",
            "message": "hi",
            "clientAddress": "1.2.3.4",
            "role": "assistant"
        }))
        .unwrap();
        assert_eq!(request.identity, "a@b.com");
        assert_eq!(request.role, Role::Assistant);
    }

    #[test]
    fn test_metadata_known_fields_and_extras() {
        let metadata: TraceMetadata = serde_json::from_value(json!({
            "source": "widget",
            "chatId": "c-1",
            "modelName": "gpt-4o",
            "usage": { "promptTokens": 12 },
            "tags": ["a"],
            "locale": "en",
            "retries": 2,
            "beta": true,
            "note": null
        }))
        .unwrap();

        assert_eq!(metadata.source.as_deref(), Some("widget"));
        assert_eq!(metadata.chat_id.as_deref(), Some("c-1"));
        assert_eq!(metadata.model_label(), Some("gpt-4o"));
        assert_eq!(metadata.usage.unwrap().prompt_tokens, Some(12));
        assert_eq!(metadata.extra.len(), 4);
        assert_eq!(metadata.extra["locale"], AttributeValue::from("en"));
        assert_eq!(metadata.extra["retries"], AttributeValue::from(2i64));
        assert_eq!(metadata.extra["beta"], AttributeValue::Bool(true));
        assert_eq!(metadata.extra["note"], AttributeValue::Null);
    }

    #[test]
    fn test_metadata_rejects_nested_extras() {
        let result = serde_json::from_value::<TraceMetadata>(json!({
            "context": { "page": "home" }
        }));
        assert!(result.is_err());

        let result = serde_json::from_value::<TraceMetadata>(json!({
            "history": ["a", "b"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_model_label_prefers_model() {
        let metadata = TraceMetadata {
            model: Some("claude".into()),
            model_name: Some("gpt".into()),
            ..Default::default()
        };
        assert_eq!(metadata.model_label(), Some("claude"));
    }

    #[test]
    fn test_outcome_serialization_skips_absent_fields() {
        let ok = serde_json::to_value(SubmitOutcome::accepted("t-1")).unwrap();
        assert_eq!(ok, json!({ "success": true, "traceId": "t-1" }));

        let failed = serde_json::to_value(FeedbackOutcome::failed("nope")).unwrap();
        assert_eq!(failed, json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn test_feedback_without_trace_id_deserializes() {
        let request: FeedbackRequest = serde_json::from_value(json!({ "value": 1 })).unwrap();
        assert!(request.trace_id.is_none());
        assert_eq!(request.value, 1.0);
    }
}
