//! Observability sink: where traces, generations, events, and scores go.
//!
//! Record calls only buffer; `flush` performs the network I/O. A flush sends
//! whatever is buffered at that moment, including records from concurrent
//! submissions, and never retries.

mod langfuse;
mod memory;

pub use self::langfuse::LangfuseSink;
pub use self::memory::{MemorySink, SinkCall};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata map forwarded with records.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Token usage of one generation. Unknown counts serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: Option<u64>,
    pub output: Option<u64>,
    pub total: Option<u64>,
}

/// Creates (or upserts) a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceBody {
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub session_id: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

/// Mutable trace fields pushed after every submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// One model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: String,
    pub trace_id: String,
    pub name: String,
    pub model: String,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Absent means "no cost data"; present with nulls means "partially known"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub metadata: Metadata,
    pub start_time: DateTime<Utc>,
}

/// One non-generation interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub trace_id: String,
    pub name: String,
    pub input: String,
    pub metadata: Metadata,
    pub start_time: DateTime<Utc>,
}

/// User feedback on a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackScore {
    pub id: String,
    pub trace_id: String,
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[async_trait]
pub trait TraceSink: Send + Sync {
    /// Short identifier used in logs (e.g. "langfuse", "memory").
    fn sink_id(&self) -> &str;

    fn open_trace(&self, trace: TraceBody) -> Result<()>;

    fn update_trace(&self, trace_id: &str, update: TraceUpdate) -> Result<()>;

    fn add_generation(&self, generation: GenerationRecord) -> Result<()>;

    fn add_event(&self, event: EventRecord) -> Result<()>;

    fn add_score(&self, score: FeedbackScore) -> Result<()>;

    /// Send everything buffered so far.
    async fn flush(&self) -> Result<()>;

    /// Final flush before the process exits.
    async fn shutdown(&self) -> Result<()> {
        self.flush().await
    }
}
