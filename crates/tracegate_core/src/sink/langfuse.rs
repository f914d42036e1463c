//! Langfuse ingestion sink.
//!
//! Records are buffered as ingestion events and sent as one batch to
//! `POST {base_url}/api/public/ingestion` on flush. Trace updates reuse
//! `trace-create`, which Langfuse treats as an upsert by id.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracegate_observability::{record_duration, sink_span};
use tracing::{Instrument, debug, warn};

use super::{EventRecord, FeedbackScore, GenerationRecord, TraceBody, TraceSink, TraceUpdate};
use crate::config::LangfuseConfig;
use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Serialize)]
struct IngestionEvent {
    id: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: &'static str,
    body: serde_json::Value,
}

#[derive(Serialize)]
struct IngestionBatch<'a> {
    batch: &'a [IngestionEvent],
}

#[derive(Debug, Default, Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    successes: Vec<serde_json::Value>,
    #[serde(default)]
    errors: Vec<IngestionError>,
}

#[derive(Debug, Deserialize)]
struct IngestionError {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    message: Option<String>,
}

pub struct LangfuseSink {
    config: LangfuseConfig,
    client: Client,
    buffer: Mutex<Vec<IngestionEvent>>,
}

impl LangfuseSink {
    pub fn new(config: LangfuseConfig) -> Result<Self> {
        if config.public_key.is_empty() || config.secret_key.is_empty() {
            return Err(GatewayError::Config("Langfuse keys must not be empty".into()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            buffer: Mutex::new(Vec::new()),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LangfuseConfig::from_env()?)
    }

    /// Events waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    fn ingestion_url(&self) -> String {
        format!(
            "{}/api/public/ingestion",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn enqueue<T: Serialize>(&self, kind: &'static str, body: &T) -> Result<()> {
        let event = IngestionEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            body: serde_json::to_value(body)?,
        };
        self.buffer.lock().push(event);
        Ok(())
    }

    async fn send(&self, batch: Vec<IngestionEvent>) -> Result<()> {
        let start = Instant::now();
        let size = batch.len();

        let response = self
            .client
            .post(self.ingestion_url())
            .basic_auth(&self.config.public_key, Some(&self.config.secret_key))
            .json(&IngestionBatch { batch: &batch })
            .send()
            .await?;

        record_duration("duration_ms", start.elapsed());

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GatewayError::Sink(format!(
                "Langfuse ingestion error {}: {}",
                status, text
            )));
        }

        // 207 Multi-Status carries per-event results.
        let parsed: IngestionResponse = serde_json::from_str(&text).unwrap_or_default();
        if parsed.errors.is_empty() {
            debug!(
                batch.size = size,
                accepted = parsed.successes.len(),
                "Langfuse batch ingested"
            );
            return Ok(());
        }

        for rejected in &parsed.errors {
            warn!(
                event.id = %rejected.id,
                status = rejected.status,
                message = rejected.message.as_deref().unwrap_or(""),
                "Langfuse rejected ingestion event"
            );
        }
        Err(GatewayError::Sink(format!(
            "Langfuse rejected {} of {} events",
            parsed.errors.len(),
            size
        )))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceUpsert<'a> {
    id: &'a str,
    #[serde(flatten)]
    update: &'a TraceUpdate,
}

#[async_trait]
impl TraceSink for LangfuseSink {
    fn sink_id(&self) -> &str {
        "langfuse"
    }

    fn open_trace(&self, trace: TraceBody) -> Result<()> {
        self.enqueue("trace-create", &trace)
    }

    fn update_trace(&self, trace_id: &str, update: TraceUpdate) -> Result<()> {
        self.enqueue(
            "trace-create",
            &TraceUpsert {
                id: trace_id,
                update: &update,
            },
        )
    }

    fn add_generation(&self, generation: GenerationRecord) -> Result<()> {
        self.enqueue("generation-create", &generation)
    }

    fn add_event(&self, event: EventRecord) -> Result<()> {
        self.enqueue("event-create", &event)
    }

    fn add_score(&self, score: FeedbackScore) -> Result<()> {
        self.enqueue("score-create", &score)
    }

    async fn flush(&self) -> Result<()> {
        // Drained before sending: a failed batch is dropped, not retried.
        let batch = std::mem::take(&mut *self.buffer.lock());
        if batch.is_empty() {
            return Ok(());
        }

        let span = sink_span!("langfuse", "flush");
        span.record("batch.size", batch.len());
        self.send(batch).instrument(span).await
    }
}
