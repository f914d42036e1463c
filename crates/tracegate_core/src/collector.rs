//! The gateway facade: validate, register, build, flush.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracegate_observability::{record_duration, record_error, sink_span, submit_span};
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::builder::{self, TraceBuilder};
use crate::config::GatewayConfig;
use crate::directory::IdentityDirectory;
use crate::error::{GatewayError, Result};
use crate::kv::KvBackend;
use crate::registry::TraceSessionRegistry;
use crate::sink::{FeedbackScore, TraceSink};
use crate::types::{FeedbackOutcome, FeedbackRequest, SubmitOutcome, SubmitTraceRequest};
use crate::validator::IdentityValidator;

pub const INVALID_IDENTITY_MESSAGE: &str = "Invalid email: not registered in system";
pub const CHAT_FAILURE_MESSAGE: &str = "Failed to process chat data";
pub const FEEDBACK_FAILURE_MESSAGE: &str = "Failed to process feedback data";
pub const DEFAULT_FEEDBACK_NAME: &str = "user-feedback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Running,
    Stopped,
}

/// Accepts chat interactions and feedback from external callers.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tracegate_core::{
///     GatewayConfig, MemoryKv, MemorySink, StaticDirectory, SubmitTraceRequest, TraceCollector,
/// };
///
/// # async fn run() -> tracegate_core::Result<()> {
/// let collector = TraceCollector::new(
///     GatewayConfig::default(),
///     Arc::new(MemoryKv::new()),
///     Arc::new(StaticDirectory::new(["a@b.com"])),
///     Arc::new(MemorySink::new()),
/// )?;
/// collector.start().await;
///
/// let outcome = collector
///     .submit(SubmitTraceRequest::new("a@b.com", "hello", "10.0.0.1"))
///     .await;
/// assert!(outcome.success);
///
/// collector.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct TraceCollector {
    kv: Arc<dyn KvBackend>,
    sink: Arc<dyn TraceSink>,
    validator: IdentityValidator,
    registry: TraceSessionRegistry,
    builder: TraceBuilder,
    state: Mutex<CollectorState>,
}

impl TraceCollector {
    pub fn new(
        config: GatewayConfig,
        kv: Arc<dyn KvBackend>,
        directory: Arc<dyn IdentityDirectory>,
        sink: Arc<dyn TraceSink>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            validator: IdentityValidator::new(kv.clone(), directory, &config),
            registry: TraceSessionRegistry::new(config.session_capacity, config.session_idle_ttl),
            builder: TraceBuilder::new(sink.clone(), config.default_tags.clone()),
            kv,
            sink,
            state: Mutex::new(CollectorState::Idle),
        })
    }

    pub fn state(&self) -> CollectorState {
        *self.state.lock()
    }

    pub fn registry(&self) -> &TraceSessionRegistry {
        &self.registry
    }

    pub fn validator(&self) -> &IdentityValidator {
        &self.validator
    }

    /// Check the backend and mark the collector running. Never fails.
    pub async fn start(&self) {
        match self.kv.ping().await {
            Ok(()) => info!(
                backend = self.kv.backend_id(),
                sink = self.sink.sink_id(),
                "Trace collector started"
            ),
            Err(e) => warn!(
                backend = self.kv.backend_id(),
                error = %e,
                "Backend unreachable at startup; validation will fail open"
            ),
        }

        let mut state = self.state.lock();
        if *state == CollectorState::Idle {
            *state = CollectorState::Running;
        }
    }

    /// Flush and close the sink. Later calls are no-ops.
    pub async fn shutdown(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state == CollectorState::Stopped {
                return Ok(());
            }
            *state = CollectorState::Stopped;
        }

        let dropped = self.registry.len();
        let span = sink_span!(self.sink.sink_id(), "shutdown");
        let result = self.sink.shutdown().instrument(span).await;
        match &result {
            Ok(()) => info!(sessions = dropped, "Trace collector stopped"),
            Err(e) => warn!(error = %e, "Sink shutdown failed"),
        }
        result
    }

    /// Record one chat interaction.
    ///
    /// Only an unregistered identity is reported as such; every other
    /// failure collapses into [`CHAT_FAILURE_MESSAGE`].
    pub async fn submit(&self, request: SubmitTraceRequest) -> SubmitOutcome {
        // Generated keys embed the identity, so they stay out of the span.
        let label = builder::explicit_session_key(&request.metadata).unwrap_or("generated");
        let span = submit_span!(label, request.role.as_str());
        let start = Instant::now();

        async {
            let outcome = match self.process(&request).await {
                Ok(Some(trace_id)) => SubmitOutcome::accepted(trace_id),
                Ok(None) => SubmitOutcome::failed(INVALID_IDENTITY_MESSAGE),
                Err(e) => {
                    record_error(&e);
                    SubmitOutcome::failed(CHAT_FAILURE_MESSAGE)
                }
            };
            record_duration("duration_ms", start.elapsed());
            outcome
        }
        .instrument(span)
        .await
    }

    /// `Ok(None)` when the identity is not registered.
    async fn process(&self, request: &SubmitTraceRequest) -> Result<Option<String>> {
        if self.state() == CollectorState::Stopped {
            return Err(GatewayError::ShutDown);
        }

        let valid = self
            .validator
            .validate(&request.identity, &request.client_address)
            .await?;
        if !valid {
            info!("Rejected submission from unregistered identity");
            return Ok(None);
        }

        let span = tracing::Span::current();
        let session_key = builder::session_key(&request.identity, &request.metadata);
        let tags = self.builder.tags_for(&request.metadata);

        let trace = self.registry.get_or_create(&session_key, || {
            self.builder.open(&session_key, request, &tags)
        })?;
        span.record("trace.id", trace.id());

        let record = self.builder.attach(&trace, request, tags)?;
        span.record("record.kind", record.kind.as_str());

        // A failed flush leaves the trace registered for the next submission.
        self.sink.flush().await?;

        debug!(record.id = %record.id, "Submission forwarded");
        Ok(Some(trace.id().to_string()))
    }

    /// Attach a feedback score to an existing trace.
    ///
    /// Returns `Err(MissingField("traceId"))` without any I/O when the trace
    /// id is absent or blank; sink failures become [`FEEDBACK_FAILURE_MESSAGE`].
    pub async fn submit_feedback(&self, request: FeedbackRequest) -> Result<FeedbackOutcome> {
        let trace_id = request
            .trace_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(GatewayError::MissingField("traceId"))?
            .to_string();

        let span = tracing::info_span!(
            "gateway.feedback",
            trace.id = %trace_id,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        );
        async {
            match self.forward_feedback(trace_id, request).await {
                Ok(()) => Ok(FeedbackOutcome::accepted()),
                Err(e) => {
                    record_error(&e);
                    Ok(FeedbackOutcome::failed(FEEDBACK_FAILURE_MESSAGE))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn forward_feedback(&self, trace_id: String, request: FeedbackRequest) -> Result<()> {
        if self.state() == CollectorState::Stopped {
            return Err(GatewayError::ShutDown);
        }

        let name = request
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FEEDBACK_NAME.to_string());

        self.sink.add_score(FeedbackScore {
            id: Uuid::new_v4().to_string(),
            trace_id,
            name,
            value: request.value,
            comment: request.comment,
        })?;
        self.sink.flush().await
    }
}
