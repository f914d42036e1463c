use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EventRecord, FeedbackScore, GenerationRecord, TraceBody, TraceSink, TraceUpdate};
use crate::error::{GatewayError, Result};

/// Call recorded by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    OpenTrace(TraceBody),
    UpdateTrace { trace_id: String, update: TraceUpdate },
    Generation(GenerationRecord),
    Event(EventRecord),
    Score(FeedbackScore),
    Flush,
}

/// Sink that keeps every call in memory. Used for dry runs and tests.
#[derive(Default)]
pub struct MemorySink {
    calls: Mutex<Vec<SinkCall>>,
    flushes: AtomicUsize,
    fail_records: AtomicBool,
    fail_flush: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every record call return an error.
    pub fn fail_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }

    /// Make every flush return an error.
    pub fn fail_flush(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn traces(&self) -> Vec<TraceBody> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SinkCall::OpenTrace(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn generations(&self) -> Vec<GenerationRecord> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SinkCall::Generation(g) => Some(g.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SinkCall::Event(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn scores(&self) -> Vec<FeedbackScore> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SinkCall::Score(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SinkCall) -> Result<()> {
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(GatewayError::Sink("memory sink rejected record".into()));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl TraceSink for MemorySink {
    fn sink_id(&self) -> &str {
        "memory"
    }

    fn open_trace(&self, trace: TraceBody) -> Result<()> {
        self.record(SinkCall::OpenTrace(trace))
    }

    fn update_trace(&self, trace_id: &str, update: TraceUpdate) -> Result<()> {
        self.record(SinkCall::UpdateTrace {
            trace_id: trace_id.to_string(),
            update,
        })
    }

    fn add_generation(&self, generation: GenerationRecord) -> Result<()> {
        self.record(SinkCall::Generation(generation))
    }

    fn add_event(&self, event: EventRecord) -> Result<()> {
        self.record(SinkCall::Event(event))
    }

    fn add_score(&self, score: FeedbackScore) -> Result<()> {
        self.record(SinkCall::Score(score))
    }

    async fn flush(&self) -> Result<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(GatewayError::Sink("memory sink flush failed".into()));
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(SinkCall::Flush);
        Ok(())
    }
}
