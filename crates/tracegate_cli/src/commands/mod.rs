//! Command dispatch and the wiring shared by commands.

pub mod check;
pub mod feedback;
pub mod submit;
pub mod validate;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracegate_core::{LangfuseSink, MemorySink, SinkCall, TraceSink};

use crate::cli::{Cli, Command};
use crate::output;

pub async fn handle(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Submit(args) => submit::handle(args).await,
        Command::Feedback {
            trace_id,
            value,
            comment,
            name,
            dry_run,
        } => feedback::handle(trace_id, value, comment, name, dry_run).await,
        Command::Validate {
            identity,
            client_address,
            directory,
        } => validate::handle(&identity, &client_address, &directory).await,
        Command::Check => check::handle().await,
    }
}

/// The sink a command writes to. Dry runs keep a handle on the memory sink
/// so the recorded calls can be printed afterwards.
pub(crate) struct SinkChoice {
    pub sink: Arc<dyn TraceSink>,
    pub recorded: Option<Arc<MemorySink>>,
}

pub(crate) fn choose_sink(dry_run: bool) -> Result<SinkChoice> {
    if dry_run {
        let memory = Arc::new(MemorySink::new());
        return Ok(SinkChoice {
            sink: memory.clone(),
            recorded: Some(memory),
        });
    }
    let sink = LangfuseSink::from_env()
        .context("Langfuse is not configured (set LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY, or pass --dry-run)")?;
    Ok(SinkChoice {
        sink: Arc::new(sink),
        recorded: None,
    })
}

pub(crate) fn print_recorded(sink: &MemorySink) {
    output::header("Recorded sink calls");
    for call in sink.calls() {
        let (name, body) = match call {
            SinkCall::OpenTrace(trace) => ("open_trace", json!(trace)),
            SinkCall::UpdateTrace { trace_id, update } => {
                ("update_trace", json!({ "traceId": trace_id, "update": update }))
            }
            SinkCall::Generation(generation) => ("add_generation", json!(generation)),
            SinkCall::Event(event) => ("add_event", json!(event)),
            SinkCall::Score(score) => ("add_score", json!(score)),
            SinkCall::Flush => ("flush", serde_json::Value::Null),
        };
        output::data(name, &body);
    }
}
