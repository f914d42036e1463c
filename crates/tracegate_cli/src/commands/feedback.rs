//! `tracegate feedback`

use std::sync::Arc;

use anyhow::{Result, bail};
use tracegate_core::{FeedbackRequest, GatewayConfig, MemoryKv, StaticDirectory, TraceCollector};

use super::{choose_sink, print_recorded};
use crate::output;

pub async fn handle(
    trace_id: String,
    value: f64,
    comment: Option<String>,
    name: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let choice = choose_sink(dry_run)?;

    // Feedback never validates an identity, so no cache or directory is needed.
    let collector = TraceCollector::new(
        GatewayConfig::from_env(),
        Arc::new(MemoryKv::new()),
        Arc::new(StaticDirectory::default()),
        choice.sink,
    )?;

    let request = FeedbackRequest {
        trace_id: Some(trace_id),
        value,
        comment,
        name,
    };
    let outcome = collector.submit_feedback(request).await?;
    collector.shutdown().await?;

    if let Some(memory) = &choice.recorded {
        print_recorded(memory);
    }

    output::data("outcome", &outcome);
    if !outcome.success {
        bail!(outcome.error.unwrap_or_else(|| "feedback failed".to_string()));
    }
    output::success("Feedback recorded");
    Ok(())
}
