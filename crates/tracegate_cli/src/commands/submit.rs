//! `tracegate submit`

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracegate_core::{
    GatewayConfig, Role, StaticDirectory, SubmitTraceRequest, TraceCollector, TraceMetadata,
    UsageInput, kv,
};

use super::{choose_sink, print_recorded};
use crate::cli::{RoleArg, SubmitArgs};
use crate::output;

async fn build_request(args: SubmitArgs) -> Result<SubmitTraceRequest> {
    if let Some(path) = &args.json {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("parsing request from {}", path.display()));
    }

    let (Some(identity), Some(client_address)) = (args.identity, args.client_address) else {
        bail!("--identity and --client-address are required without --json");
    };

    let mut metadata = TraceMetadata::new();
    metadata.chat_id = args.chat_id;
    metadata.session_id = args.session_id;
    metadata.task = args.task;
    metadata.source = args.source;
    metadata.model = args.model;
    metadata.tags = args.tags;
    if args.prompt_tokens.is_some() || args.completion_tokens.is_some() || args.total_tokens.is_some() {
        metadata.usage = Some(UsageInput {
            prompt_tokens: args.prompt_tokens,
            completion_tokens: args.completion_tokens,
            total_tokens: args.total_tokens,
        });
    }

    let role = match args.role {
        RoleArg::User => Role::User,
        RoleArg::Assistant => Role::Assistant,
    };
    let mut request = SubmitTraceRequest::new(identity, args.message, client_address)
        .role(role)
        .metadata(metadata);
    request.response = args.response;
    Ok(request)
}

pub async fn handle(args: SubmitArgs) -> Result<()> {
    let config = GatewayConfig::from_env();
    let backend = kv::from_config(&config)?;
    let directory = StaticDirectory::from_file(&args.directory)
        .await
        .with_context(|| format!("loading directory {}", args.directory.display()))?;
    let choice = choose_sink(args.dry_run)?;
    let request = build_request(args).await?;

    let collector = TraceCollector::new(config, backend, Arc::new(directory), choice.sink)?;
    collector.start().await;
    let outcome = collector.submit(request).await;
    collector.shutdown().await?;

    if let Some(memory) = &choice.recorded {
        print_recorded(memory);
    }

    output::data("outcome", &outcome);
    match (outcome.success, outcome.trace_id, outcome.error) {
        (true, Some(trace_id), _) => {
            output::success(&format!("Trace {trace_id} accepted"));
            Ok(())
        }
        (_, _, error) => bail!(error.unwrap_or_else(|| "submission failed".to_string())),
    }
}
