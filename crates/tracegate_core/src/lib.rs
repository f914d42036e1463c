//! Tracegate: an observability gateway for externally hosted chat clients.
//!
//! Callers submit chat interactions and feedback; the gateway checks the
//! caller against an identity directory and forwards accepted data to a
//! trace sink such as Langfuse.
//!
//! # Key Features
//!
//! - **Stampede-safe validation**: results are cached per (client address, identity)
//!   and concurrent misses collapse onto one directory lookup behind a distributed lock
//! - **Fail-open**: cache or lock backend outages cost extra lookups, never availability
//! - **Session grouping**: submissions sharing a `chatId`/`sessionId` land in one trace
//! - **Pluggable backends**: Redis or in-process for the cache, Langfuse or memory for the sink
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tracegate_core::{
//!     GatewayConfig, LangfuseSink, Role, StaticDirectory, SubmitTraceRequest, TraceCollector,
//!     TraceMetadata, kv,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env();
//!     let backend = kv::from_config(&config)?;
//!     let directory = StaticDirectory::from_file("identities.txt").await?;
//!     let sink = LangfuseSink::from_env()?;
//!
//!     let collector =
//!         TraceCollector::new(config, backend, Arc::new(directory), Arc::new(sink))?;
//!     collector.start().await;
//!
//!     let request = SubmitTraceRequest::new("ada@example.com", "What is 2+2?", "203.0.113.7")
//!         .role(Role::Assistant)
//!         .response("4")
//!         .metadata(TraceMetadata::new().chat_id("chat-42").model("gpt-4o"));
//!     let outcome = collector.submit(request).await;
//!     println!("accepted: {} trace: {:?}", outcome.success, outcome.trace_id);
//!
//!     collector.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod collector;
pub mod config;
pub mod directory;
pub mod error;
pub mod kv;
pub mod mutex;
pub mod registry;
pub mod sink;
pub mod types;
pub mod validator;

// Re-export main types at crate root
pub use collector::{
    CHAT_FAILURE_MESSAGE, CollectorState, DEFAULT_FEEDBACK_NAME, FEEDBACK_FAILURE_MESSAGE,
    INVALID_IDENTITY_MESSAGE, TraceCollector,
};
pub use config::{GatewayConfig, LangfuseConfig};
pub use directory::{IdentityDirectory, StaticDirectory};
pub use error::{GatewayError, Result};
pub use kv::{KvBackend, MemoryKv, RedisKv};
pub use mutex::{Acquisition, DistributedMutex};
pub use registry::{ChatTrace, RecordKind, TraceHandle, TraceSessionRegistry};
pub use sink::{LangfuseSink, MemorySink, SinkCall, TraceSink};
pub use types::{
    AttributeValue, FeedbackOutcome, FeedbackRequest, Role, SubmitOutcome, SubmitTraceRequest,
    TraceMetadata, UsageInput,
};
pub use validator::IdentityValidator;
