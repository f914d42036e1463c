//! tracegate observability: logging and span export setup for the gateway
//!
//! Wraps `tracing-subscriber` (env filter + console output, text or JSON) and
//! an optional OpenTelemetry OTLP exporter, and provides span macros used by
//! `tracegate-core`.
//!
//! # Quick Start
//!
//! ```no_run
//! use tracegate_observability::{ObservabilityConfig, init};
//!
//! let config = ObservabilityConfig::new("tracegate")
//!     .with_otlp_endpoint("http://localhost:4317")
//!     .with_log_level("info");
//!
//! init(config)?;
//! tracing::info!("Gateway started");
//! # Ok::<(), tracegate_observability::ObservabilityError>(())
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_SERVICE_NAME` or `SERVICE_NAME` - Service name
//! - `OTEL_SERVICE_VERSION` or `SERVICE_VERSION` - Service version
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint
//! - `OTEL_LOG_LEVEL` or `RUST_LOG` - Log level filter
//! - `TRACEGATE_LOG_FORMAT` - `text` or `json`

pub mod config;
pub mod error;
pub mod telemetry;
pub mod tracing;

pub use config::{LogFormat, ObservabilityConfig};
pub use error::ObservabilityError;
pub use telemetry::{init, init_from_env, shutdown};
pub use self::tracing::{record_duration, record_error};
