//! Configuration for gateway logging and trace export

use serde::{Deserialize, Serialize};

/// How console log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Service name attached to exported spans (e.g., "tracegate")
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Service version (optional)
    pub service_version: Option<String>,

    /// OTLP endpoint for span export (e.g., "http://localhost:4317")
    pub otlp_endpoint: Option<String>,

    /// Emit log lines to stderr
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Console rendering
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter (e.g., "info", "tracegate_core=debug")
    /// Defaults to "info" if not set
    pub log_level: Option<String>,

    /// Additional resource attributes (key-value pairs)
    #[serde(default)]
    pub resource_attributes: Vec<(String, String)>,
}

fn default_service_name() -> String {
    "tracegate".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_version: None,
            otlp_endpoint: None,
            enable_console: true,
            log_format: LogFormat::default(),
            log_level: None,
            resource_attributes: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    /// Create a new configuration with service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Set OTLP endpoint
    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enable: bool) -> Self {
        self.enable_console = enable;
        self
    }

    /// Set console format
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Add resource attribute
    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource_attributes.push((key.into(), value.into()));
        self
    }

    /// Build from environment variables
    ///
    /// Reads:
    /// - `OTEL_SERVICE_NAME` or `SERVICE_NAME` → service_name
    /// - `OTEL_SERVICE_VERSION` or `SERVICE_VERSION` → service_version
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT` → otlp_endpoint
    /// - `OTEL_LOG_LEVEL` or `RUST_LOG` → log_level
    /// - `TRACEGATE_LOG_FORMAT` → log_format ("text" or "json")
    pub fn from_env() -> Self {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .or_else(|_| std::env::var("SERVICE_NAME"))
            .unwrap_or_else(|_| default_service_name());

        let service_version = std::env::var("OTEL_SERVICE_VERSION")
            .or_else(|_| std::env::var("SERVICE_VERSION"))
            .ok();

        // OTLP stays off unless explicitly configured.
        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let log_level = std::env::var("OTEL_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();

        let log_format = std::env::var("TRACEGATE_LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            service_name,
            service_version,
            otlp_endpoint,
            enable_console: true,
            log_format,
            log_level,
            resource_attributes: Vec::new(),
        }
    }
}
