//! Subscriber setup: env filter, console output, and optional OTLP span export.

use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::error::ObservabilityError;

// Kept for flushing spans on shutdown
static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Install the global tracing subscriber.
///
/// Console output goes to stderr so that command output on stdout stays
/// machine-readable. When `otlp_endpoint` is set, spans are also exported over
/// OTLP/gRPC; if the exporter cannot be built the subscriber falls back to
/// console-only.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    let env_filter = config
        .log_level
        .as_ref()
        .map(|level| tracing_subscriber::EnvFilter::new(level.as_str()))
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        });

    let mut attributes = vec![KeyValue::new("service.name", config.service_name.clone())];
    if let Some(version) = &config.service_version {
        attributes.push(KeyValue::new("service.version", version.clone()));
    }
    for (key, value) in &config.resource_attributes {
        attributes.push(KeyValue::new(key.clone(), value.clone()));
    }
    let resource = Resource::builder().with_attributes(attributes).build();

    let fmt_layer = config.enable_console.then(|| match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    });

    let mut otlp_failure = None;
    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            match build_otlp_tracer_provider(&config.service_name, endpoint, resource) {
                Ok((tracer, provider)) => {
                    global::set_tracer_provider(provider.clone());
                    let _ = TRACER_PROVIDER.set(provider);
                    Some(OpenTelemetryLayer::new(tracer))
                }
                Err(e) => {
                    otlp_failure = Some(e);
                    None
                }
            }
        }
        None => None,
    };

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| ObservabilityError::AlreadyInitialized(e.to_string()))?;

    match (&config.otlp_endpoint, otlp_failure) {
        (Some(endpoint), None) => tracing::info!(
            service.name = %config.service_name,
            otlp.endpoint = %endpoint,
            "OTLP span export enabled"
        ),
        (Some(endpoint), Some(e)) => tracing::warn!(
            service.name = %config.service_name,
            otlp.endpoint = %endpoint,
            error = %e,
            "OTLP export unavailable, logging to console only"
        ),
        (None, _) => tracing::debug!(
            service.name = %config.service_name,
            "Tracing initialized without OTLP export"
        ),
    }

    Ok(())
}

fn build_otlp_tracer_provider(
    service_name: &str,
    endpoint: &str,
    resource: Resource,
) -> Result<(opentelemetry_sdk::trace::SdkTracer, SdkTracerProvider), ObservabilityError> {
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.to_string())
        .build()
        .map_err(|e| ObservabilityError::InitFailed(e.to_string()))?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer(service_name.to_string());

    Ok((tracer, provider))
}

/// Flush and stop the OTLP exporter, if one was installed.
pub fn shutdown() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "OTLP tracer provider shutdown failed");
        }
    }
}

/// Initialize from environment variables (see [`ObservabilityConfig::from_env`]).
pub fn init_from_env() -> Result<(), ObservabilityError> {
    init(ObservabilityConfig::from_env())
}
