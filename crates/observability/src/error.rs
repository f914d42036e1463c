//! Error types for observability crate

use thiserror::Error;

/// Errors that can occur while setting up logging and trace export
#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// Failed to build the OTLP exporter
    #[error("Failed to initialize observability: {0}")]
    InitFailed(String),

    /// A global subscriber is already installed
    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
