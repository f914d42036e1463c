//! Error types for gateway operations.

use thiserror::Error;

/// Errors that can occur inside the gateway.
///
/// Only [`GatewayError::MissingField`] is meant to reach callers of the
/// collector; everything else is logged and folded into a result payload.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration error (missing env vars, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required request field was absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Cache/lock backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Identity directory lookup failure
    #[error("Directory error: {0}")]
    Directory(String),

    /// Observability sink rejected or failed a write
    #[error("Sink error: {0}")]
    Sink(String),

    /// The collector was shut down
    #[error("Collector is shut down")]
    ShutDown,

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        GatewayError::Backend(err.to_string())
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = GatewayError::MissingField("traceId");
        assert_eq!(err.to_string(), "Missing required field: traceId");
    }

    #[test]
    fn test_backend_message() {
        let err = GatewayError::Backend("connection refused".to_string());
        assert_eq!(err.to_string(), "Backend error: connection refused");
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = GatewayError::from(json_err);
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
