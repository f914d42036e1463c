//! Span helpers shared by the gateway crates

/// Span for one submit-trace call.
///
/// `trace.id` and `record.kind` start empty and are filled in once known.
///
/// ```rust
/// use tracegate_observability::submit_span;
///
/// let span = submit_span!("chat-42", "assistant");
/// span.record("record.kind", "generation");
/// ```
#[macro_export]
macro_rules! submit_span {
    ($session_key:expr, $role:expr) => {
        tracing::info_span!(
            "gateway.submit",
            session.key = $session_key,
            role = $role,
            trace.id = tracing::field::Empty,
            record.kind = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    };
}

/// Span for identity validation; `$digest` is the hashed cache key, never the raw identity.
#[macro_export]
macro_rules! validation_span {
    ($digest:expr) => {
        tracing::debug_span!(
            "gateway.validate",
            identity.digest = $digest,
            cache.hit = tracing::field::Empty,
            lock.outcome = tracing::field::Empty,
        )
    };
}

/// Span for a sink operation (flush, shutdown).
#[macro_export]
macro_rules! sink_span {
    ($sink:expr, $operation:expr) => {
        tracing::debug_span!(
            "sink.operation",
            sink.name = $sink,
            sink.operation = $operation,
            batch.size = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    };
}

/// Mark the current span as failed and log the error.
///
/// The span needs `error` and `error.message` fields declared, as the span
/// macros in this module do.
pub fn record_error<E: std::error::Error>(error: &E) {
    let span = tracing::Span::current();
    span.record("error", true);
    span.record("error.message", error.to_string());
    tracing::error!(error = %error, "Operation failed");
}

/// Record an elapsed duration in milliseconds on the current span.
///
/// The field must have been declared on the span (see [`submit_span!`]).
pub fn record_duration(key: &str, duration: std::time::Duration) {
    let span = tracing::Span::current();
    span.record(key, duration.as_millis() as u64);
}

#[cfg(test)]
mod tests {
    fn declares(span: &::tracing::Span, field: &str) -> bool {
        span.metadata()
            .is_some_and(|meta| meta.fields().field(field).is_some())
    }

    #[test]
    fn test_span_macros_declare_error_fields() {
        let subscriber = tracing_subscriber::registry();
        ::tracing::subscriber::with_default(subscriber, || {
            let submit = crate::submit_span!("chat-1", "user");
            let sink = crate::sink_span!("memory", "flush");
            for span in [&submit, &sink] {
                assert!(declares(span, "error"));
                assert!(declares(span, "error.message"));
                assert!(declares(span, "duration_ms"));
            }
        });
    }
}
