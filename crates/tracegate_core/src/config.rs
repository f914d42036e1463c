//! Gateway configuration.
//!
//! Defaults are tuned so that a lock outlives a normal directory lookup and
//! the full lock wait (~1.55 s) stays well under a request timeout.

use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Tags attached to every trace unless overridden.
pub const DEFAULT_TAGS: &[&str] = &["external-api", "chat"];

/// Configuration for the trace collector and its validation path.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Prefix for every cache and lock key
    pub key_prefix: String,
    /// How long a validation result stays cached
    pub cache_ttl: Duration,
    /// Lock TTL; must be shorter than a request's worst-case processing time
    pub lock_ttl: Duration,
    /// Polls performed by `wait_for_release`
    pub lock_wait_attempts: u32,
    /// First backoff delay; doubles on every attempt
    pub lock_backoff_base: Duration,
    /// Maximum live sessions held by the registry
    pub session_capacity: usize,
    /// Sessions untouched for this long are treated as absent
    pub session_idle_ttl: Duration,
    /// Tags added to every trace
    pub default_tags: Vec<String>,
    /// Redis URL for the cache/lock backend (None = in-process backend)
    pub redis_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            key_prefix: "tracegate".to_string(),
            cache_ttl: Duration::from_secs(300),
            lock_ttl: Duration::from_millis(5_000),
            lock_wait_attempts: 5,
            lock_backoff_base: Duration::from_millis(50),
            session_capacity: 10_000,
            session_idle_ttl: Duration::from_secs(3_600),
            default_tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            redis_url: None,
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_lock_wait(mut self, attempts: u32, backoff_base: Duration) -> Self {
        self.lock_wait_attempts = attempts;
        self.lock_backoff_base = backoff_base;
        self
    }

    pub fn with_session_capacity(mut self, capacity: usize) -> Self {
        self.session_capacity = capacity;
        self
    }

    pub fn with_session_idle_ttl(mut self, ttl: Duration) -> Self {
        self.session_idle_ttl = ttl;
        self
    }

    pub fn with_default_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Upper bound on time spent in `wait_for_release`.
    pub fn max_lock_wait(&self) -> Duration {
        (0..self.lock_wait_attempts)
            .map(|attempt| self.lock_backoff_base * 2u32.saturating_pow(attempt))
            .sum()
    }

    /// Reject values that would disable caching, locking, or the registry.
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(GatewayError::Config("cache TTL must be positive".into()));
        }
        if self.lock_ttl.is_zero() {
            return Err(GatewayError::Config("lock TTL must be positive".into()));
        }
        if self.session_capacity == 0 {
            return Err(GatewayError::Config("session capacity must be positive".into()));
        }
        if self.session_idle_ttl.is_zero() {
            return Err(GatewayError::Config("session idle TTL must be positive".into()));
        }
        if self.key_prefix.trim().is_empty() {
            return Err(GatewayError::Config("key prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(prefix) = lookup("TRACEGATE_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        if let Some(secs) = lookup("TRACEGATE_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(ms) = lookup("TRACEGATE_LOCK_TTL_MS").and_then(|v| v.parse().ok()) {
            config.lock_ttl = Duration::from_millis(ms);
        }

        if let Some(attempts) = lookup("TRACEGATE_LOCK_WAIT_ATTEMPTS").and_then(|v| v.parse().ok())
        {
            config.lock_wait_attempts = attempts;
        }

        if let Some(ms) = lookup("TRACEGATE_LOCK_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            config.lock_backoff_base = Duration::from_millis(ms);
        }

        if let Some(capacity) = lookup("TRACEGATE_SESSION_CAPACITY").and_then(|v| v.parse().ok())
        {
            config.session_capacity = capacity;
        }

        if let Some(secs) = lookup("TRACEGATE_SESSION_IDLE_SECS").and_then(|v| v.parse().ok()) {
            config.session_idle_ttl = Duration::from_secs(secs);
        }

        if let Some(tags) = lookup("TRACEGATE_DEFAULT_TAGS") {
            config.default_tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.redis_url = lookup("TRACEGATE_REDIS_URL").or_else(|| lookup("REDIS_URL"));

        config
    }
}

/// Connection settings for the Langfuse ingestion API.
#[derive(Clone)]
pub struct LangfuseConfig {
    /// Base URL, e.g. "https://cloud.langfuse.com"
    pub base_url: String,
    pub public_key: String,
    pub secret_key: String,
    /// Per-request timeout for ingestion calls
    pub timeout: Duration,
}

impl std::fmt::Debug for LangfuseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangfuseConfig")
            .field("base_url", &self.base_url)
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LangfuseConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://cloud.langfuse.com";

    pub fn new(
        base_url: impl Into<String>,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create config from environment variables.
    ///
    /// Required: `LANGFUSE_PUBLIC_KEY`, `LANGFUSE_SECRET_KEY`
    /// Optional: `LANGFUSE_BASE_URL` or `LANGFUSE_HOST` (default: https://cloud.langfuse.com)
    /// Optional: `LANGFUSE_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let public_key = lookup("LANGFUSE_PUBLIC_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::Config("LANGFUSE_PUBLIC_KEY not set".into()))?;
        let secret_key = lookup("LANGFUSE_SECRET_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::Config("LANGFUSE_SECRET_KEY not set".into()))?;
        let base_url = lookup("LANGFUSE_BASE_URL")
            .or_else(|| lookup("LANGFUSE_HOST"))
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());

        let mut config = Self::new(base_url, public_key, secret_key);
        if let Some(secs) = lookup("LANGFUSE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::new();
        assert_eq!(config.key_prefix, "tracegate");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.lock_ttl, Duration::from_millis(5_000));
        assert_eq!(config.lock_wait_attempts, 5);
        assert_eq!(config.default_tags, vec!["external-api", "chat"]);
        assert!(config.redis_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_lock_wait_matches_backoff_schedule() {
        let config = GatewayConfig::new();
        assert_eq!(config.max_lock_wait(), Duration::from_millis(1_550));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("TRACEGATE_CACHE_TTL_SECS", "60"),
            ("TRACEGATE_LOCK_TTL_MS", "2500"),
            ("TRACEGATE_LOCK_WAIT_ATTEMPTS", "3"),
            ("TRACEGATE_SESSION_CAPACITY", "12"),
            ("TRACEGATE_DEFAULT_TAGS", " api , , web "),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
        ]));

        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.lock_ttl, Duration::from_millis(2_500));
        assert_eq!(config.lock_wait_attempts, 3);
        assert_eq!(config.session_capacity, 12);
        assert_eq!(config.default_tags, vec!["api", "web"]);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("TRACEGATE_CACHE_TTL_SECS", "soon"),
            ("TRACEGATE_SESSION_CAPACITY", "-1"),
        ]));
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(GatewayConfig::new().with_cache_ttl(Duration::ZERO).validate().is_err());
        assert!(GatewayConfig::new().with_lock_ttl(Duration::ZERO).validate().is_err());
        assert!(GatewayConfig::new().with_session_capacity(0).validate().is_err());
        assert!(GatewayConfig::new().with_key_prefix("  ").validate().is_err());
    }

    #[test]
    fn test_langfuse_requires_keys() {
        let err = LangfuseConfig::from_lookup(lookup_from(&[("LANGFUSE_PUBLIC_KEY", "pk")]))
            .unwrap_err();
        assert!(err.to_string().contains("LANGFUSE_SECRET_KEY"));
    }

    #[test]
    fn test_langfuse_from_lookup() {
        let config = LangfuseConfig::from_lookup(lookup_from(&[
            ("LANGFUSE_PUBLIC_KEY", "pk-lf-1"),
            ("LANGFUSE_SECRET_KEY", "sk-lf-1"),
            ("LANGFUSE_HOST", "http://localhost:3000"),
            ("LANGFUSE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(!format!("{config:?}").contains("sk-lf-1"));
    }
}
