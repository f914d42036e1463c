//! Stampede-safe identity validation.
//!
//! ```text
//! cache hit? ──yes──▶ cached value
//!     │no
//! acquire lock ──held/bypassed──▶ directory ─▶ cache fill ─▶ release
//!     │contended
//! wait for release ─▶ cache hit? ──yes──▶ cached value
//!                         │no
//!                     directory ─▶ cache fill
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracegate_observability::validation_span;
use tracing::{Instrument, debug};

use crate::cache::{IdentityCache, IdentityKeys, normalize_identity};
use crate::config::GatewayConfig;
use crate::directory::IdentityDirectory;
use crate::error::{GatewayError, Result};
use crate::kv::KvBackend;
use crate::mutex::{Acquisition, DistributedMutex};

#[derive(Clone)]
pub struct IdentityValidator {
    cache: IdentityCache,
    mutex: DistributedMutex,
    directory: Arc<dyn IdentityDirectory>,
    key_prefix: String,
    cache_ttl: Duration,
    lock_ttl: Duration,
    wait_attempts: u32,
}

impl IdentityValidator {
    pub fn new(
        backend: Arc<dyn KvBackend>,
        directory: Arc<dyn IdentityDirectory>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            cache: IdentityCache::new(backend.clone()),
            mutex: DistributedMutex::new(backend).with_backoff_base(config.lock_backoff_base),
            directory,
            key_prefix: config.key_prefix.clone(),
            cache_ttl: config.cache_ttl,
            lock_ttl: config.lock_ttl,
            wait_attempts: config.lock_wait_attempts,
        }
    }

    /// Whether `identity` is a registered principal, as seen from `client_address`.
    ///
    /// Errors only when the directory itself fails; backend trouble degrades
    /// to extra directory lookups.
    pub async fn validate(&self, identity: &str, client_address: &str) -> Result<bool> {
        let keys = IdentityKeys::derive(&self.key_prefix, client_address, identity);
        let span = validation_span!(keys.digest.as_str());
        self.validate_keys(&normalize_identity(identity), &keys)
            .instrument(span)
            .await
    }

    async fn validate_keys(&self, identity: &str, keys: &IdentityKeys) -> Result<bool> {
        let span = tracing::Span::current();

        if let Some(valid) = self.cache.get(&keys.cache_key).await {
            span.record("cache.hit", true);
            return Ok(valid);
        }
        span.record("cache.hit", false);

        let acquisition = self.mutex.acquire(&keys.lock_key, self.lock_ttl).await;
        span.record("lock.outcome", acquisition.as_str());

        if acquisition == Acquisition::Contended {
            self.mutex
                .wait_for_release(&keys.lock_key, self.wait_attempts)
                .await;
            if let Some(valid) = self.cache.get(&keys.cache_key).await {
                return Ok(valid);
            }
            debug!("No cached result after lock wait, querying directory directly");
            return self.lookup_and_fill(identity, keys).await;
        }

        let result = self.lookup_and_fill(identity, keys).await;
        self.mutex.release(acquisition).await;
        result
    }

    async fn lookup_and_fill(&self, identity: &str, keys: &IdentityKeys) -> Result<bool> {
        let valid = self
            .directory
            .exists_by_identity(identity)
            .await
            .map_err(|e| match e {
                GatewayError::Directory(_) => e,
                other => GatewayError::Directory(other.to_string()),
            })?;
        self.cache.set(&keys.cache_key, valid, self.cache_ttl).await;
        debug!(valid, "Directory lookup complete");
        Ok(valid)
    }
}
