//! Distributed mutex: set-if-absent lock with TTL and a bounded wait-for-release.
//!
//! The lock is fail-open. When the backend cannot be reached, `acquire`
//! reports the lock as taken by the caller, so a backend outage costs
//! duplicate directory lookups rather than stalled requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::kv::KvBackend;

/// Proof of lock ownership; the random value stored under the lock key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    key: String,
    value: String,
}

impl LockToken {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Outcome of [`DistributedMutex::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// The caller holds the lock
    Held(LockToken),
    /// Backend unreachable; proceed as if held
    Bypassed,
    /// Someone else holds the lock
    Contended,
}

impl Acquisition {
    pub fn is_acquired(&self) -> bool {
        !matches!(self, Acquisition::Contended)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Acquisition::Held(_) => "held",
            Acquisition::Bypassed => "bypassed",
            Acquisition::Contended => "contended",
        }
    }
}

#[derive(Clone)]
pub struct DistributedMutex {
    backend: Arc<dyn KvBackend>,
    backoff_base: Duration,
}

impl DistributedMutex {
    pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(50);
    pub const DEFAULT_WAIT_ATTEMPTS: u32 = 5;

    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            backoff_base: Self::DEFAULT_BACKOFF_BASE,
        }
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub async fn acquire(&self, key: &str, ttl: Duration) -> Acquisition {
        let value = uuid::Uuid::new_v4().to_string();
        match self.backend.set_nx_px(key, &value, ttl).await {
            Ok(true) => Acquisition::Held(LockToken {
                key: key.to_string(),
                value,
            }),
            Ok(false) => Acquisition::Contended,
            Err(e) => {
                warn!(
                    key,
                    backend = self.backend.backend_id(),
                    error = %e,
                    "Lock backend unavailable, proceeding without lock"
                );
                Acquisition::Bypassed
            }
        }
    }

    /// Release a held lock. Deletes the key only if it still carries this
    /// holder's token; an expired lock re-taken by another caller survives.
    pub async fn release(&self, acquisition: Acquisition) {
        let Acquisition::Held(token) = acquisition else {
            return;
        };
        match self
            .backend
            .compare_and_delete(&token.key, &token.value)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(key = %token.key, "Lock expired before release"),
            Err(e) => warn!(key = %token.key, error = %e, "Lock release failed"),
        }
    }

    /// Poll until `key` disappears, sleeping `base × 2^attempt` before each
    /// check. Returns `true` once the key is gone (or the backend stops
    /// answering), `false` after `max_attempts` checks found it still held.
    pub async fn wait_for_release(&self, key: &str, max_attempts: u32) -> bool {
        for attempt in 0..max_attempts {
            tokio::time::sleep(self.backoff_base * 2u32.saturating_pow(attempt)).await;
            match self.backend.exists(key).await {
                Ok(false) => return true,
                Ok(true) => continue,
                Err(e) => {
                    warn!(key, error = %e, "Lock poll failed, ending wait");
                    return true;
                }
            }
        }
        debug!(key, max_attempts, "Lock still held after wait");
        false
    }
}
