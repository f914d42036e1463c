//! Key-value backend shared by the identity cache and the distributed mutex.
//!
//! ```text
//! KvBackend (trait)
//!   ├── MemoryKv   <- in-process map, per-key expiry on the tokio clock
//!   └── RedisKv    <- ConnectionManager, connected lazily on first use
//! ```
//!
//! Callers in this crate treat every error from a backend as soft: the cache
//! degrades to a miss and the mutex to "acquired".

mod memory;
mod redis_kv;

pub use self::memory::MemoryKv;
pub use self::redis_kv::RedisKv;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::GatewayConfig;
use crate::error::Result;

#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Short identifier used in logs (e.g. "redis", "memory").
    fn backend_id(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditional write with expiry.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Write only if `key` is absent. Returns `true` when the write happened.
    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Unconditional delete, part of the backend contract. Lock release uses
    /// [`compare_and_delete`](Self::compare_and_delete) instead, so the
    /// validation path never calls this.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically delete `key` only if it currently holds `expected`.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool>;

    /// Round-trip to the backend; used at startup to surface misconfiguration early.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Pick a backend from configuration: Redis when a URL is set, in-process otherwise.
pub fn from_config(config: &GatewayConfig) -> Result<Arc<dyn KvBackend>> {
    match &config.redis_url {
        Some(url) => Ok(Arc::new(RedisKv::open(url)?)),
        None => {
            tracing::warn!("No Redis URL configured, using in-process cache and locks");
            Ok(Arc::new(MemoryKv::new()))
        }
    }
}
