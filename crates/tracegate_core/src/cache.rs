//! Validation-result cache over the shared key-value backend.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::kv::KvBackend;

/// Cache and lock keys for one (client address, identity) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeys {
    /// Hex SHA-256 of the pair; safe to log
    pub digest: String,
    pub cache_key: String,
    pub lock_key: String,
}

impl IdentityKeys {
    /// Identity is trimmed and lowercased before hashing so that casing
    /// variants share one cache entry.
    pub fn derive(prefix: &str, client_address: &str, identity: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(client_address.trim().as_bytes());
        hasher.update(b":");
        hasher.update(normalize_identity(identity).as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        Self {
            cache_key: format!("{prefix}:identity:valid:{digest}"),
            lock_key: format!("{prefix}:identity:lock:{digest}"),
            digest,
        }
    }
}

pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// TTL'd boolean cache. Never fails: read errors are misses, write errors are dropped.
#[derive(Clone)]
pub struct IdentityCache {
    backend: Arc<dyn KvBackend>,
}

impl IdentityCache {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub async fn get(&self, key: &str) -> Option<bool> {
        match self.backend.get(key).await {
            Ok(Some(raw)) => match raw.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                other => {
                    warn!(key, value = other, "Ignoring unreadable validation cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(
                    key,
                    backend = self.backend.backend_id(),
                    error = %e,
                    "Validation cache read failed, treating as miss"
                );
                None
            }
        }
    }

    pub async fn set(&self, key: &str, valid: bool, ttl: Duration) {
        let value = if valid { "true" } else { "false" };
        if let Err(e) = self.backend.set_ex(key, value, ttl).await {
            warn!(
                key,
                backend = self.backend.backend_id(),
                error = %e,
                "Validation cache write failed"
            );
        }
    }
}
