use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::KvBackend;
use crate::error::Result;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process backend. Expiry follows `tokio::time`, so paused-clock tests
/// can advance past TTLs.
///
/// Only coordinates callers inside one process; use [`super::RedisKv`] when
/// several gateway instances share a directory.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    fn backend_id(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .get(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let matches = entries
            .get(key)
            .is_some_and(|e| e.is_live(now) && e.value == expected);
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_values_expire() {
        let kv = MemoryKv::new();
        kv.set_ex("k", "v", Duration::from_secs(2)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(!kv.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_nx_respects_live_keys_only() {
        let kv = MemoryKv::new();
        assert!(kv.set_nx_px("lock", "a", Duration::from_millis(100)).await.unwrap());
        assert!(!kv.set_nx_px("lock", "b", Duration::from_millis(100)).await.unwrap());

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(kv.set_nx_px("lock", "b", Duration::from_millis(100)).await.unwrap());
        assert_eq!(kv.get("lock").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_compare_and_delete() {
        let kv = MemoryKv::new();
        kv.set_ex("lock", "owner-1", Duration::from_secs(5)).await.unwrap();

        assert!(!kv.compare_and_delete("lock", "owner-2").await.unwrap());
        assert!(kv.exists("lock").await.unwrap());

        assert!(kv.compare_and_delete("lock", "owner-1").await.unwrap());
        assert!(!kv.exists("lock").await.unwrap());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let kv = MemoryKv::new();
        kv.set_ex("valid", "true", Duration::from_secs(5)).await.unwrap();

        kv.delete("valid").await.unwrap();
        assert!(kv.get("valid").await.unwrap().is_none());
        // Deleting a missing key is not an error.
        kv.delete("valid").await.unwrap();
    }
}
