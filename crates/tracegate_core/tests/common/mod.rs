//! Shared test doubles for the integration tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracegate_core::{
    GatewayConfig, GatewayError, IdentityDirectory, KvBackend, MemoryKv, MemorySink, Result,
    TraceCollector,
};

pub const REGISTERED: &str = "alice@example.com";
pub const CLIENT: &str = "198.51.100.4";

/// Directory that counts lookups and can simulate latency or failure.
pub struct CountingDirectory {
    identities: HashSet<String>,
    lookups: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl CountingDirectory {
    pub fn new(identities: &[&str]) -> Self {
        Self {
            identities: identities.iter().map(|s| s.to_lowercase()).collect(),
            lookups: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    #[allow(dead_code)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityDirectory for CountingDirectory {
    async fn exists_by_identity(&self, identity: &str) -> Result<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(GatewayError::Directory("directory offline".into()));
        }
        Ok(self.identities.contains(identity))
    }
}

/// Backend whose every call fails, as if Redis were down.
pub struct UnreachableKv;

#[async_trait]
impl KvBackend for UnreachableKv {
    fn backend_id(&self) -> &str {
        "unreachable"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(GatewayError::Backend("connection refused".into()))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        Err(GatewayError::Backend("connection refused".into()))
    }

    async fn set_nx_px(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool> {
        Err(GatewayError::Backend("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(GatewayError::Backend("connection refused".into()))
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Err(GatewayError::Backend("connection refused".into()))
    }

    async fn compare_and_delete(&self, _key: &str, _expected: &str) -> Result<bool> {
        Err(GatewayError::Backend("connection refused".into()))
    }

    async fn ping(&self) -> Result<()> {
        Err(GatewayError::Backend("connection refused".into()))
    }
}

/// Collector wired to in-memory doubles.
#[allow(dead_code)]
pub struct Harness {
    pub collector: TraceCollector,
    pub kv: Arc<MemoryKv>,
    pub directory: Arc<CountingDirectory>,
    pub sink: Arc<MemorySink>,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(CountingDirectory::new(&[REGISTERED]))
}

#[allow(dead_code)]
pub fn harness_with(directory: CountingDirectory) -> Harness {
    let kv = Arc::new(MemoryKv::new());
    let directory = Arc::new(directory);
    let sink = Arc::new(MemorySink::new());
    let collector = TraceCollector::new(
        GatewayConfig::default(),
        kv.clone(),
        directory.clone(),
        sink.clone(),
    )
    .expect("default config is valid");

    Harness {
        collector,
        kv,
        directory,
        sink,
    }
}
