//! In-process session registry: session key → live chat trace.
//!
//! Bounded by capacity (least-recently-used eviction) and by idle time.
//! Evicting an entry only forgets the handle; the trace already forwarded to
//! the sink is untouched, and the next submission for that key opens a new one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

/// Kind of record attached to a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Generation,
    Event,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Generation => "generation",
            RecordKind::Event => "event",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Child record reference kept on the trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    pub id: String,
    pub kind: RecordKind,
}

#[derive(Debug, Default, Clone)]
pub struct TraceState {
    pub tags: Vec<String>,
    pub last_input: Option<String>,
    pub output: Option<String>,
    pub records: Vec<RecordRef>,
}

/// One conversation's trace. Mutable fields follow last-write-wins.
#[derive(Debug)]
pub struct ChatTrace {
    id: String,
    session_key: String,
    state: Mutex<TraceState>,
}

impl ChatTrace {
    pub fn new(id: impl Into<String>, session_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_key: session_key.into(),
            state: Mutex::new(TraceState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Replace tags and last input.
    pub fn update(&self, tags: Vec<String>, input: impl Into<String>) {
        let mut state = self.state.lock();
        state.tags = tags;
        state.last_input = Some(input.into());
    }

    pub fn set_output(&self, output: impl Into<String>) {
        self.state.lock().output = Some(output.into());
    }

    pub fn push_record(&self, id: impl Into<String>, kind: RecordKind) {
        self.state.lock().records.push(RecordRef {
            id: id.into(),
            kind,
        });
    }

    pub fn snapshot(&self) -> TraceState {
        self.state.lock().clone()
    }
}

pub type TraceHandle = Arc<ChatTrace>;

struct Slot {
    trace: TraceHandle,
    last_access: Instant,
}

pub struct TraceSessionRegistry {
    slots: Mutex<HashMap<String, Slot>>,
    capacity: usize,
    idle_ttl: Duration,
}

impl TraceSessionRegistry {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            idle_ttl,
        }
    }

    /// Return the live trace for `session_key`, or open one with `open`.
    ///
    /// Lookup and insert happen under one lock, so concurrent callers for a
    /// new key open exactly one trace. `open` must not block.
    pub fn get_or_create<F>(&self, session_key: &str, open: F) -> Result<TraceHandle>
    where
        F: FnOnce() -> Result<ChatTrace>,
    {
        let now = Instant::now();
        let mut slots = self.slots.lock();

        if let Some(slot) = slots.get_mut(session_key) {
            if now.duration_since(slot.last_access) < self.idle_ttl {
                slot.last_access = now;
                return Ok(slot.trace.clone());
            }
            debug!(session.key = session_key, "Session idle past TTL, reopening");
            slots.remove(session_key);
        }

        let trace = Arc::new(open()?);

        if slots.len() >= self.capacity {
            self.make_room(&mut slots, now);
        }
        slots.insert(
            session_key.to_string(),
            Slot {
                trace: trace.clone(),
                last_access: now,
            },
        );
        Ok(trace)
    }

    pub fn get(&self, session_key: &str) -> Option<TraceHandle> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(session_key)?;
        if now.duration_since(slot.last_access) >= self.idle_ttl {
            return None;
        }
        slot.last_access = now;
        Some(slot.trace.clone())
    }

    pub fn remove(&self, session_key: &str) -> Option<TraceHandle> {
        self.slots.lock().remove(session_key).map(|slot| slot.trace)
    }

    /// Drop every idle session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| now.duration_since(slot.last_access) < self.idle_ttl);
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(&self, slots: &mut HashMap<String, Slot>, now: Instant) {
        slots.retain(|_, slot| now.duration_since(slot.last_access) < self.idle_ttl);
        while slots.len() >= self.capacity {
            let Some(oldest) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            debug!(session.key = %oldest, "Evicting least recently used session");
            slots.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    fn opener(id: &str, key: &str) -> impl FnOnce() -> Result<ChatTrace> {
        let (id, key) = (id.to_string(), key.to_string());
        move || Ok(ChatTrace::new(id, key))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reuses_existing_session() {
        let registry = TraceSessionRegistry::new(10, Duration::from_secs(60));
        let first = registry.get_or_create("chat-1", opener("t-1", "chat-1")).unwrap();
        let second = registry
            .get_or_create("chat-1", || panic!("must not reopen"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_registers_nothing() {
        let registry = TraceSessionRegistry::new(10, Duration::from_secs(60));
        let result = registry.get_or_create("chat-1", || Err(GatewayError::Sink("down".into())));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_least_recently_used() {
        let registry = TraceSessionRegistry::new(2, Duration::from_secs(600));
        registry.get_or_create("a", opener("t-a", "a")).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.get_or_create("b", opener("t-b", "b")).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(registry.get("a").is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.get_or_create("c", opener("t-c", "c")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("a").is_some());
        assert!(registry.get("b").is_none());
        assert!(registry.get("c").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_reopened() {
        let registry = TraceSessionRegistry::new(10, Duration::from_secs(30));
        let first = registry.get_or_create("chat", opener("t-1", "chat")).unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(registry.get("chat").is_none());
        let second = registry.get_or_create("chat", opener("t-2", "chat")).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(second.id(), "t-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let registry = TraceSessionRegistry::new(10, Duration::from_secs(30));
        registry.get_or_create("old", opener("t-1", "old")).unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;
        registry.get_or_create("new", opener("t-2", "new")).unwrap();
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(registry.purge_expired(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("new").is_some());
    }

    #[test]
    fn test_trace_state_last_write_wins() {
        let trace = ChatTrace::new("t-1", "chat");
        trace.update(vec!["a".into()], "first");
        trace.update(vec!["b".into()], "second");
        trace.push_record("r-1", RecordKind::Event);
        trace.set_output("done");

        let state = trace.snapshot();
        assert_eq!(state.tags, vec!["b"]);
        assert_eq!(state.last_input.as_deref(), Some("second"));
        assert_eq!(state.output.as_deref(), Some("done"));
        assert_eq!(state.records.len(), 1);
    }
}
