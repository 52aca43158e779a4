// src/session/mod.rs

use crate::memory::{ConversationMemory, MemoryError, Turn};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Slot under which a session keeps its serialized conversation memory.
pub const MEMORY_SLOT: &str = "memory";

/// Everything one browser session carries between interactions.
#[derive(Debug, Default)]
pub struct SessionContext {
    slots: HashMap<String, Value>,
    /// Last history that was successfully loaded and rendered.
    pub history: Vec<Turn>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(None)` when no memory has been stored yet.
    pub fn load_memory(&self) -> Result<Option<ConversationMemory>, MemoryError> {
        self.slots
            .get(MEMORY_SLOT)
            .cloned()
            .map(ConversationMemory::from_value)
            .transpose()
    }

    pub fn store_memory(&mut self, memory: &ConversationMemory) -> Result<(), MemoryError> {
        self.slots.insert(MEMORY_SLOT.into(), memory.to_value()?);
        Ok(())
    }

    pub fn clear_memory(&mut self) {
        self.slots.remove(MEMORY_SLOT);
    }

    pub fn has_memory(&self) -> bool {
        self.slots.contains_key(MEMORY_SLOT)
    }

    pub fn slot(&self, key: &str) -> Option<&Value> {
        self.slots.get(key)
    }

    pub fn set_slot(&mut self, key: &str, value: Value) {
        self.slots.insert(key.into(), value);
    }
}

pub type SessionHandle = Arc<Mutex<SessionContext>>;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// All live sessions, keyed by the id stored in the browser cookie.
///
/// A session that has not been touched for `ttl` is dropped, together with
/// its memory, the next time the store is swept.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Returns the session for `id`, creating one when the id is unknown,
    /// expired or absent. The bool is true when a new session was started.
    pub fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle, bool) {
        self.get_or_create_at(id, Instant::now())
    }

    pub fn get_or_create_at(&self, id: Option<&str>, now: Instant) -> (String, SessionHandle, bool) {
        if let Some(id) = id {
            if let Some(mut entry) = self.sessions.get_mut(id) {
                if now.saturating_duration_since(entry.last_seen) <= self.ttl {
                    entry.last_seen = now;
                    return (id.to_string(), entry.handle.clone(), false);
                }
            }
        }

        self.sweep_at(now);

        let id = Uuid::new_v4().to_string();
        let handle = SessionHandle::default();
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(session = %id, "🆕 new session");
        (id, handle, true)
    }

    /// Drops every session idle for longer than the ttl. Returns how many went.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, "🧹 expired sessions dropped");
        }
        evicted
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
