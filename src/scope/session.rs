//! Session-backed scope storage.
//!
//! A `SessionStore` belongs to exactly one end-user session; the host hands
//! the bridge the store of the session the current request belongs to.
//! Concurrent requests of the same session (two browser tabs) may race on
//! one key: creation is atomic, later writes are last-writer-wins, and a
//! lost update between two tabs is accepted.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::errors::SessionError;

/// Prefix of session keys holding request scopes.
pub const SCOPE_SESSION_PREFIX: &str = "phase_bridge.scope.";

/// Session key for a scope id.
pub fn scope_session_key(scope_id: &str) -> String {
    format!("{SCOPE_SESSION_PREFIX}{scope_id}")
}

/// Storage scoped to one end-user session, holding opaque serialized values.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;

    /// Overwrite (last writer wins).
    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), SessionError>;

    /// Store only when the key is absent. Returns whether the value was stored.
    fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, SessionError>;

    fn remove(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, SessionError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                Ok(true)
            }
        }
    }

    fn remove(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        Ok(self.entries.remove(key).map(|(_, value)| value))
    }
}
