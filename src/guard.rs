//! Mutual exclusion for the lifecycle controller: a scoped lock per user id
//! and an in-flight set that drops duplicate external triggers.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per key. Entries are removed once nobody holds
/// or waits on them.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

pub struct KeyedGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let m = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = m.lock_owned().await;
        KeyedGuard { key: key.to_string(), guard: Some(guard), locks: self.locks.clone() }
    }

    /// Keys with a live mutex (held or awaited).
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // unlock first; the map entry then has no other owner unless a waiter cloned it
        drop(self.guard.take());
        self.locks.remove_if(&self.key, |_, m| Arc::strong_count(m) == 1);
    }
}

/// Set of trigger ids currently being processed.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<DashSet<String>>,
}

pub struct InFlightGuard {
    key: String,
    keys: Arc<DashSet<String>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the same trigger is already running.
    pub fn try_begin(&self, key: &str) -> Option<InFlightGuard> {
        if self.keys.insert(key.to_string()) {
            Some(InFlightGuard { key: key.to_string(), keys: self.keys.clone() })
        } else {
            None
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}
