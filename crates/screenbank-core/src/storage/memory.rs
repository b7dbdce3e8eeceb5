//! In-memory ledger store.
//!
//! Clones share one backing map, so two clones stand in for two processes
//! looking at the same preference store. Writes and flushes can be made to
//! fail to exercise the persistence-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{LedgerStore, StoreKey};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Shared {
    values: Mutex<HashMap<StoreKey, String>>,
    fail_writes: AtomicBool,
    failing_keys: Mutex<HashSet<StoreKey>>,
    fail_flush: AtomicBool,
    flushes: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes of `key` alone fail until reset.
    pub fn fail_writes_to(&self, key: StoreKey, fail: bool) {
        if let Ok(mut keys) = self.shared.failing_keys.lock() {
            if fail {
                keys.insert(key);
            } else {
                keys.remove(&key);
            }
        }
    }

    /// Make every subsequent `flush` fail until reset.
    pub fn fail_flush(&self, fail: bool) {
        self.shared.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Successful flushes so far.
    pub fn flush_count(&self) -> usize {
        self.shared.flushes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: StoreKey) -> Option<String> {
        self.shared
            .values
            .lock()
            .ok()
            .and_then(|values| values.get(&key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<StoreKey, String>>, StoreError> {
        self.shared
            .values
            .lock()
            .map_err(|_| StoreError::QueryFailed("memory store poisoned".into()))
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let key_fails = self
            .shared
            .failing_keys
            .lock()
            .map(|keys| keys.contains(&key))
            .unwrap_or(false);
        if key_fails || self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                key: key.as_str().to_string(),
                message: "injected write failure".into(),
            });
        }
        self.lock()?.insert(key, value.to_string());
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        if self.shared.fail_flush.load(Ordering::SeqCst) {
            return Err(StoreError::FlushFailed("injected flush failure".into()));
        }
        self.shared.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_values() {
        let foreground = MemoryStore::new();
        let background = foreground.clone();
        foreground.set(StoreKey::Balance, "12").unwrap();
        assert_eq!(background.get(StoreKey::Balance).unwrap().as_deref(), Some("12"));
    }

    #[test]
    fn injected_failures() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        assert!(store.set(StoreKey::Balance, "1").is_err());
        store.fail_writes(false);
        store.fail_flush(true);
        assert!(matches!(store.flush(), Err(StoreError::FlushFailed(_))));
        assert_eq!(store.flush_count(), 0);
    }

    #[test]
    fn injected_failure_for_one_key() {
        let store = MemoryStore::new();
        store.fail_writes_to(StoreKey::Transactions, true);
        assert!(store.set(StoreKey::Transactions, "[]").is_err());
        store.set(StoreKey::Balance, "5").unwrap();
        store.fail_writes_to(StoreKey::Transactions, false);
        store.set(StoreKey::Transactions, "[]").unwrap();
    }
}
