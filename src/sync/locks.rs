//! Per-identifier serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per key, created on demand and dropped once nobody holds
/// or waits for it.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters.
    users: usize,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and hold it until the guard is dropped.
    /// Dropping the returned future while it waits releases its claim on the
    /// entry as well.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let (slot, lock) = self.enter(key);
        let guard = lock.lock_owned().await;
        KeyGuard { _guard: guard, _slot: slot }
    }

    fn enter(&self, key: &str) -> (Slot<'_>, Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let entry = locks.entry(key.to_string()).or_insert_with(|| Entry {
            lock: Arc::new(AsyncMutex::new(())),
            users: 0,
        });
        entry.users += 1;
        let slot = Slot {
            owner: self,
            key: key.to_string(),
        };
        (slot, entry.lock.clone())
    }

    /// Number of keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A claim on a key's entry, counted in `Entry::users`.
struct Slot<'a> {
    owner: &'a KeyedLocks,
    key: String,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = locks.get_mut(&self.key) {
            entry.users -= 1;
            if entry.users == 0 {
                locks.remove(&self.key);
            }
        }
    }
}

/// Held lock on one key. The mutex is released before the claim.
pub struct KeyGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _slot: Slot<'a>,
}
