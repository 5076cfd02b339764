/// In-memory attestation dedup set
///
/// Holds every key attested during this process lifetime. Nothing is
/// persisted; a restart starts empty. Callers serialize work on one key
/// through [`AttestationCache::lock`] so that the membership check and the
/// insertion cannot interleave with another request for the same key.
use super::AttestationKey;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Attested keys plus per-key critical sections
#[derive(Debug, Default)]
pub struct AttestationCache {
    attested: RwLock<HashSet<AttestationKey>>,
    locks: Mutex<HashMap<AttestationKey, Arc<AsyncMutex<()>>>>,
}

impl AttestationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &AttestationKey) -> bool {
        self.attested
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(key)
    }

    /// Record a key; returns false if it was already present
    pub fn insert(&self, key: AttestationKey) -> bool {
        self.attested
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key)
    }

    pub fn len(&self) -> usize {
        self.attested
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enter the critical section for `key`, waiting for any holder
    pub async fn lock(&self, key: &AttestationKey) -> KeyGuard<'_> {
        let entry = {
            let mut locks = self.lock_table();
            // Entries left behind by cancelled waiters
            locks.retain(|_, entry| Arc::strong_count(entry) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        let guard = entry.lock_owned().await;

        KeyGuard {
            cache: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<AttestationKey, Arc<AsyncMutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.lock_table().len()
    }
}

/// Held while a request owns its key
#[derive(Debug)]
pub struct KeyGuard<'a> {
    cache: &'a AttestationCache,
    key: AttestationKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyGuard<'_> {
    pub fn key(&self) -> &AttestationKey {
        &self.key
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Entry is only referenced by the table once nobody waits on it
        let mut locks = self.cache.lock_table();
        if locks
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&self.key);
            debug!("Released key lock {}", self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_insert_and_contains() {
        let cache = AttestationCache::new();
        let key = AttestationKey::new("CP-1", "did:w3cp:abc");

        assert!(cache.is_empty());
        assert!(!cache.contains(&key));
        assert!(cache.insert(key.clone()));
        assert!(cache.contains(&key));
        assert!(!cache.insert(key.clone()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_exact_matches() {
        let cache = AttestationCache::new();
        cache.insert(AttestationKey::new("CP-1", "did:w3cp:abc"));

        assert!(!cache.contains(&AttestationKey::new("cp-1", "did:w3cp:abc")));
        assert!(!cache.contains(&AttestationKey::new("CP-1", "did:w3cp:ab")));
    }

    #[tokio::test]
    async fn test_lock_serializes_same_key() {
        let cache = Arc::new(AttestationCache::new());
        let key = AttestationKey::new("CP-1", "did:w3cp:abc");

        let first = cache.lock(&key).await;

        let waiter = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = cache.lock(&key).await;
                cache.contains(&key)
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        cache.insert(key.clone());
        drop(first);

        assert!(waiter.await.unwrap());
        assert_eq!(cache.lock_entries(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let cache = AttestationCache::new();
        let a = AttestationKey::new("CP-1", "did:w3cp:abc");
        let b = AttestationKey::new("CP-2", "did:w3cp:abc");

        let _first = cache.lock(&a).await;
        let second = tokio::time::timeout(Duration::from_millis(100), cache.lock(&b)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_entry_is_pruned() {
        let cache = Arc::new(AttestationCache::new());
        let key = AttestationKey::new("CP-1", "did:w3cp:abc");

        let holder = cache.lock(&key).await;
        let waiter = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = cache.lock(&key).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Waiter still references the entry when the holder leaves
        drop(holder);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(cache.lock_entries(), 1);

        let other = AttestationKey::new("CP-2", "did:w3cp:abc");
        drop(cache.lock(&other).await);
        assert_eq!(cache.lock_entries(), 0);
    }

    #[tokio::test]
    async fn test_lock_table_is_cleaned_up() {
        let cache = AttestationCache::new();
        let key = AttestationKey::new("CP-1", "did:w3cp:abc");

        {
            let guard = cache.lock(&key).await;
            assert_eq!(guard.key(), &key);
            assert_eq!(cache.lock_entries(), 1);
        }
        assert_eq!(cache.lock_entries(), 0);
    }
}
