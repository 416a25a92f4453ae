//! Short-lived, self-expiring membership sets.
//!
//! Every inserted key carries its own one-shot timer; there is no global
//! sweep. Re-inserting a key restarts its lifetime: the earlier timer sees
//! a stale generation and leaves the entry alone.

use bansync_core::DedupKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Suppresses reprocessing of events by (action, user, origin node).
///
/// In-memory and process-scoped; not a distributed lock.
pub type DedupStore = ExpiringSet<DedupKey>;

/// A concurrent set whose entries remove themselves after a TTL.
///
/// Timers are Tokio tasks, so inserts must happen inside a Tokio runtime.
pub struct ExpiringSet<K> {
    entries: Arc<DashMap<K, u64>>,
    generation: AtomicU64,
}

impl<K> Default for ExpiringSet<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }
}

impl<K> ExpiringSet<K>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the key is present
    pub fn has(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a key that removes itself after `ttl`
    pub fn insert_with_expiry(&self, key: K, ttl: Duration) {
        let generation = self.next_generation();
        self.entries.insert(key.clone(), generation);
        self.schedule_expiry(key, generation, ttl);
    }

    /// Insert the key unless it is already present.
    ///
    /// Returns false when the key was present. The check and the insert
    /// happen under the same shard lock, so concurrent callers racing on
    /// one key see exactly one `true`.
    pub fn try_insert_with_expiry(&self, key: K, ttl: Duration) -> bool {
        let generation = match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                let generation = self.next_generation();
                slot.insert(generation);
                generation
            }
        };
        self.schedule_expiry(key, generation, ttl);
        true
    }

    /// Remove a key ahead of its expiry. Returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn schedule_expiry(&self, key: K, generation: u64, ttl: Duration) {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if entries.remove_if(&key, |_, g| *g == generation).is_some() {
                trace!(key = ?key, "entry expired");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bansync_core::{Action, NodeId, UserId};

    const TTL: Duration = Duration::from_millis(10_000);

    fn key(user: u64) -> DedupKey {
        DedupKey {
            action: Action::Ban,
            user: UserId(user),
            origin: NodeId(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_present_until_ttl() {
        let store = DedupStore::new();
        store.insert_with_expiry(key(42), TTL);
        assert!(store.has(&key(42)));

        tokio::time::sleep(TTL - Duration::from_millis(1)).await;
        assert!(store.has(&key(42)));

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert!(!store.has(&key(42)));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_independently() {
        let store = DedupStore::new();
        store.insert_with_expiry(key(1), Duration::from_millis(1_000));
        store.insert_with_expiry(key(2), Duration::from_millis(5_000));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        tokio::task::yield_now().await;
        assert!(!store.has(&key(1)));
        assert!(store.has(&key(2)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_insert_claims_once() {
        let store = DedupStore::new();
        assert!(store.try_insert_with_expiry(key(7), TTL));
        assert!(!store.try_insert_with_expiry(key(7), TTL));

        tokio::time::sleep(TTL + Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert!(store.try_insert_with_expiry(key(7), TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_evict_reinserted_key() {
        let store = DedupStore::new();
        store.insert_with_expiry(key(9), Duration::from_millis(1_000));
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Restart the lifetime; the first timer fires at 1000ms and must not remove it.
        store.insert_with_expiry(key(9), Duration::from_millis(1_000));
        tokio::time::sleep(Duration::from_millis(700)).await;
        tokio::task::yield_now().await;
        assert!(store.has(&key(9)));

        tokio::time::sleep(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;
        assert!(!store.has(&key(9)));
    }

    #[tokio::test]
    async fn test_remove_before_expiry() {
        let store = ExpiringSet::<u64>::new();
        store.insert_with_expiry(5, TTL);
        assert!(store.remove(&5));
        assert!(!store.remove(&5));
        assert!(!store.has(&5));
    }
}
