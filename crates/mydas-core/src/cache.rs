//! Process-wide result cache shared by every data source
//!
//! Each entry is keyed by a string fingerprint and tagged with the id of the
//! data source that produced it (its *group*). An entry moves through a small
//! state machine:
//!
//! - absent -> `Pending` when a caller misses and starts computing the value
//! - `Pending` -> `Committed` when the computation succeeds
//! - `Pending` -> absent when the computation fails
//!
//! Failures are never stored, so a transient backend fault is retried by the
//! next request. Concurrent misses on the same key may each run the
//! computation; only committed values are ever returned from a lookup.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Type-erased cached value
pub type CachedValue = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
enum EntryState {
    Pending,
    Committed(CachedValue),
}

struct CacheEntry {
    group: String,
    state: EntryState,
}

#[derive(Default)]
struct GroupState {
    keys: HashSet<String>,
    /// Bumped on every flush so that computations started before the flush
    /// do not commit stale values afterwards
    generation: u64,
}

#[derive(Default)]
struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    groups: HashMap<String, GroupState>,
}

/// Proof that a caller moved a key into the `Pending` state
struct PendingTicket {
    generation: u64,
}

/// Lookup/compute/commit/cancel coordinator around the shared store
#[derive(Default)]
pub struct CacheCoordinator {
    store: RwLock<CacheStore>,
}

impl CacheCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the committed value for `key`, if any.
    ///
    /// A value committed under a different type is reported as a miss.
    pub fn lookup<V>(&self, key: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let store = self.store.read();
        match store.entries.get(key).map(|entry| &entry.state) {
            Some(EntryState::Committed(value)) => value.clone().downcast::<V>().ok(),
            _ => None,
        }
    }

    /// Return the cached value for `key`, or run `compute` and commit its
    /// result under `(key, group)`.
    ///
    /// On failure the pending entry is removed and the error is returned
    /// unchanged.
    pub async fn get_or_compute<V, E, F, Fut>(
        &self,
        key: &str,
        group: &str,
        compute: F,
    ) -> Result<Arc<V>, E>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup::<V>(key) {
            debug!("Cache hit: {}", key);
            return Ok(value);
        }

        debug!("Cache miss: {}", key);
        let ticket = self.begin(key, group);

        match compute().await {
            Ok(value) => {
                let value = Arc::new(value);
                self.commit(key, group, ticket, value.clone());
                Ok(value)
            }
            Err(e) => {
                self.cancel(key);
                Err(e)
            }
        }
    }

    fn begin(&self, key: &str, group: &str) -> PendingTicket {
        let mut store = self.store.write();
        let generation = store.groups.entry(group.to_string()).or_default().generation;

        let needs_pending = !matches!(
            store.entries.get(key).map(|entry| &entry.state),
            Some(EntryState::Committed(_))
        );
        if needs_pending {
            store.entries.insert(
                key.to_string(),
                CacheEntry {
                    group: group.to_string(),
                    state: EntryState::Pending,
                },
            );
        }

        PendingTicket { generation }
    }

    fn commit(&self, key: &str, group: &str, ticket: PendingTicket, value: CachedValue) {
        let mut store = self.store.write();
        let CacheStore { entries, groups } = &mut *store;
        let group_state = groups.entry(group.to_string()).or_default();

        if group_state.generation != ticket.generation {
            debug!("Group {} flushed while computing {}, not caching", group, key);
            if matches!(
                entries.get(key).map(|entry| &entry.state),
                Some(EntryState::Pending)
            ) {
                entries.remove(key);
            }
            return;
        }

        group_state.keys.insert(key.to_string());
        entries.insert(
            key.to_string(),
            CacheEntry {
                group: group.to_string(),
                state: EntryState::Committed(value),
            },
        );
    }

    fn cancel(&self, key: &str) {
        let mut store = self.store.write();
        if matches!(
            store.entries.get(key).map(|entry| &entry.state),
            Some(EntryState::Pending)
        ) {
            store.entries.remove(key);
            debug!("Cancelled pending cache entry: {}", key);
        }
    }

    /// Remove every entry tagged with `group`, returning how many committed
    /// values were dropped.
    pub fn flush_group(&self, group: &str) -> usize {
        let mut store = self.store.write();
        let CacheStore { entries, groups } = &mut *store;

        let group_state = groups.entry(group.to_string()).or_default();
        group_state.generation += 1;

        let mut removed = 0;
        for key in group_state.keys.drain() {
            if entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        entries.retain(|_, entry| entry.group != group);

        debug!("Flushed {} cached entries for group {}", removed, group);
        removed
    }

    /// Remove everything
    pub fn flush_all(&self) {
        let mut store = self.store.write();
        store.entries.clear();
        for group_state in store.groups.values_mut() {
            group_state.keys.clear();
            group_state.generation += 1;
        }
    }

    /// Number of committed entries
    pub fn len(&self) -> usize {
        self.store
            .read()
            .entries
            .values()
            .filter(|entry| matches!(entry.state, EntryState::Committed(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a committed value exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        matches!(
            self.store.read().entries.get(key).map(|entry| &entry.state),
            Some(EntryState::Committed(_))
        )
    }

    /// Handle scoped to one group, given to a data source so it can empty
    /// its own cached results when its content changes
    pub fn group_handle(self: &Arc<Self>, group: impl Into<String>) -> CacheGroupHandle {
        CacheGroupHandle {
            cache: self.clone(),
            group: group.into(),
        }
    }
}

/// Cache access restricted to a single data source's group
#[derive(Clone)]
pub struct CacheGroupHandle {
    cache: Arc<CacheCoordinator>,
    group: String,
}

impl CacheGroupHandle {
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Drop every cached result of this group
    pub fn empty_cache(&self) -> usize {
        self.cache.flush_group(&self.group)
    }
}

impl std::fmt::Debug for CacheGroupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheGroupHandle")
            .field("group", &self.group)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_second_lookup_does_not_recompute() {
        let cache = CacheCoordinator::new();
        let calls = AtomicUsize::new(0);

        let first: Arc<String> = cache
            .get_or_compute("ds_FEATURES_chr1", "ds", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("value".to_string())
            })
            .await
            .unwrap();

        let second: Arc<String> = cache
            .get_or_compute("ds_FEATURES_chr1", "ds", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("other".to_string())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(second.as_str(), "value");
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = CacheCoordinator::new();
        let calls = AtomicUsize::new(0);

        let result: Result<Arc<u32>, &str> = cache
            .get_or_compute("key", "ds", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("backend down")
            })
            .await;
        assert_eq!(result.unwrap_err(), "backend down");
        assert!(!cache.contains("key"));
        assert!(cache.is_empty());

        let result: Result<Arc<u32>, &str> = cache
            .get_or_compute("key", "ds", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(*result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pending_entry_is_not_visible() {
        let cache = CacheCoordinator::new();
        let _ticket = cache.begin("key", "ds");

        assert!(cache.lookup::<u32>("key").is_none());
        assert!(!cache.contains("key"));
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_flush_group_only_touches_that_group() {
        let cache = CacheCoordinator::new();
        for (key, group) in [("a_1", "a"), ("a_2", "a"), ("b_1", "b")] {
            let _: Arc<u32> = cache
                .get_or_compute(key, group, || async { Ok::<_, ()>(1) })
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.flush_group("a"), 2);
        assert!(!cache.contains("a_1"));
        assert!(!cache.contains("a_2"));
        assert!(cache.contains("b_1"));
    }

    #[tokio::test]
    async fn test_flush_during_compute_discards_result() {
        let cache = Arc::new(CacheCoordinator::new());
        let handle = cache.group_handle("ds");

        let value: Arc<u32> = cache
            .get_or_compute("ds_key", "ds", || async {
                handle.empty_cache();
                Ok::<_, ()>(3)
            })
            .await
            .unwrap();

        assert_eq!(*value, 3);
        assert!(!cache.contains("ds_key"));
    }

    #[test]
    fn test_lookup_with_wrong_type_is_a_miss() {
        let cache = CacheCoordinator::new();
        let ticket = cache.begin("key", "ds");
        cache.commit("key", "ds", ticket, Arc::new(5u32));

        assert!(cache.lookup::<String>("key").is_none());
        assert_eq!(cache.lookup::<u32>("key").as_deref(), Some(&5));
    }

    #[test]
    fn test_group_handle_reports_group() {
        let cache = Arc::new(CacheCoordinator::new());
        let handle = cache.group_handle("ensembl");
        assert_eq!(handle.group(), "ensembl");
        assert_eq!(handle.empty_cache(), 0);
    }
}
