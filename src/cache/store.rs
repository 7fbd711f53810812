use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::Instant;
use tracing::debug;

use crate::cache::key::{Cached, QueryData, QueryKey, Resource};
use crate::config::StaleConfig;
use crate::error::ApiResult;

/// Bookkeeping for one key. Sequence numbers come from a single counter so
/// "fetch started before/after invalidation" is a plain comparison.
#[derive(Debug, Default)]
struct Entry {
    data: Option<QueryData>,
    fetched_at: Option<Instant>,
    /// seq taken when the stored data's fetch started
    fetched_seq: u64,
    /// seq taken when the stored data landed
    settled_seq: u64,
    invalidated_seq: u64,
    error: Option<String>,
}

impl Entry {
    fn invalidated(&self) -> bool {
        self.invalidated_seq > self.fetched_seq
    }
}

/// Read-side view of a key.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub is_fetching: bool,
    pub is_stale: bool,
    pub error: Option<String>,
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }
}

/// Typed, staleness-bounded cache of server reads with one in-flight
/// request per key.
pub struct QueryCache {
    stale: StaleConfig,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    inflight: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
    seq: AtomicU64,
    epoch: AtomicU64,
}

impl QueryCache {
    pub fn new(stale: StaleConfig) -> Self {
        Self {
            stale,
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    /// Cached value if still within its staleness window, else a request.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> ApiResult<T>
    where
        T: Cached,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if let Some(v) = self.fresh::<T>(&key) {
            debug!(%key, "cache hit");
            return Ok(v);
        }
        self.run(key, fetcher, false).await
    }

    /// Request regardless of freshness (focus, pull-to-refresh). Still joins
    /// a request already in flight for the key.
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> ApiResult<T>
    where
        T: Cached,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.run(key, fetcher, true).await
    }

    async fn run<T, F, Fut>(&self, key: QueryKey, fetcher: F, force: bool) -> ApiResult<T>
    where
        T: Cached,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let requested = self.next_seq();
        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            self.settle(key.clone(), fetcher, force, requested).await
        };
        self.release(&key, lock);
        result
    }

    /// Runs under the key's lock: joins a result that landed while waiting,
    /// otherwise fetches and stores.
    async fn settle<T, F, Fut>(
        &self,
        key: QueryKey,
        fetcher: F,
        force: bool,
        requested: u64,
    ) -> ApiResult<T>
    where
        T: Cached,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if let Some(v) = self.settled_since::<T>(&key, requested, force) {
            debug!(%key, "joined in-flight request");
            return Ok(v);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let started = self.next_seq();
        let at = Instant::now();
        debug!(%key, force, "fetching");
        let result = fetcher().await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(%key, "cache cleared while fetching; result dropped");
            return result;
        }
        let mut entries = self.lock_entries();
        let entry = entries.entry(key).or_default();
        match &result {
            Ok(v) => {
                entry.data = Some(v.clone().into_data());
                entry.fetched_at = Some(at);
                entry.fetched_seq = started;
                entry.settled_seq = self.next_seq();
                entry.error = None;
            }
            Err(e) => entry.error = Some(e.to_string()),
        }
        result
    }

    /// Last known value, fresh or not.
    pub fn get<T: Cached>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.lock_entries();
        entries.get(key).and_then(|e| e.data.as_ref()).and_then(T::from_data)
    }

    pub fn snapshot<T: Cached>(&self, key: &QueryKey) -> QueryState<T> {
        let is_fetching = {
            let inflight = self.lock_inflight();
            inflight
                .get(key)
                .map(|l| l.try_lock().is_err())
                .unwrap_or(false)
        };
        let entries = self.lock_entries();
        let entry = entries.get(key);
        QueryState {
            data: entry.and_then(|e| e.data.as_ref()).and_then(T::from_data),
            is_fetching,
            is_stale: entry.map_or(true, |e| !self.is_fresh(key, e)),
            error: entry.and_then(|e| e.error.clone()),
        }
    }

    /// Seed a key as if it had just been fetched.
    pub fn set<T: Cached>(&self, key: QueryKey, value: T) {
        let started = self.next_seq();
        let mut entries = self.lock_entries();
        let entry = entries.entry(key).or_default();
        entry.data = Some(value.into_data());
        entry.fetched_at = Some(Instant::now());
        entry.fetched_seq = started;
        entry.settled_seq = self.next_seq();
        entry.error = None;
    }

    /// Mark every key of `resources` stale, including keys being fetched.
    pub fn invalidate(&self, resources: &[Resource]) {
        if resources.is_empty() {
            return;
        }
        let seq = self.next_seq();
        let inflight: Vec<QueryKey> = self
            .lock_inflight()
            .keys()
            .filter(|k| resources.contains(&k.resource()))
            .cloned()
            .collect();
        let mut entries = self.lock_entries();
        for key in inflight {
            entries.entry(key).or_default();
        }
        let mut n = 0usize;
        for (key, entry) in entries.iter_mut() {
            if resources.contains(&key.resource()) {
                entry.invalidated_seq = seq;
                n += 1;
            }
        }
        debug!(?resources, keys = n, "invalidated");
    }

    pub fn invalidate_key(&self, key: &QueryKey) {
        let seq = self.next_seq();
        let mut entries = self.lock_entries();
        entries.entry(key.clone()).or_default().invalidated_seq = seq;
    }

    /// Drop all data. Requests in flight will not repopulate the cache.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.lock_entries().clear();
        self.lock_inflight().clear();
        debug!("query cache cleared");
    }

    fn fresh<T: Cached>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.lock_entries();
        let entry = entries.get(key)?;
        if !self.is_fresh(key, entry) {
            return None;
        }
        entry.data.as_ref().and_then(T::from_data)
    }

    fn is_fresh(&self, key: &QueryKey, entry: &Entry) -> bool {
        let Some(at) = entry.fetched_at else {
            return false;
        };
        entry.data.is_some()
            && !entry.invalidated()
            && at.elapsed() < key.resource().stale_after(&self.stale)
    }

    fn settled_since<T: Cached>(&self, key: &QueryKey, requested: u64, force: bool) -> Option<T> {
        let entries = self.lock_entries();
        let entry = entries.get(key)?;
        let joined = entry.settled_seq > requested && !entry.invalidated();
        if joined || (!force && self.is_fresh(key, entry)) {
            entry.data.as_ref().and_then(T::from_data)
        } else {
            None
        }
    }

    fn key_lock(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.lock_inflight();
        Arc::clone(
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Drops the key's slot once no other caller holds or waits on it.
    /// Clones are only taken under the map lock, so the count cannot grow here.
    fn release(&self, key: &QueryKey, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.lock_inflight();
        let idle = inflight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &lock))
            && Arc::strong_count(&lock) == 2;
        if idle {
            inflight.remove(key);
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_inflight(&self) -> MutexGuard<'_, HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>> {
        self.inflight.lock().unwrap_or_else(|p| p.into_inner())
    }
}
