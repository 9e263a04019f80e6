//! Client-side query cache
//!
//! Holds the last fetched value of every query the client reads, keyed by
//! [`QueryKey`]. Values are typed per key and shared by all readers.
//!
//! - Invalidation marks entries stale but keeps their values, so readers can
//!   keep rendering while a refetch runs (stale-while-revalidate)
//! - Each key carries a generation; a fetch that started before an
//!   invalidation of its key is stored but stays stale
//! - Concurrent fetches of one key share a single in-flight request
//! - At most [`MAX_SEARCH_ENTRIES`] search results are kept; the least
//!   recently written is evicted first

mod error;
mod keys;
mod metrics;

pub use error::{CacheError, CacheResult};
pub use keys::{QueryKey, CACHE_VERSION};
pub use metrics::CacheMetrics;

use dashmap::DashMap;
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Search results kept before the oldest is evicted
pub const MAX_SEARCH_ENTRIES: usize = 16;

/// Value returned by cache reads
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    pub value: T,
    /// The key was invalidated after this value was fetched
    pub is_stale: bool,
}

struct Entry {
    value: Box<dyn Any + Send + Sync>,
    stale: bool,
    written_at: Instant,
    /// Write order, for eviction
    seq: u64,
}

struct Inner {
    store: DashMap<QueryKey, Entry>,
    /// Bumped on every invalidation, tracked even for keys with no entry
    generations: DashMap<QueryKey, u64>,
    /// Per-key fetch locks; an entry lives only while a fetch holds or waits on it
    inflight: DashMap<QueryKey, Arc<Mutex<()>>>,
    writes: AtomicU64,
    metrics: CacheMetrics,
}

/// Shared query cache. Cloning is cheap; clones see the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_metrics(CacheMetrics::new())
    }

    pub fn with_metrics(metrics: CacheMetrics) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: DashMap::new(),
                generations: DashMap::new(),
                inflight: DashMap::new(),
                writes: AtomicU64::new(0),
                metrics,
            }),
        }
    }

    /// Typed lookup without metrics
    pub fn try_read<T>(&self, key: &QueryKey) -> CacheResult<Option<CacheRead<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let Some(entry) = self.inner.store.get(key) else {
            return Ok(None);
        };

        match (*entry.value).downcast_ref::<T>() {
            Some(value) => Ok(Some(CacheRead {
                value: value.clone(),
                is_stale: entry.stale,
            })),
            None => Err(CacheError::TypeMismatch {
                key: key.cache_key(),
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    /// Last value of `key`, flagged when stale. A value stored under
    /// another type reads as a miss.
    pub fn read<T>(&self, key: &QueryKey) -> Option<CacheRead<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.try_read::<T>(key) {
            Ok(Some(read)) => {
                if read.is_stale {
                    self.inner.metrics.record_stale_hit(key);
                    debug!(key = %key, "Query cache stale hit");
                } else {
                    self.inner.metrics.record_hit(key);
                    debug!(key = %key, "Query cache hit");
                }
                Some(read)
            }
            Ok(None) => {
                self.inner.metrics.record_miss(key);
                debug!(key = %key, "Query cache miss");
                None
            }
            Err(e) => {
                self.inner.metrics.record_error(key, "type_mismatch");
                warn!(key = %key, error = %e, "Query cache type mismatch, treating as miss");
                None
            }
        }
    }

    /// Store a fresh value for `key`
    pub fn write<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.store(key, value, false);
    }

    fn store<T>(&self, key: QueryKey, value: T, stale: bool)
    where
        T: Send + Sync + 'static,
    {
        self.inner.metrics.record_write(&key);
        debug!(key = %key, stale, "Query cache store");
        let seq = self.inner.writes.fetch_add(1, Ordering::Relaxed);
        let is_search = matches!(key, QueryKey::Search(_));
        self.inner.store.insert(
            key,
            Entry {
                value: Box::new(value),
                stale,
                written_at: Instant::now(),
                seq,
            },
        );
        if is_search {
            self.evict_searches();
        }
    }

    fn evict_searches(&self) {
        loop {
            let mut count = 0;
            let mut oldest: Option<(u64, QueryKey)> = None;
            for entry in self.inner.store.iter() {
                if !matches!(entry.key(), QueryKey::Search(_)) {
                    continue;
                }
                count += 1;
                if oldest.as_ref().map_or(true, |(seq, _)| entry.seq < *seq) {
                    oldest = Some((entry.seq, entry.key().clone()));
                }
            }

            match oldest {
                Some((_, key)) if count > MAX_SEARCH_ENTRIES => {
                    self.inner.store.remove(&key);
                    debug!(key = %key, "Query cache evicted search entry");
                }
                _ => return,
            }
        }
    }

    /// Current invalidation generation of `key`
    pub fn generation(&self, key: &QueryKey) -> u64 {
        self.inner.generations.get(key).map(|g| *g).unwrap_or(0)
    }

    /// Store a value fetched when the key was at `started` generation. The
    /// value stays stale if the key was invalidated in the meantime.
    /// Returns whether the stored value is stale.
    pub fn write_as_of<T>(&self, key: QueryKey, value: T, started: u64) -> bool
    where
        T: Send + Sync + 'static,
    {
        let stale = self.generation(&key) != started;
        if stale {
            debug!(key = %key, started, "Fetch raced an invalidation, keeping entry stale");
        }
        self.store(key, value, stale);
        stale
    }

    /// Mark entries stale, keeping their values
    pub fn invalidate(&self, keys: &[QueryKey]) {
        for key in keys {
            *self.inner.generations.entry(key.clone()).or_insert(0) += 1;
            if let Some(mut entry) = self.inner.store.get_mut(key) {
                entry.stale = true;
            }
            self.inner.metrics.record_invalidation(key);
            debug!(key = %key, "Query cache invalidate");
        }
    }

    /// `Some(true)` when `key` holds an invalidated value
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.inner.store.get(key).map(|entry| entry.stale)
    }

    pub fn remove(&self, key: &QueryKey) {
        self.inner.store.remove(key);
    }

    /// Drop every entry, e.g. on sign-out. Fetches still running store
    /// their results as stale.
    pub fn clear(&self) {
        let count = self.inner.store.len();
        self.inner.store.clear();

        let inflight = &self.inner.inflight;
        self.inner
            .generations
            .retain(|key, _| inflight.contains_key(key));
        for lock in inflight.iter() {
            *self
                .inner
                .generations
                .entry(lock.key().clone())
                .or_insert(0) += 1;
        }
        debug!(cleared_entries = count, "Query cache clear");
    }

    fn key_lock(&self, key: &QueryKey) -> Arc<Mutex<()>> {
        self.inner
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release_key_lock(&self, key: &QueryKey, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.inner
            .inflight
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn fresh<T>(&self, key: &QueryKey) -> Option<CacheRead<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.try_read::<T>(key) {
            Ok(Some(read)) if !read.is_stale => Some(read),
            _ => None,
        }
    }

    /// Read-through fetch
    ///
    /// A fresh entry is returned as is. A stale entry or a miss runs
    /// `fetcher` and stores its result. Concurrent calls for the same key
    /// wait for the first one and reuse its result.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<CacheRead<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(read) = self.read::<T>(&key) {
            if !read.is_stale {
                return Ok(read);
            }
        }

        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(&key, fetcher).await
        };
        self.release_key_lock(&key, lock);
        result
    }

    async fn fetch_locked<T, E, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheRead<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // Another caller may have completed the fetch while we waited
        if let Some(read) = self.fresh::<T>(key) {
            return Ok(read);
        }

        let started = self.generation(key);
        match fetcher().await {
            Ok(value) => {
                let is_stale = self.write_as_of(key.clone(), value.clone(), started);
                Ok(CacheRead { value, is_stale })
            }
            Err(e) => {
                self.inner.metrics.record_error(key, "fetch");
                Err(e)
            }
        }
    }

    /// Stale-while-revalidate fetch
    ///
    /// A stale entry is returned immediately while the refetch runs on the
    /// runtime in the background. Misses behave like [`QueryCache::fetch`].
    pub async fn fetch_swr<T, E, F, Fut>(
        &self,
        key: QueryKey,
        fetcher: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        E: std::fmt::Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        match self.read::<T>(&key) {
            Some(read) if !read.is_stale => Ok(read),
            Some(read) => {
                let cache = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = cache.fetch::<T, E, F, Fut>(key.clone(), fetcher).await {
                        warn!(key = %key, error = %e, "Background revalidation failed");
                    }
                });
                Ok(read)
            }
            None => self.fetch(key, fetcher).await,
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.inner.store.iter() {
            stats.entries += 1;
            if entry.stale {
                stats.stale_entries += 1;
            }
            let age = entry.written_at.elapsed().as_millis() as u64;
            stats.oldest_entry_ms = stats.oldest_entry_ms.max(age);
        }
        stats
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache occupancy snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub stale_entries: usize,
    /// Age of the oldest entry in milliseconds
    pub oldest_entry_ms: u64,
}
