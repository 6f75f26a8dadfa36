use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::executor::{CancellationToken, Completion, QueryExecutor};
use crate::types::{CachePolicy, Query, QueryError};

/// Named predicate used as the filter of an [`InMemoryExecutor`] query.
///
/// The name identifies the filter in the result cache, so two filters with
/// the same name must select the same records.
pub struct ItemFilter<T> {
    name: Arc<str>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> ItemFilter<T> {
    pub fn new<P>(name: &str, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            predicate: Arc::new(predicate),
        }
    }

    /// Filter selecting every record
    pub fn all() -> Self {
        Self::new("*", |_| true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, item: &T) -> bool {
        (self.predicate)(item)
    }
}

impl<T> Clone for ItemFilter<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> PartialEq for ItemFilter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> std::fmt::Debug for ItemFilter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ItemFilter").field(&self.name).finish()
    }
}

/// Cache key: filter name, skip, limit
type CacheKey = (Arc<str>, usize, Option<usize>);

type FetchResult<T> = std::result::Result<Vec<T>, QueryError>;

struct Shared<T> {
    records: RwLock<Vec<T>>,
    cache: Mutex<HashMap<CacheKey, Vec<T>>>,
    offline: AtomicBool,
    network_fetches: AtomicU64,
}

/// Query executor over an in-memory record set.
///
/// Network fetches read the live records and populate a per-query result
/// cache; cache reads return whatever was stored by an earlier fetch, so the
/// two can diverge after [`InMemoryExecutor::replace_records`]. Without a
/// latency completions run inline on the caller's thread, otherwise on a
/// spawned worker thread.
pub struct InMemoryExecutor<T> {
    shared: Arc<Shared<T>>,

    /// Simulated round-trip time of a network fetch
    latency: Option<Duration>,

    /// Local datastore mode: cache policies are unavailable and every
    /// fetch is a single local read
    local_datastore: bool,
}

impl<T: Clone + Send + Sync + 'static> InMemoryExecutor<T> {
    /// Create an executor serving `records`, completing inline
    pub fn new(records: Vec<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                records: RwLock::new(records),
                cache: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
                network_fetches: AtomicU64::new(0),
            }),
            latency: None,
            local_datastore: false,
        }
    }

    /// Complete fetches on a worker thread after `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Switch to local datastore mode
    pub fn with_local_datastore(mut self) -> Self {
        self.local_datastore = true;
        self
    }

    /// Make network fetches fail with [`QueryError::Network`]
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::Release);
    }

    /// Swap the live record set. The cache keeps its old results.
    pub fn replace_records(&self, records: Vec<T>) {
        *self.shared.records.write() = records;
    }

    pub fn clear_cache(&self) {
        self.shared.cache.lock().clear();
    }

    /// Number of network fetches served so far
    pub fn network_fetches(&self) -> u64 {
        self.shared.network_fetches.load(Ordering::Relaxed)
    }
}

impl<T: Clone> Shared<T> {
    fn select(&self, query: &Query<ItemFilter<T>>) -> Vec<T> {
        let records = self.records.read();
        let matching = records
            .iter()
            .filter(|item| query.filter().matches(item))
            .skip(query.skip());
        match query.limit() {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        }
    }

    fn cached(&self, query: &Query<ItemFilter<T>>) -> Option<Vec<T>> {
        self.cache.lock().get(&cache_key(query)).cloned()
    }

    fn network(&self, query: &Query<ItemFilter<T>>, store: bool) -> FetchResult<T> {
        if self.offline.load(Ordering::Acquire) {
            return Err(QueryError::Network("executor is offline".to_string()));
        }
        self.network_fetches.fetch_add(1, Ordering::Relaxed);

        let results = self.select(query);
        if store {
            self.cache.lock().insert(cache_key(query), results.clone());
        }
        Ok(results)
    }

    /// Results in the order the completion must see them
    fn respond(&self, query: &Query<ItemFilter<T>>, local_datastore: bool) -> Vec<FetchResult<T>> {
        if local_datastore {
            return vec![Ok(self.select(query))];
        }

        match query.cache_policy() {
            CachePolicy::IgnoreCache => vec![self.network(query, false)],
            CachePolicy::NetworkOnly => vec![self.network(query, true)],
            CachePolicy::CacheOnly => vec![self.cached(query).ok_or(QueryError::CacheMiss)],
            CachePolicy::CacheElseNetwork => match self.cached(query) {
                Some(hit) => vec![Ok(hit)],
                None => vec![self.network(query, true)],
            },
            CachePolicy::NetworkElseCache => match self.network(query, true) {
                Ok(results) => vec![Ok(results)],
                Err(err) => vec![self.cached(query).ok_or(err)],
            },
            CachePolicy::CacheThenNetwork => vec![
                self.cached(query).ok_or(QueryError::CacheMiss),
                self.network(query, true),
            ],
        }
    }
}

fn cache_key<T>(query: &Query<ItemFilter<T>>) -> CacheKey {
    (Arc::clone(&query.filter().name), query.skip(), query.limit())
}

impl<T: Clone + Send + Sync + 'static> QueryExecutor for InMemoryExecutor<T> {
    type Item = T;
    type Filter = ItemFilter<T>;

    fn execute(
        &self,
        query: Query<ItemFilter<T>>,
        _token: CancellationToken,
        mut completion: Completion<T>,
    ) {
        let local_datastore = self.local_datastore;

        let Some(latency) = self.latency else {
            for result in self.shared.respond(&query, local_datastore) {
                completion(result);
            }
            return;
        };

        let shared = Arc::clone(&self.shared);
        thread::spawn(move || {
            // The cached phase of a cache-then-network fetch is served before the round trip
            let dual = !local_datastore && query.cache_policy() == CachePolicy::CacheThenNetwork;
            if dual {
                completion(shared.cached(&query).ok_or(QueryError::CacheMiss));
                thread::sleep(latency);
                completion(shared.network(&query, true));
            } else {
                thread::sleep(latency);
                for result in shared.respond(&query, local_datastore) {
                    completion(result);
                }
            }
        });
    }

    fn has_cached_result(&self, query: &Query<ItemFilter<T>>) -> bool {
        !self.local_datastore && self.shared.cache.lock().contains_key(&cache_key(query))
    }

    fn resolve_cache_policy(
        &self,
        query: &Query<ItemFilter<T>>,
    ) -> std::result::Result<CachePolicy, QueryError> {
        let policy = query.cache_policy();
        if self.local_datastore && policy != CachePolicy::IgnoreCache {
            return Err(QueryError::UnsupportedPolicy(policy));
        }
        Ok(policy)
    }
}

impl<T> std::fmt::Debug for InMemoryExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryExecutor")
            .field("record_count", &self.shared.records.read().len())
            .field("cached_queries", &self.shared.cache.lock().len())
            .field("latency", &self.latency)
            .field("local_datastore", &self.local_datastore)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(
        executor: &InMemoryExecutor<u32>,
        query: Query<ItemFilter<u32>>,
    ) -> Vec<FetchResult<u32>> {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        executor.execute(
            query,
            CancellationToken::none(),
            Box::new(move |result| sink.lock().push(result)),
        );
        let collected = results.lock().clone();
        collected
    }

    fn bounded(skip: usize, limit: usize, policy: CachePolicy) -> Query<ItemFilter<u32>> {
        let mut query = Query::new(ItemFilter::all()).with_cache_policy(policy);
        query.set_skip(skip);
        query.set_limit(Some(limit));
        query
    }

    #[test]
    fn test_network_fetch_applies_bounds() {
        let executor = InMemoryExecutor::new((0..50).collect());
        let results = collect(&executor, bounded(10, 5, CachePolicy::IgnoreCache));
        assert_eq!(results, vec![Ok(vec![10, 11, 12, 13, 14])]);
        assert_eq!(executor.network_fetches(), 1);
    }

    #[test]
    fn test_filter_selects_before_skip() {
        let executor = InMemoryExecutor::new((0..20).collect());
        let mut query = Query::new(ItemFilter::new("even", |n: &u32| n % 2 == 0));
        query.set_skip(2);
        query.set_limit(Some(3));
        assert_eq!(collect(&executor, query), vec![Ok(vec![4, 6, 8])]);
    }

    #[test]
    fn test_cache_only_miss() {
        let executor = InMemoryExecutor::new((0..5).collect());
        let results = collect(&executor, bounded(0, 3, CachePolicy::CacheOnly));
        assert_eq!(results, vec![Err(QueryError::CacheMiss)]);
    }

    #[test]
    fn test_network_only_populates_cache() {
        let executor = InMemoryExecutor::new((0..5).collect());
        let query = bounded(0, 3, CachePolicy::NetworkOnly);
        assert!(!executor.has_cached_result(&query));

        collect(&executor, query.clone());
        assert!(executor.has_cached_result(&query));

        // Ignoring the cache must not populate it
        let ignored = bounded(3, 3, CachePolicy::IgnoreCache);
        collect(&executor, ignored.clone());
        assert!(!executor.has_cached_result(&ignored));
    }

    #[test]
    fn test_cache_then_network_completes_twice() {
        let executor = InMemoryExecutor::new((0..5).collect());
        collect(&executor, bounded(0, 2, CachePolicy::NetworkOnly));
        executor.replace_records((100..105).collect());

        let results = collect(&executor, bounded(0, 2, CachePolicy::CacheThenNetwork));
        assert_eq!(results, vec![Ok(vec![0, 1]), Ok(vec![100, 101])]);
    }

    #[test]
    fn test_network_else_cache_falls_back_when_offline() {
        let executor = InMemoryExecutor::new((0..5).collect());
        collect(&executor, bounded(0, 2, CachePolicy::NetworkOnly));
        executor.set_offline(true);

        let results = collect(&executor, bounded(0, 2, CachePolicy::NetworkElseCache));
        assert_eq!(results, vec![Ok(vec![0, 1])]);

        let uncached = collect(&executor, bounded(2, 2, CachePolicy::NetworkElseCache));
        assert!(matches!(uncached.as_slice(), [Err(QueryError::Network(_))]));
    }

    #[test]
    fn test_local_datastore_rejects_cache_policies() {
        let executor = InMemoryExecutor::new((0..5).collect::<Vec<u32>>()).with_local_datastore();
        let query = bounded(0, 2, CachePolicy::CacheThenNetwork);
        assert_eq!(
            executor.resolve_cache_policy(&query),
            Err(QueryError::UnsupportedPolicy(CachePolicy::CacheThenNetwork))
        );
        assert_eq!(collect(&executor, query), vec![Ok(vec![0, 1])]);
    }
}
