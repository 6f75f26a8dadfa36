use crossbeam_channel::Sender;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::executor::{CancellationToken, QueryExecutor};
use crate::observer::{ObserverSet, PagerObserver};
use crate::page::load::{CompletionState, LoadHandle, LoadId, LoadOutcome};
use crate::page::merge::PageState;
use crate::profiling::{PagerStats, Profiler};
use crate::types::{CachePolicy, PagerConfig, Query, QueryError, Result};

/// Mutable pager state, guarded by a single lock
struct Shared<E: QueryExecutor> {
    pages: PageState<E::Item>,
    observers: ObserverSet<E>,

    /// The load `is_loading_next_page` reports on
    in_flight: Option<LoadId>,
}

struct Inner<E: QueryExecutor> {
    executor: E,

    /// Private copy of the caller's query
    query: Query<E::Filter>,

    config: PagerConfig,

    /// Re-entrant so observers may read the pager from inside a callback
    state: ReentrantMutex<RefCell<Shared<E>>>,

    next_load_id: AtomicU64,

    profiler: Profiler,
}

/// Loads the results of a query page by page.
///
/// Each fetch asks for one item more than the page size; receiving it means
/// another page exists. Merged pages are kept in a single ordered collection
/// and every merge is announced to the registered observers as an inserted
/// or changed range.
///
/// `Pager` is a cheap handle: clones share the same state.
pub struct Pager<E: QueryExecutor> {
    inner: Arc<Inner<E>>,
}

impl<E: QueryExecutor> Clone for Pager<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: QueryExecutor> Pager<E> {
    /// Create a pager over `query`, which is copied and never changed afterwards
    pub fn new(executor: E, query: Query<E::Filter>, config: PagerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                executor,
                query,
                config,
                state: ReentrantMutex::new(RefCell::new(Shared {
                    pages: PageState::new(),
                    observers: ObserverSet::new(),
                    in_flight: None,
                })),
                next_load_id: AtomicU64::new(0),
                profiler: Profiler::new(),
            }),
        })
    }

    /// Create a pager with the default configuration
    pub fn with_defaults(executor: E, query: Query<E::Filter>) -> Result<Self> {
        Self::new(executor, query, PagerConfig::default())
    }

    fn read<R>(&self, f: impl FnOnce(&Shared<E>) -> R) -> R {
        let guard = self.inner.state.lock();
        let shared = guard.borrow();
        f(&shared)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Shared<E>) -> R) -> R {
        let guard = self.inner.state.lock();
        let mut shared = guard.borrow_mut();
        f(&mut shared)
    }

    pub fn query(&self) -> &Query<E::Filter> {
        &self.inner.query
    }

    pub fn page_size(&self) -> usize {
        self.inner.config.page_size
    }

    pub fn config(&self) -> &PagerConfig {
        &self.inner.config
    }

    pub fn executor(&self) -> &E {
        &self.inner.executor
    }

    /// Zero-based index of the last merged page, `None` before the first page
    pub fn current_page(&self) -> Option<usize> {
        self.read(|shared| shared.pages.current_page())
    }

    pub fn has_next_page(&self) -> bool {
        self.read(|shared| shared.pages.has_next_page())
    }

    /// Whether the most recently started load has yet to resolve
    pub fn is_loading_next_page(&self) -> bool {
        self.read(|shared| shared.in_flight.is_some())
    }

    /// Snapshot of the loaded objects
    pub fn objects(&self) -> Vec<E::Item> {
        self.read(|shared| shared.pages.objects().to_vec())
    }

    /// Borrow the loaded objects without copying.
    ///
    /// Merges from other threads wait until `f` returns. Read accessors may be
    /// called from `f`, but nothing that mutates the pager: registering or
    /// removing an observer, or starting a load, panics with the collection
    /// already borrowed. Use [`Pager::objects`] to take a copy instead.
    pub fn with_objects<R>(&self, f: impl FnOnce(&[E::Item]) -> R) -> R {
        self.read(|shared| f(shared.pages.objects()))
    }

    pub fn object_count(&self) -> usize {
        self.read(|shared| shared.pages.objects().len())
    }

    pub fn get(&self, index: usize) -> Option<E::Item> {
        self.read(|shared| shared.pages.objects().get(index).cloned())
    }

    /// Register an observer. Returns `false` if it was already registered.
    pub fn add_observer(&self, observer: Arc<dyn PagerObserver<E>>) -> bool {
        self.write(|shared| shared.observers.insert(observer))
    }

    /// Unregister an observer. Returns `false` if it was not registered.
    pub fn remove_observer(&self, observer: &Arc<dyn PagerObserver<E>>) -> bool {
        self.write(|shared| shared.observers.remove(observer))
    }

    pub fn observer_count(&self) -> usize {
        self.read(|shared| shared.observers.len())
    }

    pub fn stats(&self) -> PagerStats {
        self.inner.profiler.stats()
    }

    /// Query for `page`: skips the preceding pages and asks for one extra
    /// item so a following page can be detected.
    pub fn create_query(&self, page: usize) -> Query<E::Filter> {
        let page_size = self.page_size();
        let mut query = self.inner.query.clone();
        query.set_skip(page_size * page);
        query.set_limit(Some(page_size + 1));
        query
    }

    /// Load the page after the current one.
    ///
    /// `callback` receives every raw completion's outcome (twice under
    /// [`CachePolicy::CacheThenNetwork`]); the returned handle resolves once.
    ///
    /// # Panics
    ///
    /// Panics if [`Pager::has_next_page`] is `false`.
    pub fn load_next_page<C>(&self, callback: C, token: CancellationToken) -> LoadHandle<E::Item>
    where
        C: FnMut(LoadOutcome<E::Item>) + Send + 'static,
    {
        let page = self.read(|shared| {
            assert!(
                shared.pages.has_next_page(),
                "unable to load next page when there are no more pages available"
            );
            shared.pages.next_page()
        });
        self.start_load(page, callback, token)
    }

    /// Fetch an already loaded page again and replace its items.
    ///
    /// If an earlier page comes back with fewer than a page of items, every
    /// page after it is dropped and announced as a removed range.
    ///
    /// # Panics
    ///
    /// Panics if `page` has not been loaded yet.
    pub fn reload_page<C>(
        &self,
        page: usize,
        callback: C,
        token: CancellationToken,
    ) -> LoadHandle<E::Item>
    where
        C: FnMut(LoadOutcome<E::Item>) + Send + 'static,
    {
        self.read(|shared| {
            assert!(
                shared.pages.is_loaded(page),
                "unable to reload page {page} before it has been loaded"
            );
        });
        self.start_load(page, callback, token)
    }

    fn start_load<C>(
        &self,
        page: usize,
        callback: C,
        token: CancellationToken,
    ) -> LoadHandle<E::Item>
    where
        C: FnMut(LoadOutcome<E::Item>) + Send + 'static,
    {
        let executor = &self.inner.executor;
        let mut query = self.create_query(page);

        let policy = query.cache_policy();
        if policy.consults_cache_first() && !executor.has_cached_result(&query) {
            debug!(page, ?policy, "no cached result, fetching from network only");
            query.set_cache_policy(CachePolicy::NetworkOnly);
            self.inner.profiler.record_cache_bypass();
        }

        let expected_completions = match executor.resolve_cache_policy(&query) {
            Ok(policy) => policy.expected_completions(),
            Err(err) => {
                debug!(page, %err, "cache policy unavailable, expecting a single completion");
                1
            }
        };

        let id = LoadId(self.inner.next_load_id.fetch_add(1, Ordering::Relaxed));
        let (sender, handle) = LoadHandle::channel(id, page);
        self.write(|shared| shared.in_flight = Some(id));
        self.inner.profiler.record_load_started();

        let mut pending = PendingLoad {
            pager: self.clone(),
            id,
            page,
            token: token.clone(),
            expected_completions,
            state: CompletionState::AwaitingFirst,
            sender,
            callback,
        };
        executor.execute(query, token, Box::new(move |result| pending.on_completion(result)));

        handle
    }

    /// Merge `results` for `page` and notify observers; returns the visible items
    fn on_page(&self, page: usize, results: Vec<E::Item>) -> Vec<E::Item> {
        let guard = self.inner.state.lock();
        let (merge, items, observers) = {
            let mut shared = guard.borrow_mut();
            let merge = shared.pages.apply_page(page, results, self.page_size());
            let items = shared.pages.objects()[merge.start..merge.start + merge.visible].to_vec();
            let observers = shared.observers.snapshot();
            (merge, items, observers)
        };
        self.inner.profiler.record_merge(merge.replaced, merge.visible);

        for observer in &observers {
            merge.change.dispatch(observer.as_ref(), self);
            if let Some(truncated) = &merge.truncated {
                truncated.dispatch(observer.as_ref(), self);
            }
        }
        drop(guard);

        items
    }

    /// Clear the in-flight slot if it still belongs to `id`
    fn finish_load(&self, id: LoadId) {
        self.write(|shared| {
            if shared.in_flight == Some(id) {
                shared.in_flight = None;
            }
        });
    }
}

impl<E: QueryExecutor> std::fmt::Debug for Pager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.read(|shared| {
            f.debug_struct("Pager")
                .field("page_size", &self.inner.config.page_size)
                .field("current_page", &shared.pages.current_page())
                .field("has_next_page", &shared.pages.has_next_page())
                .field("object_count", &shared.pages.objects().len())
                .field("in_flight", &shared.in_flight)
                .field("observer_count", &shared.observers.len())
                .finish()
        })
    }
}

/// Bookkeeping of one load, owned by the executor's completion
struct PendingLoad<E: QueryExecutor, C> {
    pager: Pager<E>,
    id: LoadId,
    page: usize,
    token: CancellationToken,
    expected_completions: u8,
    state: CompletionState,
    sender: Sender<LoadOutcome<E::Item>>,
    callback: C,
}

impl<E, C> PendingLoad<E, C>
where
    E: QueryExecutor,
    C: FnMut(LoadOutcome<E::Item>),
{
    fn on_completion(&mut self, result: std::result::Result<Vec<E::Item>, QueryError>) {
        let profiler = &self.pager.inner.profiler;

        let Some(next) = self.state.advance(self.expected_completions) else {
            warn!(page = self.page, load = self.id.0, "ignoring completion of a resolved load");
            profiler.record_stale_completion();
            return;
        };

        let outcome = if self.token.is_cancelled() {
            debug!(page = self.page, "load was cancelled, discarding results");
            profiler.record_cancelled();
            LoadOutcome::Cancelled
        } else {
            match result {
                Ok(results) => LoadOutcome::Loaded(self.pager.on_page(self.page, results)),
                Err(err) => {
                    debug!(page = self.page, %err, "page load failed");
                    profiler.record_failed();
                    LoadOutcome::Failed(err)
                }
            }
        };
        // Only after the merge, so a panicking observer still leaves the load to `Drop`
        self.state = next;

        if next == CompletionState::Resolved {
            self.pager.finish_load(self.id);
            // The handle may already be dropped
            let _ = self.sender.send(outcome.clone());
        }

        (self.callback)(outcome);
    }
}

impl<E: QueryExecutor, C> Drop for PendingLoad<E, C> {
    fn drop(&mut self) {
        if self.state == CompletionState::Resolved {
            return;
        }
        warn!(page = self.page, load = self.id.0, "executor dropped an unresolved load");
        self.pager.inner.profiler.record_abandoned();
        self.pager.finish_load(self.id);
        let _ = self.sender.send(LoadOutcome::Failed(QueryError::Abandoned));
    }
}
