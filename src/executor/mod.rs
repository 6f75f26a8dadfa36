use crate::types::{CachePolicy, Query, QueryError};

/// Completion of a single fetch.
///
/// Invoked once, or twice for [`CachePolicy::CacheThenNetwork`] (cached
/// result first, network result second). May be called from any thread.
pub type Completion<T> = Box<dyn FnMut(std::result::Result<Vec<T>, QueryError>) + Send>;

/// Trait for the query/transport layer the pager drives
pub trait QueryExecutor: Send + Sync + 'static {
    /// Item type produced by a fetch
    type Item: Clone + Send + Sync + 'static;

    /// Executor-defined filter carried by [`Query`]
    type Filter: Clone + Send + Sync + 'static;

    /// Run `query` asynchronously relative to the caller.
    ///
    /// The cache policy to honour travels in the query. The token is handed
    /// over for executors that can abort early; the pager checks it itself
    /// when the completion fires.
    fn execute(
        &self,
        query: Query<Self::Filter>,
        token: CancellationToken,
        completion: Completion<Self::Item>,
    );

    /// Whether a cached result exists for exactly this query
    fn has_cached_result(&self, query: &Query<Self::Filter>) -> bool;

    /// The cache policy the executor will actually apply to `query`.
    ///
    /// Executors that cannot honour some policies in their current mode
    /// report [`QueryError::UnsupportedPolicy`].
    fn resolve_cache_policy(
        &self,
        query: &Query<Self::Filter>,
    ) -> std::result::Result<CachePolicy, QueryError> {
        Ok(query.cache_policy())
    }
}

pub mod cancellation;
pub mod in_memory;

#[cfg(test)]
pub(crate) mod scripted;

pub use cancellation::CancellationToken;
pub use in_memory::{InMemoryExecutor, ItemFilter};
