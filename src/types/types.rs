use thiserror::Error;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// How a query consults the result cache and the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CachePolicy {
    /// Always hit the network, never read or write the cache
    #[default]
    IgnoreCache,

    /// Only read the cache; a miss is a [`QueryError::CacheMiss`]
    CacheOnly,

    /// Only hit the network, storing the result in the cache
    NetworkOnly,

    /// Read the cache, falling back to the network on a miss
    CacheElseNetwork,

    /// Hit the network, falling back to the cache on failure
    NetworkElseCache,

    /// Yield the cached result first, then the network result.
    /// Completion is invoked twice.
    CacheThenNetwork,
}

impl CachePolicy {
    /// Whether a cache lookup is attempted before the network
    ///
    /// A load under such a policy is downgraded to [`CachePolicy::NetworkOnly`]
    /// when the executor reports no cached result for the query.
    #[inline]
    pub fn consults_cache_first(self) -> bool {
        matches!(self, CachePolicy::CacheThenNetwork | CachePolicy::CacheElseNetwork)
    }

    /// Number of times an executor invokes the completion of a single fetch
    #[inline]
    pub fn expected_completions(self) -> u8 {
        match self {
            CachePolicy::CacheThenNetwork => 2,
            _ => 1,
        }
    }
}

/// A query against the remote data source.
///
/// `F` is the executor-defined filter (constraints, ordering, ...). The pager
/// only ever touches the bounds and the cache policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<F> {
    filter: F,
    skip: usize,
    limit: Option<usize>,
    cache_policy: CachePolicy,
}

impl<F> Query<F> {
    /// Create an unbounded query with the default cache policy
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            skip: 0,
            limit: None,
            cache_policy: CachePolicy::default(),
        }
    }

    /// Builder-style cache policy override
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Number of leading results to skip
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Maximum number of results, `None` for unbounded
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn set_skip(&mut self, skip: usize) {
        self.skip = skip;
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    pub fn set_cache_policy(&mut self, policy: CachePolicy) {
        self.cache_policy = policy;
    }
}

/// Configuration for a pager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerConfig {
    /// Number of visible items per page (default: 20)
    pub page_size: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PagerConfig {
    /// Create a configuration with the given page size
    pub fn with_page_size(page_size: usize) -> Self {
        Self { page_size }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(PagerError::InvalidPageSize);
        }
        Ok(())
    }
}

/// Errors reported by a query executor for a single fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("No cached result for query")]
    CacheMiss,

    #[error("Backend rejected query: {0}")]
    Backend(String),

    #[error("Cache policy {0:?} is not supported by this executor")]
    UnsupportedPolicy(CachePolicy),

    #[error("Executor dropped the load without completing it")]
    Abandoned,
}

/// Errors that can occur when building a pager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PagerError {
    #[error("Page size must be at least 1")]
    InvalidPageSize,
}

pub type Result<T> = std::result::Result<T, PagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_first_policies() {
        assert!(CachePolicy::CacheThenNetwork.consults_cache_first());
        assert!(CachePolicy::CacheElseNetwork.consults_cache_first());
        assert!(!CachePolicy::CacheOnly.consults_cache_first());
        assert!(!CachePolicy::NetworkElseCache.consults_cache_first());
    }

    #[test]
    fn test_only_cache_then_network_completes_twice() {
        assert_eq!(CachePolicy::CacheThenNetwork.expected_completions(), 2);
        for policy in [
            CachePolicy::IgnoreCache,
            CachePolicy::CacheOnly,
            CachePolicy::NetworkOnly,
            CachePolicy::CacheElseNetwork,
            CachePolicy::NetworkElseCache,
        ] {
            assert_eq!(policy.expected_completions(), 1, "{policy:?}");
        }
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert_eq!(
            PagerConfig::with_page_size(0).validate(),
            Err(PagerError::InvalidPageSize)
        );
        assert!(PagerConfig::default().validate().is_ok());
    }
}
