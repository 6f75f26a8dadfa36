//! # Query Pager
//!
//! Client-side pagination over a remote queryable data source.
//!
//! ## Features
//!
//! - **Sentinel Fetch**: One extra item per page detects further pages without a count query
//! - **Stable Collection**: Pages merge into one ordered collection at fixed offsets
//! - **Range Notifications**: Observers learn exactly which range was inserted or replaced
//! - **Cache Negotiation**: Cache-first policies skip the cache when it is known to miss
//! - **Cooperative Cancellation**: Cancelled loads never touch pager state
//!
//! ## Example
//!
//! ```rust
//! use query_pager::{
//!     CancellationToken, InMemoryExecutor, ItemFilter, LoadOutcome, Pager, PagerConfig, Query,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = InMemoryExecutor::new((0..45u32).collect());
//! let query = Query::new(ItemFilter::all());
//! let pager = Pager::new(executor, query, PagerConfig::with_page_size(20))?;
//!
//! // Page through the whole result set
//! while pager.has_next_page() {
//!     let handle = pager.load_next_page(|_| {}, CancellationToken::none());
//!     assert!(matches!(handle.wait(), LoadOutcome::Loaded(_)));
//! }
//!
//! assert_eq!(pager.object_count(), 45);
//! assert_eq!(pager.current_page(), Some(2));
//! # Ok(())
//! # }
//! ```

pub mod executor;
pub mod observer;
pub mod page;
pub mod profiling;
pub mod types;

pub use executor::{CancellationToken, Completion, InMemoryExecutor, ItemFilter, QueryExecutor};
pub use observer::{PagerObserver, RangeChange};
pub use page::{LoadHandle, LoadId, LoadOutcome, Pager};
pub use profiling::PagerStats;
pub use types::{CachePolicy, PagerConfig, PagerError, Query, QueryError, Result};
