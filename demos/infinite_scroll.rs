//! Example simulating an infinite-scroll list backed by a slow data source
//!
//! A display layer registers as an observer, loads pages whenever the user
//! scrolls near the end, and cancels an in-flight load when the screen closes:
//! 1. Pages are fetched on a worker thread with simulated latency
//! 2. Each merge is reported as an inserted range
//! 3. The last load is cancelled and leaves the pager untouched

use query_pager::{
    CachePolicy, CancellationToken, InMemoryExecutor, ItemFilter, LoadOutcome, Pager,
    PagerConfig, PagerObserver, Query,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type Feed = InMemoryExecutor<String>;

struct ListView;

impl PagerObserver<Feed> for ListView {
    fn on_item_range_changed(&self, _pager: &Pager<Feed>, start: usize, count: usize) {
        println!("[View] Rebinding rows {}..{}", start, start + count);
    }

    fn on_item_range_inserted(&self, pager: &Pager<Feed>, start: usize, count: usize) {
        println!(
            "[View] Inserted rows {}..{} (now showing {}, more: {})",
            start,
            start + count,
            pager.object_count(),
            pager.has_next_page()
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Infinite Scroll Example ===\n");

    let posts: Vec<String> = (0..57).map(|i| format!("Post #{i}")).collect();
    let executor = InMemoryExecutor::new(posts).with_latency(Duration::from_millis(50));
    let query = Query::new(ItemFilter::all()).with_cache_policy(CachePolicy::CacheElseNetwork);
    let pager = Pager::new(executor, query, PagerConfig::with_page_size(20))?;
    pager.add_observer(Arc::new(ListView));

    // The user scrolls to the bottom twice
    for _ in 0..2 {
        let handle = pager.load_next_page(
            |outcome| {
                if let Some(error) = outcome.error() {
                    println!("[Loader] Page failed: {error}");
                }
            },
            CancellationToken::none(),
        );
        println!("[Loader] Requested page {}", handle.page());
        handle.wait();
    }

    // The screen closes while the last page is loading
    let token = CancellationToken::new();
    let handle = pager.load_next_page(|_| {}, token.clone());
    token.cancel();
    match handle.wait() {
        LoadOutcome::Cancelled => println!("[Loader] Last load cancelled"),
        other => println!("[Loader] Unexpected outcome: {other:?}"),
    }

    let stats = pager.stats();
    println!("\n=== Pager Statistics ===");
    println!("Current page: {:?}", pager.current_page());
    println!("Visible objects: {}", pager.object_count());
    println!("Loads started: {}", stats.loads_started);
    println!("Cache bypasses: {}", stats.cache_bypasses);
    println!("Cancelled: {}", stats.loads_cancelled);

    Ok(())
}
