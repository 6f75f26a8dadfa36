use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use query_pager::{CancellationToken, InMemoryExecutor, ItemFilter, Pager, PagerConfig, Query};

fn load_all(records: u32, page_size: usize) -> usize {
    let executor = InMemoryExecutor::new((0..records).collect());
    let pager = Pager::new(
        executor,
        Query::new(ItemFilter::all()),
        PagerConfig::with_page_size(page_size),
    )
    .expect("valid config");

    while pager.has_next_page() {
        pager
            .load_next_page(|_| {}, CancellationToken::none())
            .wait();
    }
    pager.object_count()
}

fn bench_sequential_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_load");
    for page_size in [10usize, 50, 200] {
        group.bench_with_input(
            BenchmarkId::from_parameter(page_size),
            &page_size,
            |b, &page_size| b.iter(|| load_all(black_box(10_000), page_size)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_sequential_load);
criterion_main!(benches);
