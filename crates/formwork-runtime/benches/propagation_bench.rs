//! Benchmarks for change propagation through value holders.
//!
//! Run with: `cargo bench --package formwork-runtime --bench propagation_bench`
//!
//! Covers:
//! - Fan-out from one observable to many subscribers
//! - Propagation down a chain of derived values
//! - Buffered set/commit cycles

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use formwork_runtime::reactive::{Buffered, Buffering, Derived, Observable, ValueModelRef};

// ============================================================================
// Fan-out
// ============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for subscribers in [1usize, 16, 256] {
        let source = Observable::new(0i64);
        let subs: Vec<_> = (0..subscribers)
            .map(|_| source.subscribe(|v| {
                black_box(*v);
            }))
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                let mut n = 0i64;
                b.iter(|| {
                    n += 1;
                    source.set(black_box(n));
                });
            },
        );
        drop(subs);
    }
    group.finish();
}

// ============================================================================
// Derived chains
// ============================================================================

fn build_chain(source: &Observable<i64>, depth: usize) -> Vec<Derived<i64>> {
    let mut chain: Vec<Derived<i64>> = Vec::with_capacity(depth);
    let mut upstream: ValueModelRef<i64> = Rc::new(source.clone());
    for i in 0..depth {
        let Ok(d) = Derived::new(format!("link{i}"), vec![upstream], |v| Ok(v[0] + 1)) else {
            break;
        };
        upstream = Rc::new(d.clone());
        chain.push(d);
    }
    chain
}

fn bench_derived_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_chain");
    for depth in [1usize, 8, 64] {
        let source = Observable::new(0i64);
        let chain = build_chain(&source, depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                source.set(n);
                black_box(chain.last().map(Derived::get));
            });
        });
    }
    group.finish();
}

// ============================================================================
// Buffering
// ============================================================================

fn bench_buffered_commit(c: &mut Criterion) {
    let source = Observable::new(0i64);
    let buffered = Buffered::new(Rc::new(source.clone()));
    c.bench_function("buffered_set_commit", |b| {
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            let _ = buffered.set(n);
            let _ = buffered.commit();
        });
    });
}

criterion_group!(
    benches,
    bench_fan_out,
    bench_derived_chain,
    bench_buffered_commit,
);

criterion_main!(benches);
