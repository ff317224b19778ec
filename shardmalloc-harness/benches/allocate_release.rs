//! Micro-benchmarks for the allocate/release hot path, across size
//! classes that exercise both bit-scan mechanisms (`SPEC_FULL.md` §4.2).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shardmalloc::{allocate, release};

fn bench_allocate_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_release");
    for &size in &[16usize, 64, 256, 1024, 8192] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let p = allocate(size);
                black_box(p);
                release(p);
            });
        });
    }
    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    c.bench_function("allocate_release_single_thread_burst", |b| {
        b.iter(|| {
            let mut ptrs = Vec::with_capacity(64);
            for _ in 0..64 {
                ptrs.push(allocate(128));
            }
            for p in ptrs {
                release(black_box(p));
            }
        });
    });
}

criterion_group!(benches, bench_allocate_release, bench_contended);
criterion_main!(benches);
