//! Multi-threaded testable properties from `spec.md` §8: P5 and P8, plus
//! scenario S6.

use std::collections::HashSet;
use std::thread;

use shardmalloc::{allocate, release};

fn init_logging() {
    let _ = env_logger::try_init();
}

/// P5: after releasing `p`, a same-size allocation succeeds again. Run
/// from several threads concurrently so the property holds under
/// contention on a shard, not just in isolation.
#[test]
fn p5_release_frees_space_for_reuse_under_contention() {
    init_logging();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                for _ in 0..200 {
                    let p = allocate(96);
                    assert!(!p.is_null());
                    release(p);
                    let p2 = allocate(96);
                    assert!(!p2.is_null(), "reallocation after release must succeed");
                    release(p2);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

/// P8: pointers from distinct threads land in at least two distinct
/// arenas' heap ranges, when more than one CPU is available. On a
/// single-CPU machine there is only one arena and the property is
/// vacuous, so the test only asserts when it can.
#[test]
fn p8_multiple_threads_use_distinct_arenas_when_possible() {
    init_logging();
    let cpu_count = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    if cpu_count < 2 {
        return;
    }

    let handles: Vec<_> = (0..cpu_count.min(8))
        .map(|_| {
            thread::spawn(|| {
                let p = allocate(64);
                assert!(!p.is_null());
                let addr = p as usize;
                release(p);
                addr
            })
        })
        .collect();

    let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Arenas are page-granularity mappings; coarse masking is enough to
    // distinguish "which heap region" without knowing exact segment sizes.
    const COARSE_MASK: usize = !0xFFFF;
    let buckets: HashSet<usize> = addrs.iter().map(|&a| a & COARSE_MASK).collect();

    // Freshly spawned threads get consecutive round-robin indices modulo
    // the arena count, so `cpu_count` freshly spawned threads (capped to
    // the arena count) must span at least two distinct arenas, each
    // backed by a distinct `mmap` region.
    assert!(
        buckets.len() >= 2,
        "expected allocations from {} threads to land in at least two distinct heap regions, got {}",
        addrs.len(),
        buckets.len()
    );
}

/// S6: four threads doing 1000 allocate/release pairs each, concurrently,
/// all succeed without crashing.
#[test]
fn s6_concurrent_allocate_release_pairs_all_succeed() {
    init_logging();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                for _ in 0..1000 {
                    let p = allocate(100);
                    assert!(!p.is_null());
                    unsafe {
                        std::ptr::write_bytes(p, 0x42, 100);
                    }
                    release(p);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
