//! Stress/fuzz driver for `shardmalloc`.
//!
//! Talks to the allocator only through its public `allocate`/`release`
//! pair, the way `easy-fs-fuse` only ever talks to `easy-fs` through its
//! public filesystem API. Useful for manual soak-testing outside of
//! `cargo test`, and as the thing `benches/allocate_release.rs` times.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;

use shardmalloc::{allocate, release};

#[derive(Parser)]
#[command(name = "shardmalloc-harness")]
#[command(about = "Stress-test driver for the shardmalloc allocator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Single-threaded random allocate/release fuzzing.
    Stress {
        /// Number of allocate/release operations to perform.
        #[arg(short, long, default_value_t = 100_000)]
        iterations: usize,
        /// Largest requested allocation size, in bytes.
        #[arg(short, long, default_value_t = 8192)]
        max_size: usize,
        /// RNG seed, for reproducible runs.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },
    /// Multi-threaded random allocate/release fuzzing.
    Concurrent {
        /// Number of worker threads.
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
        /// Operations performed per thread.
        #[arg(short, long, default_value_t = 20_000)]
        iterations: usize,
        /// Largest requested allocation size, in bytes.
        #[arg(short, long, default_value_t = 8192)]
        max_size: usize,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Stress {
            iterations,
            max_size,
            seed,
        } => run_stress(iterations, max_size, seed),
        Command::Concurrent {
            threads,
            iterations,
            max_size,
        } => run_concurrent(threads, iterations, max_size),
    }
}

/// Keeps a live set of allocations and randomly interleaves new
/// allocations against releases of previously-held pointers, verifying
/// that every live allocation still holds the byte pattern it was
/// stamped with.
fn run_stress(iterations: usize, max_size: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();

    for i in 0..iterations {
        let release_existing = !live.is_empty() && rng.gen_bool(0.5);
        if release_existing {
            let idx = rng.gen_range(0..live.len());
            let (p, size, pattern) = live.swap_remove(idx);
            verify_pattern(p, size, pattern);
            release(p);
        } else {
            let size = rng.gen_range(1..=max_size);
            let pattern = rng.gen::<u8>();
            let p = allocate(size);
            assert!(!p.is_null(), "allocation of {size} bytes failed at iteration {i}");
            unsafe {
                std::ptr::write_bytes(p, pattern, size);
            }
            live.push((p, size, pattern));
        }
    }

    for (p, size, pattern) in live {
        verify_pattern(p, size, pattern);
        release(p);
    }

    println!("stress: {iterations} operations completed cleanly");
}

fn run_concurrent(threads: usize, iterations: usize, max_size: usize) {
    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            thread::spawn(move || {
                run_stress(iterations, max_size, worker as u64);
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker thread panicked");
    }
    println!("concurrent: {threads} threads x {iterations} operations completed cleanly");
}

fn verify_pattern(p: *mut u8, size: usize, pattern: u8) {
    unsafe {
        for i in 0..size {
            assert_eq!(p.add(i).read(), pattern, "byte {i} corrupted");
        }
    }
}
