//! A per-CPU sharded, bitmap-based block allocator over memory mapped
//! directly from the operating system.
//!
//! The public surface is deliberately small: [`allocate`] and [`release`],
//! plus a [`ShardAlloc`] adapter for installing this engine as the
//! process's [`GlobalAlloc`](std::alloc::GlobalAlloc). Everything else —
//! arena sharding, the bitmap search, heap growth, pointer-to-arena
//! lookup — is an implementation detail reachable only through those two
//! operations, matching the "drop-in replacement" framing this crate is
//! built to.
//!
//! # Layering
//! - [`os_mem`] — anonymous memory mapping/unmapping.
//! - [`bitmap`] — per-segment occupancy tracking.
//! - [`arena`] — one allocation shard: segments, bitmap, lock.
//! - [`table`] — the process-wide arena table and thread binding.
//! - [`api`] — `allocate`/`release` and the `GlobalAlloc` adapter.
//!
//! Compilation/packaging, benchmarking, and debug-trace consumption are
//! explicitly out of the core (they only ever call `allocate`/`release`);
//! see the `shardmalloc-harness` crate for the former two.

mod api;
mod arena;
mod bitmap;
pub mod config;
pub mod error;
mod os_mem;
mod table;
mod trace;

pub use api::{allocate, release, ShardAlloc};

#[cfg(feature = "extern-c")]
pub use api::extern_c;
