//! Compile-time tunables for the allocator engine.
//!
//! Every constant here has a direct counterpart in the C reference this
//! crate's behavior is grounded on; see `DESIGN.md` for provenance.

/// Size, in bytes, of the atomic accounting unit. Must be a power of two
/// and at least `size_of::<usize>()`, since every allocation's size prefix
/// (a `usize`) is written at a block-aligned offset.
pub const BLOCK_SIZE: usize = 16;

/// Requests at or below this size use the bit-walk scan mechanism (see
/// [`crate::bitmap::ScanMechanism`]) rather than count-trailing-zeros.
pub const SMALL_ALLOCATION_THRESHOLD: usize = 4 * BLOCK_SIZE;

/// Requests at or above this size also use the bit-walk scan mechanism.
/// Between the two thresholds, count-trailing-zeros is used instead.
pub const LARGE_ALLOCATION_THRESHOLD: usize = 256 * BLOCK_SIZE;

/// Size of a fresh arena's first heap segment.
pub const INITIAL_HEAP_SIZE: usize = 1024 * 1024;

const _: () = assert!(BLOCK_SIZE.is_power_of_two());
const _: () = assert!(BLOCK_SIZE >= core::mem::size_of::<usize>());
