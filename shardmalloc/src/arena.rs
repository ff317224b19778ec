//! One allocation shard (`spec.md` §2 layer 3, §3 "Arena", §4.3-§4.6).
//!
//! An arena owns a list of heap segments, each with its own occupancy
//! bitmap. `spec.md` §4.6's data-moving heap extension is replaced here by
//! non-moving segment chaining, per the REDESIGN recorded in
//! `SPEC_FULL.md` §4 and §9: growth appends a new segment instead of
//! copying the old heap into a bigger one, so a pointer returned by
//! `allocate` never dangles because of a later extension.

use std::mem::size_of;
use std::ptr::NonNull;

use parking_lot::Mutex;

use crate::bitmap::{Bitmap, ScanMechanism};
use crate::config::INITIAL_HEAP_SIZE;
use crate::error::AllocFailure;
use crate::os_mem;
use crate::trace;

/// The word size used for the in-band size prefix (`spec.md` §6's
/// "on-wire format for allocation metadata").
const PREFIX_SIZE: usize = size_of::<usize>();

/// Computes the number of blocks a live allocation of `payload` user bytes
/// occupies, including its size prefix. `spec.md` §9 requires that
/// `allocate` and `release` agree on this formula bit-for-bit; routing both
/// call sites through this one function is how that's enforced.
#[inline]
fn blocks_for_payload(payload: usize, block_size: usize) -> usize {
    (payload + PREFIX_SIZE).div_ceil(block_size)
}

/// One contiguous mapped heap extent plus the bitmap that tracks it.
struct Segment {
    heap: NonNull<u8>,
    heap_size: usize,
    bitmap: Bitmap,
}

// SAFETY: `Segment` is only ever touched while the owning `Arena`'s lock is
// held; the raw pointer inside never aliases a `&mut` held elsewhere.
unsafe impl Send for Segment {}

impl Segment {
    fn new(byte_len: usize, block_size: usize) -> Result<Self, AllocFailure> {
        let heap = os_mem::map_anonymous(byte_len)?;
        let bitmap = Bitmap::new(byte_len / block_size);
        Ok(Self {
            heap,
            heap_size: byte_len,
            bitmap,
        })
    }

    fn contains(&self, ptr: *mut u8) -> bool {
        let base = self.heap.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= base && addr < base + self.heap_size
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        // SAFETY: `heap`/`heap_size` were produced together by
        // `os_mem::map_anonymous` and never mutated afterwards.
        unsafe { os_mem::unmap(self.heap, self.heap_size) };
    }
}

struct ArenaInner {
    segments: Vec<Segment>,
    allocated_blocks: usize,
}

/// One shard of the allocator: a mutex-guarded list of heap segments.
///
/// `spec.md` §5 promotes this lock to cover the hot path (find-free,
/// set/clear bits, extension) so that arenas do not serialize against each
/// other.
pub(crate) struct Arena {
    inner: Mutex<ArenaInner>,
    block_size: usize,
}

impl Arena {
    /// Creates a new arena with a single initial segment.
    pub(crate) fn new(block_size: usize) -> Result<Self, AllocFailure> {
        let first = Segment::new(INITIAL_HEAP_SIZE, block_size)?;
        Ok(Self {
            inner: Mutex::new(ArenaInner {
                segments: vec![first],
                allocated_blocks: 0,
            }),
            block_size,
        })
    }

    /// Services one `allocate(n)` request against this arena (`spec.md`
    /// §4.3 steps 4-7, under the arena lock).
    pub(crate) fn allocate(&self, n: usize, arena_index: usize) -> Result<NonNull<u8>, AllocFailure> {
        let mechanism = ScanMechanism::for_request_size(n);
        let blocks = blocks_for_payload(n, self.block_size);

        let mut inner = self.inner.lock();

        if let Some(ptr) = Self::try_allocate_locked(&mut inner, blocks, mechanism, self.block_size, n) {
            return Ok(ptr);
        }

        // No run of free blocks anywhere: extend, then retry once.
        let current_total: usize = inner.segments.iter().map(|s| s.heap_size).sum();
        let extension = (blocks * self.block_size).max(current_total / 4);
        let extension = os_mem::round_up_to_page(extension);

        let new_segment =
            Segment::new(extension, self.block_size).map_err(|_| AllocFailure::ExtensionFailure)?;
        inner.segments.push(new_segment);
        trace::heap_extended(arena_index, inner.segments.len() - 1, extension);

        Self::try_allocate_locked(&mut inner, blocks, mechanism, self.block_size, n)
            .ok_or(AllocFailure::OutOfSpace)
    }

    /// One pass of find-free + commit, without growing the arena. Shared by
    /// the pre-extension attempt and the post-extension retry.
    fn try_allocate_locked(
        inner: &mut ArenaInner,
        blocks: usize,
        mechanism: ScanMechanism,
        block_size: usize,
        n: usize,
    ) -> Option<NonNull<u8>> {
        for segment in inner.segments.iter_mut() {
            if let Some(start) = segment.bitmap.find_free(blocks, mechanism) {
                segment.bitmap.set_range(start, blocks);
                inner.allocated_blocks += blocks;

                // SAFETY: `start * block_size` lies within the segment by
                // construction of `find_free`'s bound check.
                let raw = unsafe { segment.heap.as_ptr().add(start * block_size) };
                // `spec.md` §4.3 step 7: align up even though it is already
                // aligned, preserving the reference's (redundant) behavior.
                let aligned = align_up(raw as usize, PREFIX_SIZE) as *mut u8;
                // SAFETY: `aligned` is within the block run we just
                // claimed, which is at least `blocks * block_size >=
                // n + PREFIX_SIZE` bytes, so writing one `usize` and
                // returning a pointer `PREFIX_SIZE` bytes further is valid.
                unsafe {
                    aligned.cast::<usize>().write(n);
                    let user_ptr = aligned.add(PREFIX_SIZE);
                    return Some(NonNull::new_unchecked(user_ptr));
                }
            }
        }
        None
    }

    /// Returns true if `ptr` falls within one of this arena's segments.
    pub(crate) fn owns(&self, ptr: *mut u8) -> bool {
        let inner = self.inner.lock();
        inner.segments.iter().any(|s| s.contains(ptr))
    }

    /// Services one `release(p)` request against this arena (`spec.md`
    /// §4.4 steps 3-7), assuming the caller has already established that
    /// `ptr` lies within one of this arena's segments.
    ///
    /// Returns `Ok(())` on a normal or a silently-ignored corrupt release;
    /// returns `Err` only to report what happened for tracing purposes.
    pub(crate) fn release(&self, ptr: *mut u8) -> Result<usize, AllocFailure> {
        let mut inner = self.inner.lock();

        let raw = (ptr as usize).wrapping_sub(PREFIX_SIZE) as *mut u8;

        let segment_index = inner
            .segments
            .iter()
            .position(|s| s.contains(raw))
            .ok_or(AllocFailure::ForeignPointer)?;

        // SAFETY: `raw` was checked to lie within `segment`'s mapped
        // region, and every live allocation's prefix word was written by
        // `try_allocate_locked` above.
        let stored_n = unsafe { raw.cast::<usize>().read() };
        let blocks = blocks_for_payload(stored_n, self.block_size);

        let segment = &mut inner.segments[segment_index];
        let block_index = (raw as usize - segment.heap.as_ptr() as usize) / self.block_size;

        if block_index + blocks > segment.bitmap.len() {
            return Err(AllocFailure::CorruptSize);
        }

        segment.bitmap.clear_range(block_index, blocks);
        inner.allocated_blocks = inner.allocated_blocks.saturating_sub(blocks);
        Ok(blocks)
    }
}

/// Rounds `addr` up to the next multiple of `align` (`align` a power of two).
#[inline]
fn align_up(addr: usize, align: usize) -> usize {
    (addr + align - 1) & !(align - 1)
}
