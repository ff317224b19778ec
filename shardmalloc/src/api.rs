//! Public API (`spec.md` §2 layer 5, §4.3, §4.4, §6).
//!
//! `allocate`/`release` select an arena, serialize against its lock, and
//! dispatch to the arena operations in [`crate::arena`]. Both are
//! infallible from the caller's point of view: every recoverable failure
//! (`spec.md` §7) collapses to a null pointer or a silent no-op.

use std::alloc::{GlobalAlloc, Layout};
use std::ptr;

use crate::error::AllocFailure;
use crate::table;
use crate::trace;

/// Allocates `size` bytes and returns a pointer to them, or null on
/// failure (`spec.md` §4.3).
///
/// `size == 0` always returns null without touching any arena state
/// (`spec.md` §7 `InvalidSize`).
pub fn allocate(size: usize) -> *mut u8 {
    trace::alloc_requested(size);

    if size == 0 {
        trace::alloc_failed(size, AllocFailure::InvalidSize);
        return ptr::null_mut();
    }

    match table::with_thread_arena(|arena, index| arena.allocate(size, index)) {
        Ok(Ok(ptr)) => {
            trace::alloc_succeeded(size, ptr.as_ptr());
            ptr.as_ptr()
        }
        Ok(Err(reason)) => {
            trace::alloc_failed(size, reason);
            ptr::null_mut()
        }
        Err(reason) => {
            trace::alloc_failed(size, reason);
            ptr::null_mut()
        }
    }
}

/// Releases a pointer previously returned by [`allocate`] (`spec.md`
/// §4.4).
///
/// `release(null)` is a no-op. Releasing a pointer that does not belong to
/// any arena, or whose stored size implies an out-of-range block run, is
/// also a silent no-op (`spec.md` §7 `ForeignPointer`/`CorruptSize`) —
/// the minimal defensive guard the spec requires, not a general hardening
/// guarantee against adversarial callers.
pub fn release(p: *mut u8) {
    if p.is_null() {
        return;
    }
    trace::release_requested(p);

    let outcome = table::with_owning_arena(p, |arena| arena.release(p));
    match outcome {
        Some(Ok(blocks)) => trace::release_completed(p, blocks),
        Some(Err(reason)) => trace::release_ignored(p, reason),
        None => trace::release_ignored(p, AllocFailure::ForeignPointer),
    }
}

/// A [`GlobalAlloc`] implementation over [`allocate`]/[`release`],
/// suitable for installation via `#[global_allocator]` — the literal
/// "drop-in replacement for the standard allocator" from `spec.md` §1.
///
/// # Limitations
/// The bitmap engine only guarantees `align_of::<usize>()` alignment
/// (`spec.md` §4.3's alignment guarantee); requests for a stricter
/// `Layout::align()` are rejected rather than silently under-aligned.
pub struct ShardAlloc;

unsafe impl GlobalAlloc for ShardAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > std::mem::align_of::<usize>() {
            return ptr::null_mut();
        }
        allocate(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        release(ptr);
    }
}

/// C ABI surface, for hosting a non-Rust process (`SPEC_FULL.md` §6).
#[cfg(feature = "extern-c")]
pub mod extern_c {
    use std::ffi::c_void;

    /// POSIX-shaped `malloc`. See [`super::allocate`].
    ///
    /// # Safety
    /// Caller must eventually pass the returned pointer to [`free`] exactly
    /// once, or not at all.
    #[no_mangle]
    pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
        super::allocate(size).cast()
    }

    /// POSIX-shaped `free`. See [`super::release`].
    ///
    /// # Safety
    /// `ptr` must be null or a pointer previously returned by [`malloc`]
    /// that has not already been freed.
    #[no_mangle]
    pub unsafe extern "C" fn free(ptr: *mut c_void) {
        super::release(ptr.cast());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_zero_returns_null() {
        assert!(allocate(0).is_null());
    }

    #[test]
    fn release_null_is_noop() {
        release(ptr::null_mut());
    }

    #[test]
    fn allocate_release_allocate_reuses_pointer() {
        let p1 = allocate(100);
        assert!(!p1.is_null());
        unsafe {
            ptr::write_bytes(p1, 0xAB, 100);
        }
        release(p1);
        let p2 = allocate(100);
        assert_eq!(p1, p2);
        release(p2);
    }

    #[test]
    fn distinct_allocations_do_not_overlap() {
        let sizes = [100usize, 200, 300];
        let ptrs: Vec<_> = sizes.iter().map(|&n| allocate(n)).collect();
        for p in &ptrs {
            assert!(!p.is_null());
        }
        for i in 0..ptrs.len() {
            for j in 0..ptrs.len() {
                if i == j {
                    continue;
                }
                let (lo, lo_len) = (ptrs[i] as usize, sizes[i]);
                let hi = ptrs[j] as usize;
                assert!(hi >= lo + lo_len || hi + sizes[j] <= lo);
            }
        }
        for p in ptrs {
            release(p);
        }
    }

    #[test]
    fn global_alloc_roundtrip() {
        let alloc = ShardAlloc;
        let layout = Layout::from_size_align(64, 8).unwrap();
        unsafe {
            let p = alloc.alloc(layout);
            assert!(!p.is_null());
            ptr::write_bytes(p, 7, 64);
            alloc.dealloc(p, layout);
        }
    }

    #[test]
    fn global_alloc_rejects_overalignment() {
        let alloc = ShardAlloc;
        let layout = Layout::from_size_align(64, 4096).unwrap();
        unsafe {
            assert!(alloc.alloc(layout).is_null());
        }
    }
}
