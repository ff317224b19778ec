//! Debug tracing hooks.
//!
//! Out of the CORE per `spec.md` §1 ("debug tracing" is an external
//! collaborator), but every module still calls through here instead of
//! printing directly, the way the C reference's `DEBUG_PRINT` macro is
//! threaded through `tinymalloc_old.c`. Compiled in at all times; costs
//! nothing when no `log` subscriber is installed.

use crate::error::AllocFailure;

#[inline]
pub(crate) fn alloc_requested(size: usize) {
    log::trace!("allocate: requested {size} bytes");
}

#[inline]
pub(crate) fn alloc_succeeded(size: usize, ptr: *mut u8) {
    log::trace!("allocate: {size} bytes -> {ptr:p}");
}

#[inline]
pub(crate) fn alloc_failed(size: usize, reason: AllocFailure) {
    log::debug!("allocate: {size} bytes failed ({reason})");
}

#[inline]
pub(crate) fn heap_extended(arena_index: usize, segment_index: usize, new_segment_size: usize) {
    log::debug!(
        "arena {arena_index}: extended with segment {segment_index} ({new_segment_size} bytes)"
    );
}

#[inline]
pub(crate) fn release_requested(ptr: *mut u8) {
    log::trace!("release: {ptr:p}");
}

#[inline]
pub(crate) fn release_ignored(ptr: *mut u8, reason: AllocFailure) {
    log::warn!("release: {ptr:p} ignored ({reason})");
}

#[inline]
pub(crate) fn release_completed(ptr: *mut u8, blocks: usize) {
    log::trace!("release: {ptr:p} cleared {blocks} blocks");
}

#[inline]
pub(crate) fn arena_table_initialized(arena_count: usize) {
    log::debug!("arena table initialized with {arena_count} arenas");
}

#[inline]
pub(crate) fn thread_bound(arena_index: usize) {
    log::trace!("thread bound to arena {arena_index}");
}
