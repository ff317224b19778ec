//! OS memory provider.
//!
//! A thin abstraction over anonymous, private, read/write virtual-memory
//! mapping and unmapping (`spec.md` §2, layer 1). Every arena's heap and
//! bitmap storage is backed by a region obtained here; nothing above this
//! module is allowed to call `libc::mmap`/`libc::munmap` directly.

use std::ptr::NonNull;
use std::sync::OnceLock;

use crate::error::AllocFailure;

/// Maps a fresh, zero-filled, anonymous, private region of at least `len`
/// bytes with read/write permission.
///
/// Returns [`AllocFailure::InitializationFailure`] on mapping failure; the
/// caller decides whether that should surface as an initialization error or
/// an extension error.
pub(crate) fn map_anonymous(len: usize) -> Result<NonNull<u8>, AllocFailure> {
    debug_assert!(len > 0);
    // SAFETY: `MAP_ANONYMOUS` ignores `fd`/`offset`; the kernel zero-fills
    // the returned pages. `len` is checked non-zero above.
    let addr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(AllocFailure::InitializationFailure);
    }
    // SAFETY: mmap succeeded, so `addr` is a non-null, valid mapping base.
    Ok(unsafe { NonNull::new_unchecked(addr.cast::<u8>()) })
}

/// Unmaps a region previously returned by [`map_anonymous`].
///
/// # Safety
/// `ptr` must have been returned by [`map_anonymous`] with exactly `len`,
/// and must not be accessed again after this call.
pub(crate) unsafe fn unmap(ptr: NonNull<u8>, len: usize) {
    // SAFETY: forwarded from the caller's contract.
    let rc = unsafe { libc::munmap(ptr.as_ptr().cast(), len) };
    debug_assert_eq!(rc, 0, "munmap of a region we own should not fail");
}

/// The OS page size, queried once and cached for the process lifetime.
pub(crate) fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: `_SC_PAGESIZE` is always a valid `sysconf` name.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            4096
        }
    })
}

/// Rounds `len` up to a whole number of OS pages.
pub(crate) fn round_up_to_page(len: usize) -> usize {
    let page = page_size();
    (len + page - 1) & !(page - 1)
}

/// The number of online logical CPUs, used to size the arena table.
///
/// Falls back to 1 if the platform cannot report a count, which keeps the
/// allocator usable (as a single shard) rather than failing outright.
pub(crate) fn online_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
