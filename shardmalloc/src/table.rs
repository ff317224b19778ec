//! Arena table, lazy one-shot initialization, and thread-to-arena binding
//! (`spec.md` §2 layer 4, §4.5).
//!
//! The process-wide lock here guards exactly two things, per `spec.md` §5
//! and §9's "Global lock vs per-arena lock" note: the one-time arena table
//! construction, and the sticky round-robin counter. Everything else
//! (find-free, set/clear bits, extension) happens under the per-arena lock
//! in [`crate::arena`].

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::arena::Arena;
use crate::config::BLOCK_SIZE;
use crate::error::AllocFailure;
use crate::os_mem;
use crate::trace;

struct GlobalState {
    arenas: Option<Arc<Vec<Arena>>>,
}

lazy_static! {
    /// Guards the one-shot arena table construction. Declared eagerly via
    /// `lazy_static!` (mirroring the teacher's `FRAME_ALLOCATOR`/
    /// `BLOCK_CACHE_MANAGER` statics), but the arena table itself is built
    /// lazily, on first use, as `spec.md` §4.5 requires.
    static ref GLOBAL: Mutex<GlobalState> = Mutex::new(GlobalState { arenas: None });
}

/// Process-wide round-robin cursor for the sticky thread-binding policy.
static NEXT_ARENA: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Each thread's sticky arena assignment, established on first use and
    /// retained for the thread's lifetime (`spec.md` §3 "Thread binding").
    static THREAD_ARENA: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Ensures the arena table exists, building it on the calling thread if
/// this is the first call anywhere in the process. Returns the number of
/// arenas on success.
fn ensure_initialized(global: &mut GlobalState) -> Result<usize, AllocFailure> {
    if let Some(arenas) = &global.arenas {
        return Ok(arenas.len());
    }

    let cpu_count = os_mem::online_cpu_count().max(1);
    let mut arenas = Vec::with_capacity(cpu_count);
    for _ in 0..cpu_count {
        match Arena::new(BLOCK_SIZE) {
            Ok(arena) => arenas.push(arena),
            Err(e) => {
                // Roll back: dropping `arenas` here unmaps every segment
                // already created, since `Segment`'s `Drop` calls munmap.
                drop(arenas);
                return Err(e);
            }
        }
    }

    trace::arena_table_initialized(arenas.len());
    let count = arenas.len();
    global.arenas = Some(Arc::new(arenas));
    Ok(count)
}

/// Returns the arena index bound to the calling thread, initializing the
/// table and/or assigning a fresh sticky index as needed.
fn thread_arena_index() -> Result<usize, AllocFailure> {
    if let Some(index) = THREAD_ARENA.with(|cell| cell.get()) {
        return Ok(index);
    }

    let mut global = GLOBAL.lock();
    let arena_count = ensure_initialized(&mut global)?;
    drop(global);

    let index = NEXT_ARENA.fetch_add(1, Ordering::Relaxed) % arena_count;
    THREAD_ARENA.with(|cell| cell.set(Some(index)));
    trace::thread_bound(index);
    Ok(index)
}

/// Runs `f` against the calling thread's bound arena, initializing the
/// table first if needed.
///
/// `GLOBAL` is held only long enough to clone the `Arc<Vec<Arena>>` table
/// handle, not across `f` — per `spec.md` §9, the global lock must cover
/// only one-time init and the round-robin counter, never the per-arena
/// hot path that `f` runs.
pub(crate) fn with_thread_arena<R>(f: impl FnOnce(&Arena, usize) -> R) -> Result<R, AllocFailure> {
    let index = thread_arena_index()?;
    let arenas = {
        let global = GLOBAL.lock();
        // `arenas` is `Some` here: `thread_arena_index` only returns `Ok`
        // after `ensure_initialized` has populated it, and the table is
        // never cleared afterwards.
        global.arenas.as_ref().expect("arena table initialized").clone()
    };
    Ok(f(&arenas[index], index))
}

/// Locates the arena owning `ptr` (`spec.md` §4.4 step 3) and runs `f`
/// against it. Returns `None` if no arena has been initialized yet, or no
/// arena claims the pointer.
///
/// As with [`with_thread_arena`], `GLOBAL` is released before `f` runs.
pub(crate) fn with_owning_arena<R>(ptr: *mut u8, f: impl FnOnce(&Arena) -> R) -> Option<R> {
    let arenas = {
        let global = GLOBAL.lock();
        global.arenas.as_ref()?.clone()
    };
    let arena = arenas.iter().find(|a| a.owns(ptr))?;
    Some(f(arena))
}
