//! Internal failure taxonomy.
//!
//! None of these variants ever reach an `allocate`/`release` caller: the
//! public API stays infallible (null pointer, or silent no-op) exactly as
//! specified. They exist so the tracing layer in [`crate::trace`] has
//! something structured to log.

use thiserror::Error;

/// A recoverable condition encountered while servicing an allocation or
/// release request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocFailure {
    /// `allocate(0)` was requested.
    #[error("allocate(0) requested, returning null without touching arena state")]
    InvalidSize,

    /// The arena table (or one of its arenas) could not be mapped.
    #[error("OS memory mapping failed during arena table initialization")]
    InitializationFailure,

    /// No run of free blocks exists anywhere in the arena, even after
    /// attempting to extend it.
    #[error("arena exhausted: no run of free blocks available")]
    OutOfSpace,

    /// Growing an arena's heap failed at the OS mapping layer.
    #[error("OS memory mapping failed while extending an arena's heap")]
    ExtensionFailure,

    /// `release` was called with a pointer outside every arena's range.
    #[error("release() pointer does not belong to any known arena")]
    ForeignPointer,

    /// The stored size prefix would imply a block range that overflows the
    /// owning arena; treated as corrupt metadata and ignored.
    #[error("stored size prefix implies an out-of-range block count")]
    CorruptSize,
}
