//! Narrow, typed error domains. Everything else (setup, bootstrap, one-shot
//! fallible paths) uses [`eyre::Result`] per the crate's error-handling
//! convention (see `SPEC_FULL.md` §C).

use thiserror::Error;

/// Errors from [`crate::queue::BoundedQueue`].
///
/// Both variants are invariant violations per spec.md §3 (the queue
/// capacity and the claim/release balance are guaranteed by the caller);
/// the crate only ever reaches for this type in `debug_assert`-style call
/// sites, never as a normal control-flow `Result`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// `push` was called on a queue already at capacity.
    #[error("queue overflow: capacity {capacity} exceeded")]
    Overflow {
        /// The queue's fixed capacity.
        capacity: usize,
    },
    /// `rewind` was called on an empty queue.
    #[error("rewind on empty queue")]
    EmptyRewind,
}
