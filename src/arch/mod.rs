//! Architecture adapter: the set of primitives the slow path delegates to
//! so that architectures with stronger subword-access guarantees can skip
//! work the generic path cannot.
//!
//! Three adapters ship: [`generic::GenericAdapter`] (portable, no
//! assumptions beyond `core::sync::atomic`), [`x86_large::X86LargeAdapter`]
//! (byte-sized lock/unlock, full-word `code_xchg`, needs the accidental-steal
//! reconciliation) and [`x86_small::X86SmallAdapter`] (adds the pending-bit
//! quick path and a true 16-bit subword `code_xchg`, so no reconciliation is
//! needed). Selection is a build-time choice — see [`Selected`].

mod generic;
mod x86_large;
mod x86_small;

pub use generic::GenericAdapter;
pub use x86_large::X86LargeAdapter;
pub use x86_small::X86SmallAdapter;

use crate::lockword::LockWord;

/// Outcome of [`Adapter::trylock_quick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickOutcome {
    /// The lock was acquired through the quick path; the slow path returns
    /// immediately without ever touching the node pool.
    Acquired,
    /// The quick path is unavailable or already fully occupied; proceed to
    /// Stage B (join the MCS queue).
    FallThrough,
}

/// Primitives an architecture can specialize. `QCODE_OFFSET` and the three
/// `bool` consts describe the specialization to the generic slow path;
/// the methods implement it.
pub trait Adapter {
    /// Bit offset at which the queue-tail code begins.
    const QCODE_OFFSET: u32;
    /// Whether this adapter implements [`Adapter::trylock_quick`].
    const HAS_PENDING: bool;
    /// Whether [`Adapter::code_xchg`] operates on an isolated subword (no
    /// accidental-steal reconciliation needed) rather than the full word.
    const SUBWORD_CODE_XCHG: bool;

    /// Attempt to set LOCKED regardless of queue state.
    fn trylock_unfair(word: &LockWord) -> bool;

    /// Clear LOCKED with release semantics.
    fn unlock(word: &LockWord);

    /// Publish `new_code` as the new tail, returning the previous value.
    ///
    /// When `SUBWORD_CODE_XCHG` is `false`, `new_code` and the return value
    /// are full 32-bit words (tail bits plus whatever the LOCKED bit
    /// happened to be), and the caller must run the Stage B' reconciliation
    /// against the returned value. When `true`, both are pure tail codes —
    /// the low bits carrying LOCKED/PENDING are untouched by this call, and
    /// reconciliation is unnecessary.
    fn code_xchg(word: &LockWord, new_code: u32) -> u32;

    /// Optional two-contender fast lane. Default: never available.
    #[inline]
    fn trylock_quick(word: &LockWord, qsval: u32) -> QuickOutcome {
        let _ = (word, qsval);
        QuickOutcome::FallThrough
    }
}

// The x86 adapters rely on reinterpreting the lock word's bytes directly
// (the `union qspinlock_x86` trick), which is only valid on little-endian
// x86/x86_64; every other target gets the fully portable generic adapter
// regardless of the `x86-small-cpu` feature.
#[cfg(all(
    any(target_arch = "x86", target_arch = "x86_64"),
    feature = "x86-small-cpu"
))]
pub type Selected = X86SmallAdapter;

#[cfg(all(
    any(target_arch = "x86", target_arch = "x86_64"),
    not(feature = "x86-small-cpu")
))]
pub type Selected = X86LargeAdapter;

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub type Selected = GenericAdapter;
