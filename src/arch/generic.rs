//! Fully portable adapter: no subword assumptions beyond `core::sync::atomic`.
//!
//! `code_xchg` swaps the entire 32-bit word, which means it can
//! incidentally clear LOCKED as a side effect — the slow path's Stage B'
//! reconciliation exists specifically to clean up after this adapter (and
//! [`super::X86LargeAdapter`], which shares the same limitation for the
//! qcode portion even though it specializes the lock byte itself).
//!
//! Grounded directly on `kernel/locking/qspinlock.c`'s `#ifndef`-guarded
//! default implementations, which is exactly what runs when no
//! architecture header overrides them.

use core::sync::atomic::Ordering;

use super::{Adapter, QuickOutcome};
use crate::lockword::LockWord;

pub struct GenericAdapter;

impl Adapter for GenericAdapter {
    const QCODE_OFFSET: u32 = 8;
    const HAS_PENDING: bool = false;
    const SUBWORD_CODE_XCHG: bool = false;

    #[inline]
    fn trylock_unfair(word: &LockWord) -> bool {
        word.trylock_unfair_generic()
    }

    #[inline]
    fn unlock(word: &LockWord) {
        word.unlock_generic();
    }

    #[inline]
    fn code_xchg(word: &LockWord, new_code: u32) -> u32 {
        word.atomic().swap(new_code, Ordering::AcqRel)
    }

    #[inline]
    fn trylock_quick(word: &LockWord, qsval: u32) -> QuickOutcome {
        let _ = (word, qsval);
        QuickOutcome::FallThrough
    }
}
