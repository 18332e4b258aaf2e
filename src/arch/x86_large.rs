//! x86 adapter for large CPU counts: byte-sized lock/unlock, but
//! `code_xchg` still swaps the full word (qcode is 24 bits, not a
//! hardware-addressable subword), so Stage B' reconciliation still runs.
//!
//! Grounded directly on `arch/x86/include/asm/qspinlock.h`'s
//! `union qspinlock_x86 { struct qspinlock slock; u8 lock; }`: reading or
//! writing just the lock byte avoids disturbing the qcode field without
//! needing a masked CAS on the full word.

use core::sync::atomic::Ordering;

use super::{Adapter, QuickOutcome};
use crate::lockword::{LockWord, LOCKED};

pub struct X86LargeAdapter;

impl Adapter for X86LargeAdapter {
    const QCODE_OFFSET: u32 = 8;
    const HAS_PENDING: bool = false;
    const SUBWORD_CODE_XCHG: bool = false;

    #[inline]
    fn trylock_unfair(word: &LockWord) -> bool {
        let byte = word.lock_byte();
        if byte.load(Ordering::Relaxed) & (LOCKED as u8) != 0 {
            return false;
        }
        byte.compare_exchange(0, LOCKED as u8, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    fn unlock(word: &LockWord) {
        // A compiler barrier either side of the plain store is all x86
        // needs: the architecture's total store order makes a store to
        // the lock byte visible without an explicit fence.
        core::sync::atomic::compiler_fence(Ordering::Release);
        word.lock_byte().store(0, Ordering::Relaxed);
        core::sync::atomic::compiler_fence(Ordering::Release);
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
