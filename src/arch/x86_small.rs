//! x86 adapter for small CPU counts: adds the pending-bit quick path and a
//! true 16-bit subword `code_xchg`, at the cost of halving the
//! representable `(cpu, idx)` space (16 bits instead of 24).
//!
//! `PENDING` is a single bit (bit 1), packed with `LOCKED` (bit 0) in the
//! low 16 bits of the word for Stage A's 16-bit XCHG; bits 2-15 stay
//! reserved/unused. `qcode` moves up to bits 16-31, a true hardware
//! subword, so `code_xchg` never touches the lock/pending pair and Stage B'
//! reconciliation is unnecessary — mirroring the same `union qspinlock_x86`
//! byte-reinterpretation idiom as [`super::X86LargeAdapter`], one level
//! wider.

use core::sync::atomic::Ordering;

use super::{Adapter, QuickOutcome};
use crate::lockword::{LockWord, LOCKED, PENDING};

pub struct X86SmallAdapter;

impl Adapter for X86SmallAdapter {
    const QCODE_OFFSET: u32 = 16;
    const HAS_PENDING: bool = true;
    const SUBWORD_CODE_XCHG: bool = true;

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
        core::sync::atomic::compiler_fence(Ordering::Release);
        word.lock_byte().store(0, Ordering::Relaxed);
        core::sync::atomic::compiler_fence(Ordering::Release);
    }

    #[inline]
    fn code_xchg(word: &LockWord, new_code: u32) -> u32 {
        let new16 = (new_code >> Self::QCODE_OFFSET) as u16;
        let old16 = word.qcode_word().swap(new16, Ordering::AcqRel);
        (old16 as u32) << Self::QCODE_OFFSET
    }

    /// Attempt the two-contender pending-bit fast lane.
    ///
    /// Intentional bounded unfairness: a contender that finds PENDING
    /// already set steals the lock rather than enqueuing onto the MCS
    /// queue. The original source leaves this undocumented; this adapter
    /// preserves the behavior rather than silently changing it, on the
    /// grounds that the unfairness window is bounded by the pending bit
    /// being a single flag.
    #[inline]
    fn trylock_quick(word: &LockWord, _qsval: u32) -> QuickOutcome {
        const LP_BOTH: u16 = (LOCKED | PENDING) as u16;

        let old = word.lock_pending_word().swap(LP_BOTH, Ordering::Acquire);
        if old == 0 {
            // Took both bits cleanly; this is an outright acquisition, not
            // a pending reservation, so release the pending half.
            word.lock_pending_word()
                .fetch_and(!(PENDING as u16), Ordering::Release);
            QuickOutcome::Acquired
        } else if old == LOCKED as u16 {
            // Holder hasn't released yet. Spin for it, then claim the
            // pending-to-locked transition.
            loop {
                while word.lock_byte().load(Ordering::Relaxed) & (LOCKED as u8) != 0 {
                    crate::cpu::cpu_relax();
                }
                if word
                    .lock_pending_word()
                    .compare_exchange(
                        PENDING as u16,
                        LOCKED as u16,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    return QuickOutcome::Acquired;
                }
            }
        } else if old == PENDING as u16 {
            // A peer already holds the pending slot; steal the lock.
            word.lock_byte().fetch_or(LOCKED as u8, Ordering::Acquire);
            QuickOutcome::Acquired
        } else {
            // Both bits were already set; our swap was a no-op.
            QuickOutcome::FallThrough
        }
    }
}
