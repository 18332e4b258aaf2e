//! The 32-bit lock word and its architecture-independent primitives.
//!
//! Layout: bit 0 is `LOCKED`, bits 2-7 are reserved and always zero, bits
//! 8-31 carry the queue-tail code at whatever offset the active
//! [`crate::arch::Adapter`] uses. Bit 1 (`PENDING`) only has meaning under
//! the small-CPU x86 adapter; elsewhere it stays zero.
//!
//! Grounded on `asm-generic/qspinlock_types.h` (`_QCODE_OFFSET`,
//! `_QSPINLOCK_LOCKED`) for the bit layout and on
//! `kernel/locking/qspinlock.c`'s `#ifndef`-guarded defaults
//! (`queue_spin_trylock_unfair`, `queue_get_lock_qcode`,
//! `queue_spin_trylock_and_clr_qcode`) for the operations that have no
//! architecture-specific override in this crate.

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

/// Bit 0: some context holds the lock.
pub const LOCKED: u32 = 1;
/// Bit 1: small-CPU x86 adapter's pending/quick-path flag. Always zero
/// under adapters that don't implement `HAS_PENDING`.
pub const PENDING: u32 = 1 << 1;

/// The lock word itself: one 32-bit atomic, no padding, no auxiliary state.
#[repr(transparent)]
pub struct LockWord(AtomicU32);

impl LockWord {
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Raw atomic read of the whole word.
    #[inline]
    pub fn load(&self, order: Ordering) -> u32 {
        self.0.load(order)
    }

    /// Direct access to the backing atomic, for adapters that need to
    /// reinterpret it as a narrower subword.
    #[inline]
    pub(crate) fn atomic(&self) -> &AtomicU32 {
        &self.0
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.load(Ordering::Relaxed) & LOCKED != 0
    }

    /// Single CAS attempt: word must be entirely zero (free, no waiters),
    /// set to `LOCKED`. This is the primitive both `qspin_trylock` and the
    /// slow path's pre-enqueue recheck use.
    #[inline]
    pub fn trylock_fast(&self) -> bool {
        self.0
            .compare_exchange(0, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Clear the LOCKED bit with release semantics. Architecture-generic
    /// fallback; x86 adapters override this with a byte-sized store.
    #[inline]
    pub fn unlock_generic(&self) {
        self.0.fetch_and(!LOCKED, Ordering::Release);
    }

    /// Attempt to set LOCKED regardless of queue state. Architecture-generic
    /// fallback; x86 adapters override this with a byte-sized CAS.
    #[inline]
    pub fn trylock_unfair_generic(&self) -> bool {
        let cur = self.0.load(Ordering::Relaxed);
        if cur & LOCKED != 0 {
            return false;
        }
        self.0
            .compare_exchange(cur, cur | LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// CAS the whole word from `(qcode=expected, unlocked)` to
    /// `(qcode=0, locked)`. Used by the queue head when it is also the
    /// tail, to atomically acquire and empty the queue in one step.
    #[inline]
    pub fn trylock_and_clr_qcode(&self, expected_word: u32) -> bool {
        self.0
            .compare_exchange(expected_word, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Read `(status, qcode)`: `status != 0` means locked, `status == 0`
    /// means free. The original leaves room for architectures to signal
    /// "already handed to us" with a negative status from this call; no
    /// adapter in this crate does (that signal is only ever produced by
    /// the Stage A quick path instead), so `status` here is always 0 or 1.
    #[inline]
    pub fn get_lock_qcode(&self) -> (u32, u32) {
        let word = self.0.load(Ordering::Acquire);
        (word & LOCKED, word)
    }

    /// Reinterpret byte 0 (little-endian) of the word as an independent
    /// `AtomicU8` — the lock byte. Mirrors the `union qspinlock_x86 {
    /// struct qspinlock slock; u8 lock; }` trick from the x86 adapter
    /// header: on a little-endian target the LOCKED bit is the low bit of
    /// the low byte, so a byte-sized access to that address touches only
    /// the lock bit and never the qcode field above it.
    ///
    /// Only called by the x86 adapters, which are only ever selected on
    /// little-endian x86/x86_64 targets.
    #[inline]
    pub(crate) fn lock_byte(&self) -> &AtomicU8 {
        // SAFETY: `AtomicU32` has the same size, alignment, and validity
        // invariants as `u32`; reinterpreting its first byte as an
        // `AtomicU8` is valid on little-endian targets and is never read
        // or written concurrently with a conflicting-width access in a way
        // the hardware does not already guarantee atomicity for (x86
        // permits byte-within-dword accesses to any address).
        unsafe { &*(self.0.as_ptr() as *const AtomicU8) }
    }

    /// Reinterpret the upper 16 bits (bytes 2-3, little-endian) of the word
    /// as an independent `AtomicU16` — the small-CPU adapter's qcode
    /// subword.
    #[inline]
    pub(crate) fn qcode_word(&self) -> &AtomicU16 {
        // SAFETY: see `lock_byte`; bytes 2-3 of a little-endian u32 are a
        // valid, correctly aligned `u16` (the struct itself is 4-byte
        // aligned, so byte offset 2 is 2-byte aligned).
        unsafe { &*(self.0.as_ptr().byte_add(2) as *const AtomicU16) }
    }

    /// Reinterpret the low 16 bits (bytes 0-1, little-endian) of the word
    /// as an independent `AtomicU16` — `LOCKED` (bit 0) paired with the
    /// small-CPU adapter's `PENDING` bit (bit 1), for the Stage A quick
    /// path's 16-bit XCHG.
    #[inline]
    pub(crate) fn lock_pending_word(&self) -> &AtomicU16 {
        // SAFETY: see `lock_byte`.
        unsafe { &*(self.0.as_ptr() as *const AtomicU16) }
    }
}

impl Default for LockWord {
    fn default() -> Self {
        Self::new()
    }
}
