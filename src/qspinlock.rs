//! Public API: the raw free functions plus a safe `Mutex`-shaped wrapper.
//!
//! The free functions mirror the original source's
//! `queue_spin_trylock`/`queue_spin_lock`/`queue_spin_unlock` naming and
//! contract directly. `QSpinlock<T, A>` reuses the teacher's `IrqMutex<T>`
//! guard shape (derefs to `&mut T`, releases on drop, holds a
//! `PreemptGuard` for the duration) but — unlike `IrqMutex` — never touches
//! interrupt flags: callers who need IRQ-safety layer their own
//! `cli`/`sti` discipline on top. `IrqRwLock`'s reader/writer semantics have
//! no counterpart here and are not carried forward.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use crate::arch::{self, Adapter};
use crate::lockword::LockWord;
use crate::preempt::PreemptGuard;
use crate::slowpath;

/// Try to acquire `lock` without blocking. Returns `true` on success.
#[inline]
pub fn qspin_trylock<A: Adapter>(lock: &LockWord) -> bool {
    lock.trylock_fast()
}

/// Acquire `lock`, busy-waiting through the MCS queue if contended.
///
/// Caller must have preemption disabled for the duration of the critical
/// section, through the matching `qspin_unlock`.
#[inline]
pub fn qspin_lock<A: Adapter>(lock: &LockWord) {
    if lock.trylock_fast() {
        return;
    }
    let qsval = lock.load(core::sync::atomic::Ordering::Relaxed);
    slowpath::slowpath::<A>(lock, qsval);
}

/// Release `lock`. Undefined behavior if the caller does not hold it.
#[inline]
pub fn qspin_unlock<A: Adapter>(lock: &LockWord) {
    A::unlock(lock);
}

#[inline]
pub fn qspin_is_locked(lock: &LockWord) -> bool {
    lock.is_locked()
}

/// A `Mutex`-shaped safe wrapper over the raw state machine.
///
/// `A` selects the architecture adapter; defaults to
/// [`crate::arch::Selected`], the build's chosen adapter.
pub struct QSpinlock<T, A: Adapter = arch::Selected> {
    word: LockWord,
    data: UnsafeCell<T>,
    _adapter: PhantomData<A>,
}

// SAFETY: access to `data` is only ever granted through a live
// `QSpinlockGuard`, which exists only while `word` is held.
unsafe impl<T: Send, A: Adapter> Send for QSpinlock<T, A> {}
unsafe impl<T: Send, A: Adapter> Sync for QSpinlock<T, A> {}

impl<T, A: Adapter> QSpinlock<T, A> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            word: LockWord::new(),
            data: UnsafeCell::new(data),
            _adapter: PhantomData,
        }
    }

    #[inline]
    pub fn lock(&self) -> QSpinlockGuard<'_, T, A> {
        let preempt = PreemptGuard::new();
        qspin_lock::<A>(&self.word);
        QSpinlockGuard {
            lock: self,
            _preempt: preempt,
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<QSpinlockGuard<'_, T, A>> {
        let preempt = PreemptGuard::new();
        if qspin_trylock::<A>(&self.word) {
            Some(QSpinlockGuard {
                lock: self,
                _preempt: preempt,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        qspin_is_locked(&self.word)
    }

    /// Direct access when exclusivity is already guaranteed by the type
    /// system (e.g. through `&mut self`).
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

pub struct QSpinlockGuard<'a, T, A: Adapter> {
    lock: &'a QSpinlock<T, A>,
    _preempt: PreemptGuard,
}

impl<T, A: Adapter> Deref for QSpinlockGuard<'_, T, A> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: holding the guard means we hold the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, A: Adapter> DerefMut for QSpinlockGuard<'_, T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the guard means we hold the lock, exclusively.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T, A: Adapter> Drop for QSpinlockGuard<'_, T, A> {
    #[inline]
    fn drop(&mut self) {
        qspin_unlock::<A>(&self.lock.word);
    }
}
