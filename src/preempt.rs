//! Software preemption accounting.
//!
//! RAII guard tracking whether the calling context has disabled preemption,
//! the same shape as `slopos-lib`'s `PreemptGuard` against its PCR — except
//! the counter here lives in a flat per-CPU array indexed directly by
//! [`crate::percpu::cpu_id`], not through [`crate::cpu_local::CpuLocal`]:
//! `CpuLocal::get` itself constructs a `PreemptGuard` to pin the calling
//! context for the duration of the access, so if `PreemptGuard` stored its
//! counter in a `CpuLocal` it would recurse into the cell it exists to
//! guard.
//!
//! This crate does not disable preemption on the caller's behalf anywhere —
//! that is the caller's contract to uphold before calling the slow path.
//! `PreemptGuard` exists so the safe [`crate::QSpinlock`] wrapper can honor
//! that contract automatically, and so debug builds can assert it.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::percpu::{self, MAX_CPUS};

const ZERO: AtomicU32 = AtomicU32::new(0);
static PREEMPT_COUNTS: [AtomicU32; MAX_CPUS] = [ZERO; MAX_CPUS];

/// RAII guard that marks the calling context as non-preemptible while held.
/// Guards nest: preemption is "re-enabled" (from this crate's point of view)
/// only once every outstanding guard on this CPU has dropped.
///
/// `!Send`/`!Sync`: a guard must not outlive the CPU context it was created
/// on.
#[must_use = "if unused, preemption accounting is immediately reverted"]
pub struct PreemptGuard {
    cpu: usize,
    _marker: PhantomData<*mut ()>,
}

impl PreemptGuard {
    #[inline]
    pub fn new() -> Self {
        let cpu = percpu::cpu_id() as usize % MAX_CPUS;
        PREEMPT_COUNTS[cpu].fetch_add(1, Ordering::Relaxed);
        Self {
            cpu,
            _marker: PhantomData,
        }
    }

    /// True if the calling CPU has at least one outstanding `PreemptGuard`.
    #[inline]
    pub fn is_active() -> bool {
        let cpu = percpu::cpu_id() as usize % MAX_CPUS;
        PREEMPT_COUNTS[cpu].load(Ordering::Relaxed) > 0
    }

    /// Current nesting depth on the calling CPU.
    #[inline]
    pub fn count() -> u32 {
        let cpu = percpu::cpu_id() as usize % MAX_CPUS;
        PREEMPT_COUNTS[cpu].load(Ordering::Relaxed)
    }
}

impl Default for PreemptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PreemptGuard {
    #[inline]
    fn drop(&mut self) {
        let prev = PREEMPT_COUNTS[self.cpu].fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "preempt_count underflow");
    }
}

#[inline]
pub fn is_preemption_disabled() -> bool {
    PreemptGuard::is_active()
}
