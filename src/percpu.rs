//! CPU identity resolution.
//!
//! The core never assumes a particular boot protocol for assigning logical
//! CPU indices. Instead a host registers a resolver function once, the same
//! way `slopos-lib` lets a driver register its LAPIC-ID reader rather than
//! hardcoding APIC access into `percpu.rs` itself.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Maximum number of CPUs this crate's per-CPU arrays are sized for.
///
/// Bounds both the node pool (`pool.rs`) and the preemption counters
/// (`preempt.rs`). `qcode` has room for far more (24 bits of cpu+1 in the
/// large-CPU adapter), but 128 is a generous static allocation for a
/// kernel-style target and keeps the per-CPU arrays small.
pub const MAX_CPUS: usize = 128;

pub type CpuIdFn = fn() -> u32;

/// Stored as a raw pointer; `null` means "no resolver registered, assume
/// single-CPU (index 0)".
static CPU_ID_FN: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

/// Register the function the host uses to resolve "the logical CPU index of
/// the calling context". Typically backed by a GS-base read on a real
/// kernel, or a thread-local counter in tests.
///
/// Calling this more than once replaces the previous resolver; this crate
/// does not attempt to detect a racing double-registration, the same way
/// the teacher's `register_lapic_id_fn` does not.
pub fn register_cpu_id_fn(f: CpuIdFn) {
    CPU_ID_FN.store(f as *mut (), Ordering::Release);
}

/// The logical CPU index of the calling context.
///
/// Returns 0 if no resolver has been registered yet (single-CPU fallback),
/// matching the teacher's `current_cpu_id()` fallback-to-BSP behavior.
#[inline]
pub fn cpu_id() -> u32 {
    let ptr = CPU_ID_FN.load(Ordering::Acquire);
    if ptr.is_null() {
        return 0;
    }
    // SAFETY: `ptr` was stored by `register_cpu_id_fn` with a valid `CpuIdFn`,
    // which has the same representation as `*mut ()` on all supported targets.
    let f: CpuIdFn = unsafe { core::mem::transmute(ptr) };
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicU32;

    static PROBE: AtomicU32 = AtomicU32::new(7);

    fn probe_resolver() -> u32 {
        PROBE.load(Ordering::Relaxed)
    }

    #[test]
    fn resolver_overrides_default() {
        // This crate's resolver is one process-wide static; serialize
        // against every other test that registers or relies on it.
        let _serial = crate::test_serial::lock();

        // Before registration in a fresh process this would be 0, but test
        // binaries share statics across tests in the same process, so only
        // assert the post-registration behavior here.
        register_cpu_id_fn(probe_resolver);
        assert_eq!(cpu_id(), 7);
        PROBE.store(3, Ordering::Relaxed);
        assert_eq!(cpu_id(), 3);
    }
}
