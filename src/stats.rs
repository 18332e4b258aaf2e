//! Ambient contention counters (feature `stats`, default on).
//!
//! Pure observability: nothing in [`crate::slowpath`] reads these back, and
//! disabling the feature removes them and their call sites entirely. Shape
//! is the teacher's own per-CPU `AtomicU64` counters in `percpu.rs`
//! (`context_switches`, `interrupt_count`) — the one place in this crate
//! that reaches for [`crate::cpu_local::CpuLocal`], since every other
//! per-CPU access here (the node pool) needs to read a *different* CPU's
//! slot, which `CpuLocal`'s pinned-to-self API cannot do.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::percpu::MAX_CPUS;

crate::cpu_local! {
    static SLOWPATH_ENTRIES: AtomicU64 = AtomicU64::new(0);
}
crate::cpu_local! {
    static QUICK_WINS: AtomicU64 = AtomicU64::new(0);
}
crate::cpu_local! {
    static ACCIDENTAL_STEALS: AtomicU64 = AtomicU64::new(0);
}
crate::cpu_local! {
    static POOL_EXHAUSTIONS: AtomicU64 = AtomicU64::new(0);
}

#[inline]
pub(crate) fn record_slowpath_entry() {
    SLOWPATH_ENTRIES.get().fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_quick_win() {
    QUICK_WINS.get().fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_accidental_steal() {
    ACCIDENTAL_STEALS.get().fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_pool_exhaustion() {
    POOL_EXHAUSTIONS.get().fetch_add(1, Ordering::Relaxed);
}

/// A snapshot of one CPU's contention counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub slowpath_entries: u64,
    pub quick_wins: u64,
    pub accidental_steals: u64,
    pub pool_exhaustions: u64,
}

/// Read the given CPU's counters. Out-of-range `cpu` values wrap modulo
/// [`MAX_CPUS`], matching every other per-CPU index in this crate.
pub fn snapshot(cpu: usize) -> Snapshot {
    let cpu = cpu % MAX_CPUS;
    // SAFETY: `cpu % MAX_CPUS` is always in bounds; these are plain atomic
    // loads with no migration hazard, so no pinning is required to read
    // them.
    unsafe {
        Snapshot {
            slowpath_entries: SLOWPATH_ENTRIES.get_for_cpu(cpu).load(Ordering::Relaxed),
            quick_wins: QUICK_WINS.get_for_cpu(cpu).load(Ordering::Relaxed),
            accidental_steals: ACCIDENTAL_STEALS.get_for_cpu(cpu).load(Ordering::Relaxed),
            pool_exhaustions: POOL_EXHAUSTIONS.get_for_cpu(cpu).load(Ordering::Relaxed),
        }
    }
}

/// Read the calling CPU's counters.
pub fn snapshot_current() -> Snapshot {
    snapshot(crate::percpu::cpu_id() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_recorded_events() {
        let _serial = crate::test_serial::lock();
        crate::percpu::register_cpu_id_fn(|| 0);

        let before = snapshot(0);
        record_slowpath_entry();
        record_quick_win();
        record_accidental_steal();
        record_pool_exhaustion();
        let after = snapshot(0);

        assert_eq!(after.slowpath_entries, before.slowpath_entries + 1);
        assert_eq!(after.quick_wins, before.quick_wins + 1);
        assert_eq!(after.accidental_steals, before.accidental_steals + 1);
        assert_eq!(after.pool_exhaustions, before.pool_exhaustions + 1);
    }

    #[test]
    fn snapshot_current_follows_registered_cpu() {
        let _serial = crate::test_serial::lock();
        crate::percpu::register_cpu_id_fn(|| 3);

        let before = snapshot(3);
        record_slowpath_entry();
        let after = snapshot_current();

        assert_eq!(after.slowpath_entries, before.slowpath_entries + 1);
    }
}
