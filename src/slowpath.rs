//! The contended-path state machine: Stages A through E.
//!
//! Entered when the fast trylock loses the race, carrying the lock-word
//! snapshot (`qsval`) the fast path observed. Grounded on
//! `kernel/locking/qspinlock.c`'s `queue_spin_lock_slowpath` for control
//! flow (the quick-path gate, the accidental-steal reconciliation, the
//! head-of-queue loop) and on `gz-node-replication/src/qlock.rs`'s
//! `lock()`/`unlock()` for the actual Rust idiom of linking a predecessor
//! and notifying a successor through `AtomicPtr`/`AtomicBool`.

use core::sync::atomic::Ordering;

use crate::arch::{Adapter, QuickOutcome};
use crate::cpu::cpu_relax;
use crate::lockword::{LockWord, LOCKED, PENDING};
use crate::node::QNode;
use crate::percpu;
use crate::pool;
use crate::preempt::PreemptGuard;
use crate::qcode;

/// Run the slow path to completion. Returns with the lock held.
///
/// Callers must already have preemption disabled (debug-asserted) and must
/// have already lost the fast trylock race with `qsval` as the observed
/// word.
pub(crate) fn slowpath<A: Adapter>(word: &LockWord, qsval: u32) {
    debug_assert!(
        PreemptGuard::is_active(),
        "qspin_lock entered the slow path without preemption disabled"
    );

    #[cfg(feature = "stats")]
    crate::stats::record_slowpath_entry();

    // Stage A: optional quick path. Only attempted while the queue itself
    // is still empty — once a real waiter is queued the quick path's
    // two-contender assumption no longer holds.
    if A::HAS_PENDING && (qsval >> A::QCODE_OFFSET) == 0 {
        if let QuickOutcome::Acquired = A::trylock_quick(word, qsval) {
            #[cfg(feature = "stats")]
            crate::stats::record_quick_win();
            return;
        }
    }

    // Stage B: join the MCS queue.
    let cpu = percpu::cpu_id();
    let (node_cpu, idx) = match pool::get_qnode() {
        Some(v) => v,
        None => {
            pool::warn_exhausted(cpu);
            #[cfg(feature = "stats")]
            crate::stats::record_pool_exhaustion();
            while !A::trylock_unfair(word) {
                cpu_relax();
            }
            return;
        }
    };
    let node = pool::node_at(node_cpu, idx);
    node.reset();
    let mycode = qcode::encode(node_cpu, idx, A::QCODE_OFFSET);

    // The lock may have become free since the fast path's snapshot; avoid
    // an unnecessary enqueue if so.
    if (qsval >> A::QCODE_OFFSET) == 0 && word.trylock_fast() {
        pool::put_qnode();
        return;
    }

    let prev_qcode = if A::SUBWORD_CODE_XCHG {
        A::code_xchg(word, mycode)
    } else {
        let prev_word = A::code_xchg(word, mycode | LOCKED);
        if prev_word & LOCKED == 0 {
            // Stage B': the full-word XCHG incidentally cleared LOCKED.
            #[cfg(feature = "stats")]
            crate::stats::record_accidental_steal();
            if prev_word == 0 {
                // We are the head and accidentally hold the lock already.
                if word.trylock_and_clr_qcode(mycode | LOCKED) {
                    pool::put_qnode();
                    return;
                }
                // Someone queued behind us before the CAS landed.
                notify_next(node);
                pool::put_qnode();
                return;
            }
            // We stole the lock but a real head is ahead of us in queue;
            // give it back and carry on as an ordinary waiter.
            A::unlock(word);
            prev_word
        } else {
            prev_word & !LOCKED
        }
    };

    if prev_qcode != 0 {
        let (pcpu, pidx) = qcode::decode(prev_qcode, A::QCODE_OFFSET);
        let pred = pool::node_at(pcpu, pidx);
        pred.next
            .store(node as *const QNode as *mut QNode, Ordering::Relaxed);
        while node.wait.load(Ordering::Acquire) {
            cpu_relax();
        }
    }

    // Head of the queue now.
    loop {
        let (status, qword) = word.get_lock_qcode();
        if status != 0 {
            cpu_relax();
            continue;
        }
        let tail = qword & !(LOCKED | PENDING);
        if tail == mycode {
            if word.trylock_and_clr_qcode(qword) {
                pool::put_qnode();
                return;
            }
        } else if A::trylock_unfair(word) {
            notify_next(node);
            pool::put_qnode();
            return;
        }
        cpu_relax();
    }
}

/// Wait, if needed, for the successor to finish linking itself, then hand
/// off the lock by clearing its wait flag with release semantics.
fn notify_next(node: &'static QNode) {
    loop {
        let next = node.next.load(Ordering::Acquire);
        if !next.is_null() {
            // SAFETY: every pointer ever stored into a `QNode::next` comes
            // from `pool::node_at`, which only hands out `&'static QNode`
            // references into the static pool.
            let next_node = unsafe { &*next };
            next_node.wait.store(false, Ordering::Release);
            return;
        }
        cpu_relax();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::sync::atomic::{AtomicBool, Ordering as StdOrdering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::arch::GenericAdapter;
    use crate::preempt::PreemptGuard;

    /// Pool exhaustion, driven white-box: this is the only way to exercise
    /// it deterministically, since a node is only held for the
    /// duration of the slow path itself (released before the caller ever
    /// sees the guard), and `pool`'s bookkeeping assumes one logical
    /// execution context per CPU at a time — real concurrent OS threads
    /// sharing a fake `cpu_id` would race on it. Here a single thread drains
    /// the pool directly and calls `slowpath` itself; the one background
    /// thread exists purely to release the lock so the unfair-spin fallback
    /// can terminate.
    #[test]
    fn pool_exhaustion_falls_back_to_unfair_spin_and_recovers() {
        let _serial = crate::test_serial::lock();
        percpu::register_cpu_id_fn(|| 0);

        // Force cpu 0's pool back to empty regardless of what earlier
        // tests left behind, then fill all slots so the next contended
        // acquisition is forced down the exhaustion path deterministically.
        pool::reset_for_test(0);
        let held: std::vec::Vec<_> = (0..pool::MAX_QNODES)
            .map(|_| pool::get_qnode().expect("pool should have room"))
            .collect();
        assert!(pool::get_qnode().is_none());

        let _preempt = PreemptGuard::new();
        let word = Arc::new(LockWord::new());
        assert!(word.trylock_fast());

        let released = Arc::new(AtomicBool::new(false));
        let w = word.clone();
        let r = released.clone();
        let holder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(15));
            GenericAdapter::unlock(&w);
            r.store(true, StdOrdering::Relaxed);
        });

        // qsval observed here has LOCKED set and an empty queue.
        slowpath::<GenericAdapter>(&word, LOCKED);

        assert!(released.load(StdOrdering::Relaxed));
        assert!(word.is_locked());
        GenericAdapter::unlock(&word);
        holder.join().unwrap();

        for _ in held {
            pool::put_qnode();
        }
    }

    /// Accidental steal, driven white-box: `GenericAdapter` does not have
    /// a hardware-addressable `qcode` subword, so its
    /// `code_xchg` swaps the *entire* word, including `LOCKED`. Passing a
    /// `qsval` whose tail looks nonempty skips both the Stage A gate and
    /// the pre-enqueue `trylock_fast` recheck, so the swap's result is
    /// driven entirely by the real word's state, which is set up here to
    /// be genuinely free (`0`) — producing the `prev_word == 0` case where
    /// the entrant turns out to already be both head and tail.
    #[test]
    fn accidental_steal_as_sole_queued_waiter_acquires_immediately() {
        let _serial = crate::test_serial::lock();
        percpu::register_cpu_id_fn(|| 0);
        pool::reset_for_test(0);

        let _preempt = PreemptGuard::new();
        let word = LockWord::new();
        assert_eq!(word.load(StdOrdering::Relaxed), 0);

        // A qsval with a nonzero tail, purely to steer the slow path past
        // the Stage A gate and the Stage B pre-enqueue recheck; the real
        // word above stays untouched at 0.
        let stale_qsval = qcode::encode(5, 0, GenericAdapter::QCODE_OFFSET) | LOCKED;

        slowpath::<GenericAdapter>(&word, stale_qsval);

        #[cfg(feature = "stats")]
        {
            let snap = crate::stats::snapshot(0);
            assert!(snap.accidental_steals >= 1);
        }

        assert!(word.is_locked());
        // Queue is empty again: we both entered and exited as the only
        // waiter, so the node returned to the pool.
        assert!(pool::get_qnode().is_some());
        GenericAdapter::unlock(&word);
    }
}
