//! Per-CPU node pool.
//!
//! Each CPU owns a fixed `[QNode; MAX_QNODES]` array plus a bump index.
//! Allocation is a post-increment, deallocation a decrement: preemption is
//! disabled around the whole acquire/hold/release window and IRQs nest
//! strictly, so stack discipline is sufficient and no slot needs tagging.
//!
//! Grounded on the teacher's `percpu.rs` raw `[PerCpuData; MAX_CPUS]` array
//! plus indexed lookup (`get_percpu_data_for`), which is exactly the shape
//! needed here: a predecessor lookup must reach into a *different* CPU's
//! pool, so this cannot go through the pinned, current-CPU-only
//! `CpuLocal` API that `stats.rs` uses instead.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::node::QNode;
use crate::once_lock::OnceLock;
use crate::percpu::{self, MAX_CPUS};

/// Nodes per CPU. Four covers task + softirq + hardirq + NMI nesting.
pub const MAX_QNODES: usize = 4;

struct NodeSet {
    node_idx: AtomicUsize,
    nodes: [QNode; MAX_QNODES],
}

impl NodeSet {
    const fn new() -> Self {
        const NODE: QNode = QNode::new();
        Self {
            node_idx: AtomicUsize::new(0),
            nodes: [NODE; MAX_QNODES],
        }
    }
}

static POOL: [NodeSet; MAX_CPUS] = {
    const SET: NodeSet = NodeSet::new();
    [SET; MAX_CPUS]
};

static EXHAUSTION_WARNED: OnceLock<()> = OnceLock::new();

/// Allocate a node from the calling CPU's pool.
///
/// Returns `(cpu, idx)` identifying the node, or `None` if the pool is
/// exhausted. Caller must have preemption disabled for the duration this
/// node is in use, and must call [`put_qnode`] on every exit path.
#[inline]
pub fn get_qnode() -> Option<(u32, u32)> {
    let cpu = percpu::cpu_id();
    let set = &POOL[cpu as usize % MAX_CPUS];
    let idx = set.node_idx.load(Ordering::Relaxed);
    if idx >= MAX_QNODES {
        return None;
    }
    set.node_idx.store(idx + 1, Ordering::Relaxed);
    Some((cpu, idx as u32))
}

/// Release the most recently allocated node on the calling CPU's pool.
///
/// Must be called exactly once for every successful [`get_qnode`], in LIFO
/// order relative to nested acquisitions.
#[inline]
pub fn put_qnode() {
    let cpu = percpu::cpu_id();
    let set = &POOL[cpu as usize % MAX_CPUS];
    let idx = set.node_idx.load(Ordering::Relaxed);
    debug_assert!(idx > 0, "put_qnode without matching get_qnode");
    set.node_idx.store(idx - 1, Ordering::Relaxed);
}

/// Borrow the node at `(cpu, idx)` from any CPU's pool.
///
/// Used to resolve a predecessor or successor link encoded in a `qcode`.
/// Safe because the MCS protocol guarantees the referenced node is either
/// still queued (exclusively written by its owning CPU except for the
/// predecessor/successor handoff fields) or about to be, for as long as the
/// caller holds a live `qcode` referencing it.
#[inline]
pub fn node_at(cpu: u32, idx: u32) -> &'static QNode {
    &POOL[cpu as usize % MAX_CPUS].nodes[idx as usize % MAX_QNODES]
}

/// Log (at most once per pool, ever) that a node-pool allocation failed.
pub fn warn_exhausted(cpu: u32) {
    EXHAUSTION_WARNED.call_once(|| {
        crate::klog_warn!("qspinlock: node pool exhausted on cpu {}", cpu);
    });
}

/// Force the given CPU's pool back to empty, regardless of what any earlier
/// test in this process left allocated. Test-only: production code only
/// ever grows/shrinks the pool one node at a time via `get_qnode`/
/// `put_qnode`, in strict LIFO order.
#[cfg(test)]
pub(crate) fn reset_for_test(cpu: u32) {
    POOL[cpu as usize % MAX_CPUS]
        .node_idx
        .store(0, Ordering::Relaxed);
}
