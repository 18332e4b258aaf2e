//! `QNode` — one MCS wait-queue entry.
//!
//! Shape is the real-world MCS node from `gz-node-replication`'s `QLock`
//! (`next: AtomicPtr<QNode>`, `status: AtomicBool`) reconciled against the
//! original `struct qnode { wait, next }`: `wait` here plays the inverse
//! role of `gz-node-replication`'s `status` (true means "still waiting"
//! rather than "go ahead"), matching the original's polarity.

use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

/// One (CPU, nesting-depth) slot in a wait queue.
///
/// Exclusively owned by its creating CPU while queued; the only
/// cross-CPU writes are the predecessor publishing `next` and the
/// predecessor clearing `wait` on handoff.
#[repr(align(64))]
pub struct QNode {
    /// True while this node is still waiting for its predecessor to hand
    /// off the lock. Spun upon with acquire semantics; cleared by the
    /// predecessor with release semantics.
    pub wait: AtomicBool,
    /// Link to the node immediately behind this one in the queue, or null.
    pub next: AtomicPtr<QNode>,
}

impl QNode {
    pub const fn new() -> Self {
        Self {
            wait: AtomicBool::new(false),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Reset to the "about to be queued" state. Called by the owner right
    /// after allocating the node from the pool, before publishing its code.
    #[inline]
    pub fn reset(&self) {
        self.wait.store(true, Ordering::Relaxed);
        self.next.store(ptr::null_mut(), Ordering::Relaxed);
    }
}

impl Default for QNode {
    fn default() -> Self {
        Self::new()
    }
}
