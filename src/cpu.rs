//! Architecture pause hint.
//!
//! Everything else a kernel normally keeps in a `cpu` module (GDT/IDT setup,
//! MSRs, `cli`/`sti`) has no call site in this crate: the lock never
//! touches interrupt state, and the only hardware instruction the slow path
//! ever issues while spinning is the unprivileged pause hint.

use core::hint::spin_loop;

/// Hardware pause/yield hint used inside every busy-wait loop in this crate.
///
/// On x86 this compiles to `pause`; on aarch64, `yield`. `core::hint::spin_loop`
/// already does the right thing per target, so there is no architecture
/// adapter for this — unlike the lock word, `cpu_relax` needs no subword
/// tricks to specialize.
#[inline(always)]
pub fn cpu_relax() {
    spin_loop();
}
