#![no_std]

pub mod arch;
pub mod cpu;
pub mod cpu_local;
pub mod klog;
pub mod lockword;
mod node;
pub mod once_lock;
pub mod percpu;
mod pool;
pub mod preempt;
mod qcode;
pub mod qspinlock;
mod slowpath;

#[cfg(feature = "stats")]
pub mod stats;


pub use arch::{Adapter, GenericAdapter, QuickOutcome, Selected, X86LargeAdapter, X86SmallAdapter};
pub use cpu::cpu_relax;
pub use cpu_local::{CacheAligned, CpuLocal, CpuPinned, CpuPinnedMut};
pub use klog::{klog_register_backend, KlogBackend};
pub use lockword::LockWord;
pub use once_lock::OnceLock;
pub use percpu::{cpu_id, register_cpu_id_fn, CpuIdFn, MAX_CPUS};
pub use pool::MAX_QNODES;
pub use preempt::{is_preemption_disabled, PreemptGuard};
pub use qspinlock::{
    qspin_is_locked, qspin_lock, qspin_trylock, qspin_unlock, QSpinlock, QSpinlockGuard,
};
