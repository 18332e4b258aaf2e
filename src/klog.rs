//! Diagnostic sink for this crate's rare warning conditions (pool
//! exhaustion, today).
//!
//! There is no early-boot fallback here and no log levels: unlike the
//! teacher's `klog.rs`, which is the kernel's one general-purpose logging
//! facility and so needs a COM1 bring-up path and a level filter, this crate
//! only ever emits one kind of diagnostic, and only when something has
//! already gone wrong with this crate's own bookkeeping. A host that wants
//! these messages registers a backend; a host that doesn't, doesn't pay for
//! one. The dispatch mechanism — a `KlogBackend` function pointer stashed in
//! an `AtomicPtr<()>` and `transmute`d back out on the hot path — is carried
//! over unchanged from the teacher.

use core::fmt;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Signature of a klog backend. The backend must write the formatted text
/// and a trailing newline, atomically with respect to other CPUs.
pub type KlogBackend = fn(fmt::Arguments<'_>);

/// Stored as a raw pointer; `null` means "no backend registered, drop the
/// message".
static BACKEND: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

/// Register the function this crate's diagnostics are sent through.
///
/// Calling this more than once replaces the previous backend.
pub fn klog_register_backend(backend: KlogBackend) {
    BACKEND.store(backend as *mut (), Ordering::Release);
}

/// Emit a diagnostic line. A no-op if no backend is registered.
pub fn warn_args(args: fmt::Arguments<'_>) {
    let ptr = BACKEND.load(Ordering::Acquire);
    if ptr.is_null() {
        return;
    }
    // SAFETY: `klog_register_backend` only stores valid `KlogBackend` fn
    // pointers, which are the same size as `*mut ()` on all supported
    // targets.
    let backend: KlogBackend = unsafe { core::mem::transmute(ptr) };
    backend(args);
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::warn_args(::core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_backend(_args: fmt::Arguments<'_>) {
        CALLS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn dispatch_reaches_registered_backend() {
        let before = CALLS.load(Ordering::Relaxed);
        klog_register_backend(counting_backend);
        klog_warn!("pool exhausted on cpu {}", 3);
        assert_eq!(CALLS.load(Ordering::Relaxed), before + 1);
    }
}
