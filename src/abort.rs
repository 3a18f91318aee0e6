//! Abort-without-process-exit.
//!
//! `fail_now`, `fatal`, and the skip family must stop the current unit of
//! execution without returning control to the caller and without taking the
//! process down with it. The mechanism is a dedicated panic payload: calling
//! [`abort`] unwinds the current thread of control with an [`Abort`] marker,
//! and [`catch_abort`] catches exactly that marker at the supervising frame.
//! Any other panic payload is re-raised untouched, so a genuine failure of
//! the executing thread is never mistaken for an orderly abort.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// Why the unit of execution was aborted. Carried for diagnostics only; the
/// pass/skip disposition of a leaf is read from its reporter's flags, not
/// from the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    Failed,
    Skipped,
}

/// The unwind marker raised by [`abort`] and caught by [`catch_abort`].
#[derive(Debug, Clone, Copy)]
pub struct Abort {
    pub kind: AbortKind,
}

/// Aborts the current unit of execution. Never returns.
pub fn abort(kind: AbortKind) -> ! {
    silence_abort_panics();
    panic::panic_any(Abort { kind })
}

/// Runs `f`, containing an [`Abort`] raised inside it.
///
/// Returns `Ok` with the closure's result when it ran to completion, and
/// `Err` with the abort marker when the unit was aborted. Every other panic
/// payload is resumed as-is.
pub fn catch_abort<R>(f: impl FnOnce() -> R) -> Result<R, Abort> {
    silence_abort_panics();
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<Abort>() {
            Ok(signal) => Err(*signal),
            Err(other) => panic::resume_unwind(other),
        },
    }
}

// The default panic hook prints a backtrace banner for every unwind, which
// would turn each skip or fatal into console noise. Wrap the installed hook
// once so Abort payloads stay silent; everything else still reaches the
// previous hook.
fn silence_abort_panics() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().downcast_ref::<Abort>().is_none() {
                previous(info);
            }
        }));
    });
}
