//! The test-reporting contract.
//!
//! Everything the execution engine needs from a host test runtime is captured
//! by the [`Reporter`] trait: failure and skip flags, log accumulation, the
//! abort-style early exits, cleanup registration, and a temp-directory
//! facility. The engine depends only on this capability set, so a stub
//! ([`crate::StubReporter`]), the built-in run recorder
//! ([`crate::RunReporter`]), or any other conforming implementation are
//! interchangeable.

use std::fmt::{Arguments, Display};
use std::path::PathBuf;

/// The capability set consumed and re-implemented by this crate.
///
/// Positional methods (`error`, `fatal`, `log`, `skip`) take a slice of
/// displayable arguments and join them with single spaces, each call ending
/// the line; the `*f` variants take preformatted [`Arguments`] from
/// `format_args!`. Methods returning `!` abort the current unit of execution
/// via [`crate::abort`] and never return; the type system makes code after
/// such a call unreachable.
///
/// `Send` is a supertrait because each leaf executes on its own thread and
/// the reporter travels with it.
pub trait Reporter: Send {
    /// Logs the arguments and marks the reporter failed. Execution continues.
    fn error(&mut self, args: &[&dyn Display]);

    /// `format_args!` variant of [`Reporter::error`].
    fn errorf(&mut self, args: Arguments<'_>);

    /// Marks the reporter failed without logging.
    fn fail(&mut self);

    /// Marks the reporter failed and aborts the current unit of execution.
    fn fail_now(&mut self) -> !;

    /// Reads the failed flag.
    fn failed(&self) -> bool;

    /// Logs the arguments, marks the reporter failed, and aborts.
    fn fatal(&mut self, args: &[&dyn Display]) -> !;

    /// `format_args!` variant of [`Reporter::fatal`].
    fn fatalf(&mut self, args: Arguments<'_>) -> !;

    /// Marker for diagnostic stack-trace trimming. A no-op here; kept for
    /// interface compatibility with host runtimes that use it.
    fn helper(&mut self);

    /// Appends one space-joined line to the log. An empty slice still
    /// appends an empty line.
    fn log(&mut self, args: &[&dyn Display]);

    /// `format_args!` variant of [`Reporter::log`].
    fn logf(&mut self, args: Arguments<'_>);

    /// The name of the running test.
    fn name(&self) -> String;

    /// Logs the arguments (when any are given), marks the reporter skipped,
    /// and aborts.
    fn skip(&mut self, args: &[&dyn Display]) -> !;

    /// `format_args!` variant of [`Reporter::skip`].
    fn skipf(&mut self, args: Arguments<'_>) -> !;

    /// Marks the reporter skipped and aborts without logging.
    fn skip_now(&mut self) -> !;

    /// Reads the skipped flag.
    fn skipped(&self) -> bool;

    /// A directory for the test to place temporary files in.
    fn temp_dir(&mut self) -> PathBuf;

    /// Registers a closure to run when the test finishes. Cleanups run in
    /// reverse registration order.
    fn cleanup(&mut self, f: Box<dyn FnOnce() + Send>);
}

/// Space-joins positional log arguments, the shared convention behind
/// `log`, `error`, `fatal`, and `skip`.
pub(crate) fn join_args(args: &[&dyn Display]) -> String {
    let mut line = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&arg.to_string());
    }
    line
}
