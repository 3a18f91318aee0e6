//! A standalone implementation of the reporting contract.
//!
//! `StubReporter` exists for two audiences: the engine's own test suite,
//! which needs to observe flag and log state after aborts, and downstream
//! users unit-testing helpers written against [`Reporter`] without a live
//! test runtime underneath.

use std::fmt::{Arguments, Display, Write as _};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;

use crate::abort::{abort, catch_abort, AbortKind};
use crate::reporter::{join_args, Reporter};

// Synthetic names are process-unique so two anonymous stubs never collide.
static STUB_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_synthetic_name() -> String {
    format!("stub-tb-{}", STUB_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Test-double for the [`Reporter`] contract.
///
/// All observable state is public: tests drive the stub through the trait
/// and then assert directly on `is_failed`, `is_skipped`, and `logs`.
///
/// # Examples
///
/// ```rust
/// use spectree::{catch_abort, Reporter, StubReporter};
///
/// let mut stub = StubReporter::new();
/// let outcome = catch_abort(|| stub.fail_now());
/// assert!(outcome.is_err());
/// assert!(stub.is_failed);
/// ```
#[derive(Default)]
pub struct StubReporter {
    pub is_failed: bool,
    pub is_skipped: bool,
    /// Accumulated log text; every log call appends one `\n`-terminated line.
    pub logs: String,
    /// Configured name. When unset, `name()` memoizes a synthetic one.
    pub stub_name: Option<String>,
    /// Configured temp-directory path returned verbatim by `temp_dir()`.
    pub stub_temp_dir: Option<PathBuf>,
    /// Optional real reporter to delegate `temp_dir()` to.
    pub delegate: Option<Box<dyn Reporter>>,
    cleanups: Vec<Box<dyn FnOnce() + Send>>,
    generated_name: OnceCell<String>,
}

impl StubReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every registered cleanup in reverse registration order.
    ///
    /// A cleanup that aborts its own unit of execution is contained here:
    /// the abort is swallowed and the remaining cleanups still run. `finish`
    /// itself never aborts the caller.
    pub fn finish(&mut self) {
        while let Some(cleanup) = self.cleanups.pop() {
            let _ = catch_abort(cleanup);
        }
    }

    fn append_line(&mut self, line: &str) {
        self.logs.push_str(line);
        self.logs.push('\n');
    }
}

impl Reporter for StubReporter {
    fn error(&mut self, args: &[&dyn Display]) {
        self.log(args);
        self.is_failed = true;
    }

    fn errorf(&mut self, args: Arguments<'_>) {
        self.logf(args);
        self.is_failed = true;
    }

    fn fail(&mut self) {
        self.is_failed = true;
    }

    fn fail_now(&mut self) -> ! {
        self.is_failed = true;
        abort(AbortKind::Failed)
    }

    fn failed(&self) -> bool {
        self.is_failed
    }

    fn fatal(&mut self, args: &[&dyn Display]) -> ! {
        self.log(args);
        self.fail_now()
    }

    fn fatalf(&mut self, args: Arguments<'_>) -> ! {
        self.logf(args);
        self.fail_now()
    }

    fn helper(&mut self) {}

    fn log(&mut self, args: &[&dyn Display]) {
        let line = join_args(args);
        self.append_line(&line);
    }

    fn logf(&mut self, args: Arguments<'_>) {
        let _ = writeln!(self.logs, "{}", args);
    }

    fn name(&self) -> String {
        if let Some(name) = &self.stub_name {
            return name.clone();
        }
        self.generated_name.get_or_init(next_synthetic_name).clone()
    }

    fn skip(&mut self, args: &[&dyn Display]) -> ! {
        if !args.is_empty() {
            self.log(args);
        }
        self.skip_now()
    }

    fn skipf(&mut self, args: Arguments<'_>) -> ! {
        self.logf(args);
        self.skip_now()
    }

    fn skip_now(&mut self) -> ! {
        self.is_skipped = true;
        abort(AbortKind::Skipped)
    }

    fn skipped(&self) -> bool {
        self.is_skipped
    }

    fn temp_dir(&mut self) -> PathBuf {
        if let Some(dir) = &self.stub_temp_dir {
            return dir.clone();
        }
        if let Some(delegate) = &mut self.delegate {
            return delegate.temp_dir();
        }
        std::env::temp_dir()
    }

    fn cleanup(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.cleanups.push(f);
    }
}
