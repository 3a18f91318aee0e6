//! Run orchestration and result reporting.
//!
//! `Spec::run` freezes the tree, walks its leaves in declaration order, and
//! executes each on its own thread so that an abort unwinds just that leaf.
//! Sequential runs join each thread before starting the next; parallel runs
//! spawn every leaf first and join in declaration order, so the result list
//! is stable either way. A panic that is not the abort signal is resumed in
//! the invoking thread untouched.

use std::fmt::{Arguments, Display, Write as _};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{env, fs, panic, process, thread};

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::abort::{abort, catch_abort, AbortKind};
use crate::composer;
use crate::errors::SpecError;
use crate::reporter::{join_args, Reporter};
use crate::spec::{NodeId, Spec};

// When no seed is configured, one is drawn per process so every run in the
// process can be reproduced from the single number in its summary.
static PROCESS_SEED: Lazy<u64> = Lazy::new(|| rand::random::<u64>());

// Distinct per-leaf streams derived from the run seed; the odd multiplier
// keeps neighboring indices far apart in seed space.
fn leaf_seed(run_seed: u64, index: u64) -> u64 {
    run_seed ^ (index + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

// ============================================================================
// CONFIGURATION
// ============================================================================

// Color constants for terminal output
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Configuration for executing a [`Spec`] and reporting its results.
pub struct RunConfig {
    /// Run sibling leaves concurrently. Off by default.
    pub parallel: bool,
    /// Seed for the per-leaf random sources. `None` uses the process seed.
    pub seed: Option<u64>,
    /// Case-insensitive substring filter on leaf paths; non-matching leaves
    /// are reported as skipped without executing.
    pub filter: Option<String>,
    pub use_colors: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            seed: None,
            filter: None,
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl RunConfig {
    /// Apply color formatting to text if colors are enabled.
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// The outcome of one leaf.
#[derive(Debug, Clone, Serialize)]
pub enum TestResult {
    /// Test passed successfully
    Pass { name: String },
    /// Test failed; `log` carries the accumulated report text
    Fail { name: String, log: String },
    /// Test was skipped, by a skip call or the name filter
    Skipped { name: String, log: String },
}

impl TestResult {
    pub fn name(&self) -> &str {
        match self {
            TestResult::Pass { name }
            | TestResult::Fail { name, .. }
            | TestResult::Skipped { name, .. } => name,
        }
    }
}

/// Everything one run produced: the seed it ran under and one result per
/// leaf, in declaration order.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub results: Vec<TestResult>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.count(|r| matches!(r, TestResult::Pass { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, TestResult::Fail { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, TestResult::Skipped { .. }))
    }

    /// True when no leaf failed. Skipped leaves do not count as failures.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn to_json(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn count(&self, pred: impl Fn(&TestResult) -> bool) -> usize {
        self.results.iter().filter(|r| pred(r)).count()
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

enum Planned {
    Filtered { name: String },
    Run { leaf: NodeId, name: String, index: u64 },
}

enum Pending<'scope> {
    Done(TestResult),
    Joining(thread::ScopedJoinHandle<'scope, TestResult>),
}

impl Spec {
    /// Executes every leaf and returns the collected results.
    ///
    /// The tree freezes on the first call; registering hooks, variables, or
    /// tests afterwards panics. Running again re-executes every leaf with
    /// fresh per-leaf state.
    pub fn run(&mut self, config: &RunConfig) -> RunSummary {
        self.seal();
        let seed = config.seed.unwrap_or(*PROCESS_SEED);

        // The leaf's declaration position seeds its random stream, so a
        // filtered run still sees the same values per leaf as a full run.
        let mut planned = Vec::new();
        for (position, leaf) in self.leaves().into_iter().enumerate() {
            let name = self.path_name(leaf);
            if let Some(filter) = &config.filter {
                if !name.to_lowercase().contains(&filter.to_lowercase()) {
                    planned.push(Planned::Filtered { name });
                    continue;
                }
            }
            planned.push(Planned::Run {
                leaf,
                name,
                index: position as u64,
            });
        }

        let spec: &Spec = self;
        let results = thread::scope(|scope| {
            let mut pending = Vec::with_capacity(planned.len());
            for item in &planned {
                match item {
                    Planned::Filtered { name } => pending.push(Pending::Done(
                        TestResult::Skipped {
                            name: name.clone(),
                            log: "filtered out by name\n".to_string(),
                        },
                    )),
                    Planned::Run { leaf, name, index } => {
                        let leaf = *leaf;
                        let leaf_rng_seed = leaf_seed(seed, *index);
                        let handle =
                            scope.spawn(move || execute_one(spec, leaf, name, leaf_rng_seed));
                        if config.parallel {
                            pending.push(Pending::Joining(handle));
                        } else {
                            pending.push(Pending::Done(join_leaf(handle)));
                        }
                    }
                }
            }
            pending
                .into_iter()
                .map(|p| match p {
                    Pending::Done(result) => result,
                    Pending::Joining(handle) => join_leaf(handle),
                })
                .collect()
        });

        RunSummary { seed, results }
    }
}

// One leaf, on the current (spawned) thread: fresh reporter, composed hook
// chain, cleanups, then the disposition read from the reporter's flags.
fn execute_one(spec: &Spec, leaf: NodeId, name: &str, seed: u64) -> TestResult {
    let mut reporter = RunReporter::new(name.to_string());
    composer::execute_leaf(spec, leaf, &mut reporter, seed);
    reporter.finish();
    if reporter.is_skipped {
        TestResult::Skipped {
            name: name.to_string(),
            log: reporter.logs,
        }
    } else if reporter.is_failed {
        TestResult::Fail {
            name: name.to_string(),
            log: reporter.logs,
        }
    } else {
        TestResult::Pass {
            name: name.to_string(),
        }
    }
}

fn join_leaf(handle: thread::ScopedJoinHandle<'_, TestResult>) -> TestResult {
    match handle.join() {
        Ok(result) => result,
        // A genuine abnormal termination of the leaf thread, not an abort:
        // propagate it untouched.
        Err(payload) => panic::resume_unwind(payload),
    }
}

// ============================================================================
// RUN REPORTER
// ============================================================================

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The conforming [`Reporter`] the runner records each leaf with.
///
/// Unlike [`StubReporter`](crate::StubReporter) it has no stubbed knobs:
/// `name()` is the leaf's path and `temp_dir()` creates a real per-call
/// directory that a registered cleanup removes when the leaf finishes.
#[derive(Default)]
pub struct RunReporter {
    test_name: String,
    pub is_failed: bool,
    pub is_skipped: bool,
    pub logs: String,
    cleanups: Vec<Box<dyn FnOnce() + Send>>,
}

impl RunReporter {
    pub fn new(name: String) -> Self {
        Self {
            test_name: name,
            ..Self::default()
        }
    }

    /// Runs every registered cleanup, LIFO, containing aborts so one
    /// aborting cleanup cannot starve the rest.
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

impl Reporter for RunReporter {
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
        self.test_name.clone()
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
        let unique = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let sanitized: String = self
            .test_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        let dir = env::temp_dir().join(format!(
            "spectree-{}-{}-{}",
            sanitized,
            process::id(),
            unique
        ));
        if let Err(err) = fs::create_dir_all(&dir) {
            self.fatalf(format_args!(
                "failed to create temp dir {}: {}",
                dir.display(),
                err
            ));
        }
        let created = dir.clone();
        self.cleanup(Box::new(move || {
            let _ = fs::remove_dir_all(&created);
        }));
        dir
    }

    fn cleanup(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.cleanups.push(f);
    }
}

// ============================================================================
// REPORTING
// ============================================================================

/// Print per-test lines and a summary with colored output.
pub fn report_results(summary: &RunSummary, config: &RunConfig) {
    for result in &summary.results {
        match result {
            TestResult::Pass { name } => {
                println!("{}: {}", config.colorize("PASS", GREEN), name)
            }
            TestResult::Fail { name, log } => {
                eprintln!("{}: {}", config.colorize("FAIL", RED), name);
                for line in log.lines() {
                    eprintln!("  {}", line);
                }
            }
            TestResult::Skipped { name, log } => {
                let reason = log.lines().next().unwrap_or("");
                println!("{}: {} ({})", config.colorize("SKIP", YELLOW), name, reason)
            }
        }
    }

    println!(
        "\nTest summary: total {}, {} {}, {} {}, {} {} (seed {})",
        summary.results.len(),
        config.colorize("passed", GREEN),
        summary.passed(),
        config.colorize("failed", RED),
        summary.failed(),
        config.colorize("skipped", YELLOW),
        summary.skipped(),
        summary.seed,
    );

    if summary.failed() > 0 {
        eprintln!("\nFailed tests:");
        for result in &summary.results {
            if let TestResult::Fail { name, .. } = result {
                eprintln!("  - {}", name);
            }
        }
    }
}
