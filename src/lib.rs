//! Spectree: a nested test-specification runtime.
//!
//! Engineers declare a tree of contexts, attach ordered before/after/around
//! hooks and lazily-computed named variables to any scope, and register leaf
//! tests. Running the tree executes every leaf with a deterministically
//! ordered composition of its inherited hooks and a fresh, memoizing
//! variable store, on its own thread, so a fatal or skip unwinds one leaf
//! without touching its siblings or the process.
//!
//! The engine depends only on the [`Reporter`] contract for pass/fail/skip
//! bookkeeping; [`StubReporter`] is a standalone implementation of that
//! contract for testing code that consumes it.

pub use crate::abort::{catch_abort, Abort, AbortKind};
pub use crate::context::T;
pub use crate::errors::SpecError;
pub use crate::reporter::Reporter;
pub use crate::runner::{report_results, RunConfig, RunReporter, RunSummary, TestResult};
pub use crate::spec::{Scope, Spec, Teardown};
pub use crate::stub::StubReporter;
pub use crate::value::Value;

pub mod abort;
pub mod context;
pub mod errors;
pub mod reporter;
pub mod runner;
pub mod spec;
pub mod stub;
pub mod value;

mod composer;
mod variables;
