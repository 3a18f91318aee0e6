//! Behavior of the standalone reporting-contract double.
//!
//! These mirror the contract the execution engine relies on: flag setting,
//! exact log formatting, LIFO cleanups, and the abort calls stopping the
//! current unit of execution without touching the process.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use spectree::{catch_abort, Reporter, RunReporter, StubReporter};

#[test]
fn cleanup_then_finish_runs_lifo() {
    let mut stub = StubReporter::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 1..=3 {
        let order = order.clone();
        stub.cleanup(Box::new(move || order.lock().unwrap().push(i)));
    }
    assert!(order.lock().unwrap().is_empty());
    stub.finish();
    assert_eq!(*order.lock().unwrap(), vec![3, 2, 1]);
}

#[test]
fn finish_survives_an_aborting_cleanup() {
    let mut stub = StubReporter::new();
    let count = Arc::new(AtomicUsize::new(0));
    // Registered first, so it runs last: the abort it raises must not stop
    // finish from having run the other cleanups already.
    stub.cleanup(Box::new(|| {
        let mut inner = StubReporter::new();
        inner.fail_now();
    }));
    for _ in 0..2 {
        let count = count.clone();
        stub.cleanup(Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);
    stub.finish();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn error_sets_failed_and_logs_space_joined() {
    let mut stub = StubReporter::new();
    assert!(!stub.is_failed);
    stub.error(&[&"arg1", &"arg2", &"arg3"]);
    assert!(stub.is_failed);
    assert!(stub.logs.contains("arg1 arg2 arg3\n"));
}

#[test]
fn errorf_sets_failed_and_formats() {
    let mut stub = StubReporter::new();
    assert!(!stub.is_failed);
    stub.errorf(format_args!("{} {:?} {}", "arg1", "arg2", "arg3"));
    assert!(stub.is_failed);
    assert!(stub.logs.contains("arg1 \"arg2\" arg3\n"));
}

#[test]
fn fail_sets_the_flag_without_aborting() {
    let mut stub = StubReporter::new();
    assert!(!stub.failed());
    stub.fail();
    assert!(stub.failed());
}

#[test]
#[allow(unreachable_code)]
fn fail_now_aborts_the_unit_of_execution() {
    let mut stub = StubReporter::new();
    let mut ran = false;
    let outcome = catch_abort(|| {
        stub.fail_now();
        ran = true;
    });
    assert!(outcome.is_err());
    assert!(!ran);
    assert!(stub.is_failed);
}

#[test]
fn fatal_logs_before_aborting() {
    let mut stub = StubReporter::new();
    stub.log(&[&"-"]);
    let outcome = catch_abort(|| stub.fatal(&[&"arg1", &"arg2", &"arg3"]));
    assert!(outcome.is_err());
    assert!(stub.is_failed);
    assert_eq!(stub.logs, "-\narg1 arg2 arg3\n");
}

#[test]
fn fatalf_logs_before_aborting() {
    let mut stub = StubReporter::new();
    stub.log(&[&"-"]);
    let outcome = catch_abort(|| stub.fatalf(format_args!("{} {:?} {}", "arg1", "arg2", "arg3")));
    assert!(outcome.is_err());
    assert!(stub.is_failed);
    assert_eq!(stub.logs, "-\narg1 \"arg2\" arg3\n");
}

#[test]
fn helper_is_a_no_op() {
    let mut stub = StubReporter::new();
    stub.helper();
    assert!(!stub.is_failed);
    assert!(stub.logs.is_empty());
}

#[test]
fn log_appends_one_line_per_call() {
    let mut stub = StubReporter::new();

    stub.log(&[]); // empty log line
    assert_eq!(stub.logs, "\n");

    stub.log(&[&"foo", &"bar", &"baz"]);
    assert!(stub.logs.contains("\nfoo bar baz\n"));

    stub.log(&[&"bar", &"baz", &"foo"]);
    assert!(stub.logs.contains("\nfoo bar baz\nbar baz foo\n"));
}

#[test]
fn logf_formats_exactly() {
    let mut stub = StubReporter::new();

    stub.logf(format_args!("{} {} {:?}", "arg1", "arg2", "arg3"));
    assert_eq!(stub.logs, "arg1 arg2 \"arg3\"\n");

    stub.logf(format_args!("{} {:?} {}", "arg4", "arg5", "arg6"));
    assert_eq!(stub.logs, "arg1 arg2 \"arg3\"\narg4 \"arg5\" arg6\n");
}

#[test]
fn name_uses_the_configured_value() {
    let mut stub = StubReporter::new();
    stub.stub_name = Some("my-test".to_string());
    assert_eq!(stub.name(), "my-test");
}

#[test]
fn name_synthesizes_a_stable_identifier() {
    let stub = StubReporter::new();
    let first = stub.name();
    assert!(!first.is_empty());
    assert_eq!(stub.name(), first);

    let other = StubReporter::new();
    assert_ne!(other.name(), first);
}

#[test]
fn skip_marks_skipped_and_aborts() {
    let mut stub = StubReporter::new();
    assert!(!stub.skipped());
    let outcome = catch_abort(|| stub.skip(&[]));
    assert!(outcome.is_err());
    assert!(stub.skipped());
    assert!(!stub.is_failed);
    assert!(stub.logs.is_empty());
}

#[test]
fn skip_with_args_logs_them() {
    let mut stub = StubReporter::new();
    let outcome = catch_abort(|| stub.skip(&[&"Hello", &"world!"]));
    assert!(outcome.is_err());
    assert!(stub.skipped());
    assert!(stub.logs.contains("Hello world!\n"));
}

#[test]
fn skipf_formats_and_aborts() {
    let mut stub = StubReporter::new();
    let outcome = catch_abort(|| stub.skipf(format_args!("{}", "arg42")));
    assert!(outcome.is_err());
    assert!(stub.skipped());
    assert!(stub.logs.contains("arg42\n"));
}

#[test]
fn skip_now_marks_skipped_and_aborts() {
    let mut stub = StubReporter::new();
    assert!(!stub.skipped());
    let outcome = catch_abort(|| stub.skip_now());
    assert!(outcome.is_err());
    assert!(stub.skipped());
}

#[test]
fn temp_dir_prefers_the_stub_value() {
    let mut stub = StubReporter::new();
    stub.stub_temp_dir = Some(PathBuf::from("/stubbed/path"));
    assert_eq!(stub.temp_dir(), PathBuf::from("/stubbed/path"));
}

#[test]
fn temp_dir_falls_back_to_the_process_temp() {
    let mut stub = StubReporter::new();
    assert_eq!(stub.temp_dir(), std::env::temp_dir());
}

#[test]
fn temp_dir_delegates_to_an_attached_reporter() {
    let mut stub = StubReporter::new();
    stub.delegate = Some(Box::new(RunReporter::new("delegated-leaf".to_string())));
    let dir = stub.temp_dir();
    let meta = std::fs::metadata(&dir).expect("delegate should have created the directory");
    assert!(meta.is_dir());
    let _ = std::fs::remove_dir_all(&dir);
}
