//! End-to-end ordering guarantees of the composed hook chain.

use std::sync::{Arc, Mutex};

use spectree::{RunConfig, Spec, Teardown, Value, T};

// Before hooks run outer-to-inner, an around's teardown and every defer
// share one LIFO stack, and after hooks close the execution. The recorded
// sequence pins the whole contract at once.
#[test]
fn hooks_teardowns_and_defers_unwind_in_contract_order() {
    let res: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));
    let mut spec = Spec::new("ordering");

    let outer_res = res.clone();
    spec.context("outer", |s| {
        let r = outer_res.clone();
        s.before(move |_t: &mut T| r.lock().unwrap().push(0));

        let r = outer_res.clone();
        s.after(move |_t: &mut T| r.lock().unwrap().push(-1));

        let middle_res = outer_res.clone();
        s.context("middle", |s| {
            let r = middle_res.clone();
            s.around(move |_t: &mut T| -> Teardown {
                r.lock().unwrap().push(1);
                let r = r.clone();
                Box::new(move || r.lock().unwrap().push(-2))
            });

            let inner_res = middle_res.clone();
            s.context("inner", |s| {
                let r = inner_res.clone();
                s.var("with_defer", move |t: &mut T| {
                    // Reading this variable hands its defer to the one
                    // per-execution stack, so it unwinds with the rest.
                    let r = r.clone();
                    t.defer(move || r.lock().unwrap().push(-3));
                    Value::from(42)
                });

                s.before(|t: &mut T| {
                    assert_eq!(t.var("with_defer"), Value::from(42));
                });

                let r = inner_res.clone();
                s.test("records the unwind", move |t: &mut T| {
                    let r = r.clone();
                    t.defer(move || r.lock().unwrap().push(-4));
                });
            });
        });
    });

    let summary = spec.run(&RunConfig::default());
    assert!(summary.is_success());
    assert_eq!(*res.lock().unwrap(), vec![0, 1, -4, -3, -2, -1]);
}

#[test]
fn defers_run_even_when_the_test_skips_early() {
    let ran = Arc::new(Mutex::new(false));
    let mut spec = Spec::new("early-exit");
    {
        let ran = ran.clone();
        spec.before(move |t: &mut T| {
            let ran = ran.clone();
            t.defer(move || *ran.lock().unwrap() = true);
        });
    }
    spec.test("stops early", |t: &mut T| t.skip(&[&"please stop early"]));

    let summary = spec.run(&RunConfig::default());
    assert!(*ran.lock().unwrap());
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.failed(), 0);
}

#[test]
fn variables_can_be_defined_during_the_run() {
    let mut spec = Spec::new("runtime-define");
    spec.var("n_original", |t: &mut T| {
        Value::from(t.random_below(42) as i64)
    });
    spec.var("m_original", |t: &mut T| {
        Value::from((t.random_below(42) + 100) as i64)
    });
    // One helper produces two values; both are bound at runtime.
    spec.before(|t: &mut T| {
        let n = t.var("n_original");
        let m = t.var("m_original");
        t.set_var("n", n);
        t.set_var("m", m);
    });
    spec.test("runtime bindings are visible", |t: &mut T| {
        assert_eq!(t.var("n"), t.var("n_original"));
        assert_eq!(t.var("m"), t.var("m_original"));
    });
    assert!(spec.run(&RunConfig::default()).is_success());
}

#[test]
fn runtime_overrides_accumulate_across_before_hooks() {
    let mut spec = Spec::new("runtime-update");
    spec.var("x", |_t: &mut T| Value::from(7));
    for _ in 0..2 {
        spec.before(|t: &mut T| {
            let x = t.var("x").as_number().expect("x is a number");
            t.set_var("x", x + 1.0);
        });
    }
    spec.test("both overrides applied", |t: &mut T| {
        assert_eq!(t.var("x"), Value::from(9));
    });
    assert!(spec.run(&RunConfig::default()).is_success());
}
