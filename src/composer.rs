//! Hook-chain assembly and leaf execution.
//!
//! For one leaf, execution is an explicit walk over the frozen ancestor
//! chain rather than recursive dispatch, so the ordering contract stays
//! auditable in one place:
//!
//! 1. Walk root to leaf. At each scope, run its before hooks in
//!    registration order, then its around hooks; every around's teardown is
//!    pushed onto the execution's single defer stack at the moment its setup
//!    half completes.
//! 2. Run the leaf's test body.
//! 3. Drain the defer stack LIFO. Teardowns and `T::defer` registrations
//!    share that stack, so a defer fires at the unwind of the innermost unit
//!    of work that was active when it was registered, strictly by recency.
//! 4. Run after hooks leaf to root.
//!
//! Early termination (skip, fail-fast, or an abort raised anywhere in a
//! forward step) skips only the remaining forward steps: staged teardowns,
//! the defer stack, and the whole after chain still run. Each unwind step is
//! abort-contained individually, so one aborting teardown cannot starve the
//! rest. A panic that is not the abort signal is re-raised untouched.

use crate::abort::catch_abort;
use crate::context::T;
use crate::reporter::Reporter;
use crate::spec::{NodeId, Spec};

/// Runs one leaf to completion against the given reporter.
///
/// The caller decides the threading model; this function is the single
/// supervising frame for the leaf's unit of execution.
pub(crate) fn execute_leaf(spec: &Spec, leaf: NodeId, reporter: &mut dyn Reporter, seed: u64) {
    let chain = spec.ancestor_chain(leaf);
    let mut t = T::new(spec, leaf, reporter, seed);

    let mut aborted = false;

    // Forward half: befores and around setups, root to leaf, then the body.
    'forward: for &node in &chain {
        let scope = spec.node(node);
        for hook in &scope.befores {
            if catch_abort(|| hook(&mut t)).is_err() {
                aborted = true;
                break 'forward;
            }
        }
        for hook in &scope.arounds {
            match catch_abort(|| hook(&mut t)) {
                Ok(teardown) => t.defers.push(teardown),
                Err(_) => {
                    aborted = true;
                    break 'forward;
                }
            }
        }
    }

    if !aborted {
        if let Some(body) = &spec.node(leaf).body {
            let _ = catch_abort(|| body(&mut t));
        }
    }

    drain_defers(&mut t);

    // After hooks, leaf to root, regardless of how the forward half ended.
    for &node in chain.iter().rev() {
        for hook in &spec.node(node).afters {
            let _ = catch_abort(|| hook(&mut t));
        }
    }

    // After hooks may themselves defer; those must not be lost.
    drain_defers(&mut t);
}

fn drain_defers(t: &mut T<'_>) {
    // Pop-loop rather than iteration: a defer may register further defers
    // while the stack unwinds, and those run too, still LIFO.
    while let Some(deferred) = t.defers.pop() {
        let _ = catch_abort(deferred);
    }
}
