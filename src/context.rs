//! The live per-test execution context.
//!
//! A `T` is created for each leaf execution and threads together everything
//! a hook or test body can touch: the variable store, the defer stack, the
//! reporting contract, and a deterministic per-leaf random source. It is
//! exclusively owned by the leaf's thread; nothing here is lock-protected
//! because nothing here is ever shared.

use std::fmt::{Arguments, Display};
use std::path::PathBuf;

use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::errors::SpecError;
use crate::reporter::Reporter;
use crate::spec::{NodeId, Spec};
use crate::value::Value;
use crate::variables::VariableStore;

// Using a concrete, seedable PRNG for determinism.
pub(crate) type SmallRng = Xoshiro256StarStar;

/// The handle passed to hooks, variable initializers, and test bodies.
pub struct T<'a> {
    pub(crate) spec: &'a Spec,
    pub(crate) store: VariableStore,
    /// LIFO stack of deferred closures, drained after the test body.
    pub(crate) defers: Vec<Box<dyn FnOnce()>>,
    reporter: &'a mut dyn Reporter,
    /// Deterministic per-leaf random source. Seeded from the run seed and
    /// the leaf index, so parallel leaves neither share nor interfere and a
    /// fixed seed reproduces the run exactly.
    pub random: SmallRng,
}

impl<'a> T<'a> {
    pub(crate) fn new(
        spec: &'a Spec,
        leaf: NodeId,
        reporter: &'a mut dyn Reporter,
        seed: u64,
    ) -> Self {
        Self {
            spec,
            store: VariableStore::new(spec.ancestor_chain(leaf)),
            defers: Vec::new(),
            reporter,
            random: SmallRng::seed_from_u64(seed),
        }
    }

    // ------------------------------------------------------------------------
    // Variable resolution
    // ------------------------------------------------------------------------

    /// Reads variable `name`, running its initializer on first reference.
    ///
    /// The value is memoized: within one execution the initializer runs at
    /// most once, and later reads (from any hook or the body) see the same
    /// value. Values are cloned out of the store; to mutate a fixture, read
    /// it, change it, and write it back with [`T::set_var`].
    pub fn try_var(&mut self, name: &str) -> Result<Value, SpecError> {
        if let Some(value) = self.store.cached(name) {
            return Ok(value.clone());
        }
        let init = self
            .store
            .lookup_initializer(self.spec, name)
            .ok_or_else(|| SpecError::undeclared_variable(name))?;
        let value = init(self);
        self.store.set(name, value.clone());
        Ok(value)
    }

    /// Reads variable `name`, aborting the leaf with a fatal report when no
    /// enclosing scope declares it.
    pub fn var(&mut self, name: &str) -> Value {
        match self.try_var(name) {
            Ok(value) => value,
            Err(err) => self.fatalf(format_args!("{}", err)),
        }
    }

    /// Binds or overwrites `name` for the remainder of this execution.
    ///
    /// The new value is visible to every subsequent read, including from
    /// hooks and body code that have not run yet, and short-circuits any
    /// declared initializer. This is the escape hatch for fixtures computed
    /// from intermediate results unavailable at declaration time; one
    /// initializer can also set several names to express a multi-value
    /// fixture.
    pub fn set_var(&mut self, name: &str, value: impl Into<Value>) {
        self.store.set(name, value.into());
    }

    // ------------------------------------------------------------------------
    // Defer stack
    // ------------------------------------------------------------------------

    /// Registers a closure to run when the execution unwinds.
    ///
    /// Defers run in strict reverse registration order, interleaved with
    /// around-hook teardowns staged on the same stack, and they run even
    /// when the test is skipped or fails fast.
    pub fn defer(&mut self, f: impl FnOnce() + 'static) {
        self.defers.push(Box::new(f));
    }

    // ------------------------------------------------------------------------
    // Randomness helpers
    // ------------------------------------------------------------------------

    pub fn random_u64(&mut self) -> u64 {
        self.random.next_u64()
    }

    /// A uniform value in `0..bound`. `bound` must be non-zero.
    pub fn random_below(&mut self, bound: u64) -> u64 {
        self.random.gen_range(0..bound)
    }

    /// A random alphanumeric string of the given length.
    pub fn random_string(&mut self, len: usize) -> String {
        (&mut self.random)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Reporting surface, forwarded to the underlying contract
    // ------------------------------------------------------------------------

    pub fn error(&mut self, args: &[&dyn Display]) {
        self.reporter.error(args);
    }

    pub fn errorf(&mut self, args: Arguments<'_>) {
        self.reporter.errorf(args);
    }

    pub fn fail(&mut self) {
        self.reporter.fail();
    }

    pub fn fail_now(&mut self) -> ! {
        self.reporter.fail_now()
    }

    pub fn failed(&self) -> bool {
        self.reporter.failed()
    }

    pub fn fatal(&mut self, args: &[&dyn Display]) -> ! {
        self.reporter.fatal(args)
    }

    pub fn fatalf(&mut self, args: Arguments<'_>) -> ! {
        self.reporter.fatalf(args)
    }

    pub fn helper(&mut self) {
        self.reporter.helper();
    }

    pub fn log(&mut self, args: &[&dyn Display]) {
        self.reporter.log(args);
    }

    pub fn logf(&mut self, args: Arguments<'_>) {
        self.reporter.logf(args);
    }

    pub fn name(&self) -> String {
        self.reporter.name()
    }

    pub fn skip(&mut self, args: &[&dyn Display]) -> ! {
        self.reporter.skip(args)
    }

    pub fn skipf(&mut self, args: Arguments<'_>) -> ! {
        self.reporter.skipf(args)
    }

    pub fn skip_now(&mut self) -> ! {
        self.reporter.skip_now()
    }

    pub fn skipped(&self) -> bool {
        self.reporter.skipped()
    }

    pub fn temp_dir(&mut self) -> PathBuf {
        self.reporter.temp_dir()
    }

    pub fn cleanup(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.reporter.cleanup(f);
    }

    /// Direct access to the underlying reporting contract.
    pub fn reporter(&mut self) -> &mut dyn Reporter {
        &mut *self.reporter
    }
}
