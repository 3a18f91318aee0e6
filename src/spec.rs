//! The specification tree and its declarative builder.
//!
//! A [`Spec`] is an arena of [`SpecNode`]s: every node is either a branch (a
//! context contributing hooks and variable declarations to everything below
//! it) or a leaf (a test body). The tree is built up front by nested
//! registration calls and frozen once the first run begins; execution never
//! mutates it, which is what lets sibling leaves run on concurrent threads
//! against one shared `&Spec`.

use std::sync::Arc;

use crate::context::T;
use crate::value::Value;

// ============================================================================
// HOOK AND INITIALIZER CLOSURE TYPES
// ============================================================================

/// A before or after hook.
pub(crate) type HookFn = Arc<dyn Fn(&mut T<'_>) + Send + Sync>;

/// The teardown closure returned by an around hook.
pub type Teardown = Box<dyn FnOnce()>;

/// An around hook: runs its setup half, returns the teardown to unwind later.
pub(crate) type AroundFn = Arc<dyn Fn(&mut T<'_>) -> Teardown + Send + Sync>;

/// A leaf test body.
pub(crate) type TestFn = Arc<dyn Fn(&mut T<'_>) + Send + Sync>;

/// A lazy variable initializer.
pub(crate) type VarInit = Arc<dyn Fn(&mut T<'_>) -> Value + Send + Sync>;

// ============================================================================
// ARENA
// ============================================================================

/// Index of a node in the spec arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub(crate) usize);

/// One scope in the context tree.
///
/// Invariant: a node is a leaf (has `body`, never children) or a branch
/// (children, no body). The builder API makes the invariant structural:
/// only branches hand out a [`Scope`], and `test` never does.
pub(crate) struct SpecNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub befores: Vec<HookFn>,
    pub afters: Vec<HookFn>,
    pub arounds: Vec<AroundFn>,
    /// Variable declarations in registration order; names unique per node.
    pub vars: Vec<(String, VarInit)>,
    pub body: Option<TestFn>,
}

impl SpecNode {
    fn new(name: &str, parent: Option<NodeId>, body: Option<TestFn>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            befores: Vec::new(),
            afters: Vec::new(),
            arounds: Vec::new(),
            vars: Vec::new(),
            body,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.body.is_some()
    }
}

/// A test specification: the frozen tree plus the registration surface.
///
/// # Examples
///
/// ```rust
/// use spectree::{RunConfig, Spec, Value, T};
///
/// let mut spec = Spec::new("stack");
/// spec.context("when empty", |s| {
///     s.var("stack", |_t: &mut T| Value::List(Vec::new()));
///     s.test("it holds nothing", |t: &mut T| {
///         let stack = t.var("stack");
///         assert_eq!(stack.as_list().map(<[_]>::len), Some(0));
///     });
/// });
/// let summary = spec.run(&RunConfig::default());
/// assert!(summary.is_success());
/// ```
pub struct Spec {
    nodes: Vec<SpecNode>,
    sealed: bool,
}

impl Spec {
    /// Creates a specification with a named root context.
    pub fn new(name: &str) -> Self {
        Self {
            nodes: vec![SpecNode::new(name, None, None)],
            sealed: false,
        }
    }

    const ROOT: NodeId = NodeId(0);

    // ------------------------------------------------------------------------
    // Root-level registration: mirrors Scope on the root node.
    // ------------------------------------------------------------------------

    /// Opens a nested context under the root. See [`Scope::context`].
    pub fn context(&mut self, name: &str, build: impl FnOnce(&mut Scope<'_>)) {
        self.root_scope().context(name, build);
    }

    /// Registers a leaf test under the root. See [`Scope::test`].
    pub fn test(&mut self, name: &str, body: impl Fn(&mut T<'_>) + Send + Sync + 'static) {
        self.root_scope().test(name, body);
    }

    /// Declares a lazy variable on the root. See [`Scope::var`].
    pub fn var(&mut self, name: &str, init: impl Fn(&mut T<'_>) -> Value + Send + Sync + 'static) {
        self.root_scope().var(name, init);
    }

    /// Registers a before hook on the root. See [`Scope::before`].
    pub fn before(&mut self, hook: impl Fn(&mut T<'_>) + Send + Sync + 'static) {
        self.root_scope().before(hook);
    }

    /// Registers an after hook on the root. See [`Scope::after`].
    pub fn after(&mut self, hook: impl Fn(&mut T<'_>) + Send + Sync + 'static) {
        self.root_scope().after(hook);
    }

    /// Registers an around hook on the root. See [`Scope::around`].
    pub fn around(&mut self, hook: impl Fn(&mut T<'_>) -> Teardown + Send + Sync + 'static) {
        self.root_scope().around(hook);
    }

    fn root_scope(&mut self) -> Scope<'_> {
        Scope {
            spec: self,
            node: Self::ROOT,
        }
    }

    // ------------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------------

    pub(crate) fn node(&self, id: NodeId) -> &SpecNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SpecNode {
        &mut self.nodes[id.0]
    }

    fn add_child(&mut self, parent: NodeId, name: &str, body: Option<TestFn>) -> NodeId {
        self.assert_open("register a context or test");
        let id = NodeId(self.nodes.len());
        self.nodes.push(SpecNode::new(name, Some(parent), body));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn assert_open(&self, action: &str) {
        if self.sealed {
            panic!("spec is frozen: cannot {action} after the first run has started");
        }
    }

    /// Freezes the tree. Registration afterwards panics.
    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    /// All leaves in depth-first declaration order.
    pub(crate) fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(Self::ROOT, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.is_leaf() {
            out.push(id);
            return;
        }
        for &child in &node.children {
            self.collect_leaves(child, out);
        }
    }

    /// The ancestor chain of a node, root first, the node itself last.
    pub(crate) fn ancestor_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.node(node).parent;
        }
        chain.reverse();
        chain
    }

    /// Diagnostic path of a node: ancestor names joined with `/`, empty
    /// segments skipped.
    pub(crate) fn path_name(&self, id: NodeId) -> String {
        let names: Vec<&str> = self
            .ancestor_chain(id)
            .into_iter()
            .map(|node| self.node(node).name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        names.join("/")
    }
}

// ============================================================================
// BUILDER SCOPE
// ============================================================================

/// Registration handle for one branch node, passed to `context` closures.
pub struct Scope<'a> {
    spec: &'a mut Spec,
    node: NodeId,
}

impl Scope<'_> {
    /// Opens a nested context and runs `build` against it immediately.
    /// Contexts contribute hooks and variables to every leaf below them but
    /// are never executed themselves.
    pub fn context(&mut self, name: &str, build: impl FnOnce(&mut Scope<'_>)) {
        let child = self.spec.add_child(self.node, name, None);
        let mut scope = Scope {
            spec: &mut *self.spec,
            node: child,
        };
        build(&mut scope);
    }

    /// Registers a leaf test. The body runs once per execution with the
    /// composed hook chain of every enclosing context.
    pub fn test(&mut self, name: &str, body: impl Fn(&mut T<'_>) + Send + Sync + 'static) {
        self.spec.add_child(self.node, name, Some(Arc::new(body)));
    }

    /// Declares a lazily-computed variable on this scope.
    ///
    /// The initializer runs at most once per leaf execution, on first read,
    /// with the live [`T`]. A declaration shadows any ancestor declaration
    /// of the same name. Re-declaring a name on the same scope panics: that
    /// is a build-time programmer error, not a runtime condition.
    pub fn var(&mut self, name: &str, init: impl Fn(&mut T<'_>) -> Value + Send + Sync + 'static) {
        self.spec.assert_open("declare a variable");
        let node = self.spec.node_mut(self.node);
        if node.vars.iter().any(|(existing, _)| existing == name) {
            panic!(
                "variable `{name}` is already declared on context `{}`",
                node.name
            );
        }
        node.vars.push((name.to_string(), Arc::new(init)));
    }

    /// Registers a hook that runs before every leaf below this scope, in
    /// root-to-leaf order.
    pub fn before(&mut self, hook: impl Fn(&mut T<'_>) + Send + Sync + 'static) {
        self.spec.assert_open("register a before hook");
        self.spec.node_mut(self.node).befores.push(Arc::new(hook));
    }

    /// Registers a hook that runs after every leaf below this scope, in
    /// leaf-to-root order.
    pub fn after(&mut self, hook: impl Fn(&mut T<'_>) + Send + Sync + 'static) {
        self.spec.assert_open("register an after hook");
        self.spec.node_mut(self.node).afters.push(Arc::new(hook));
    }

    /// Registers a wrapping hook: the closure runs before the test and the
    /// [`Teardown`] it returns unwinds after it, innermost first.
    pub fn around(&mut self, hook: impl Fn(&mut T<'_>) -> Teardown + Send + Sync + 'static) {
        self.spec.assert_open("register an around hook");
        self.spec.node_mut(self.node).arounds.push(Arc::new(hook));
    }
}
