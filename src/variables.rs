//! Per-execution variable store.
//!
//! One store exists per executed leaf, created fresh when the leaf's
//! [`T`](crate::T) is materialized and discarded with it, so no fixture
//! state can leak between leaves even when they run on concurrent threads.
//!
//! Initializers are not copied in eagerly: the store keeps the leaf's frozen
//! ancestor chain and walks it leaf-to-root on first reference, so the
//! nearest declaration wins (lexical shadowing) and undeclared reads are
//! detected at the moment of the read.

use std::collections::HashMap;

use crate::spec::{NodeId, Spec, VarInit};
use crate::value::Value;

/// Memoized variable state for one leaf execution.
///
/// The resolution half of the contract (running initializers) lives on
/// [`T`](crate::T), which owns this store and can hand itself to the
/// initializer closure.
pub(crate) struct VariableStore {
    /// Ancestor chain of the executing leaf, root first.
    chain: Vec<NodeId>,
    /// Names that have been computed or explicitly set this execution.
    memo: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new(chain: Vec<NodeId>) -> Self {
        Self {
            chain,
            memo: HashMap::new(),
        }
    }

    /// The memoized value for `name`, if it has been computed or set.
    pub fn cached(&self, name: &str) -> Option<&Value> {
        self.memo.get(name)
    }

    /// Marks `name` computed with `value`, short-circuiting any initializer.
    pub fn set(&mut self, name: &str, value: Value) {
        self.memo.insert(name.to_string(), value);
    }

    /// Finds the initializer of the nearest enclosing scope declaring
    /// `name`, walking the chain leaf-to-root.
    pub fn lookup_initializer(&self, spec: &Spec, name: &str) -> Option<VarInit> {
        self.chain.iter().rev().find_map(|&node| {
            spec.node(node)
                .vars
                .iter()
                .find(|(declared, _)| declared == name)
                .map(|(_, init)| init.clone())
        })
    }

    /// Whether any enclosing scope declares `name`, ignoring memo state.
    pub fn is_declared(&self, spec: &Spec, name: &str) -> bool {
        self.lookup_initializer(spec, name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::T;
    use crate::spec::Spec;

    #[test]
    fn nearest_declaration_shadows_outer_ones() {
        let mut spec = Spec::new("root");
        spec.var("x", |_t: &mut T| Value::from(1));
        spec.context("inner", |s| {
            s.var("x", |_t: &mut T| Value::from(2));
            s.test("leaf", |_t: &mut T| {});
        });
        let leaf = spec.leaves()[0];
        let store = VariableStore::new(spec.ancestor_chain(leaf));
        // Resolution order is leaf-to-root, so the inner declaration wins.
        assert!(store.is_declared(&spec, "x"));
        assert!(!store.is_declared(&spec, "y"));
    }

    #[test]
    fn set_overrides_without_touching_declarations() {
        let mut spec = Spec::new("root");
        spec.test("leaf", |_t: &mut T| {});
        let leaf = spec.leaves()[0];
        let mut store = VariableStore::new(spec.ancestor_chain(leaf));
        assert!(store.cached("fresh").is_none());
        store.set("fresh", Value::from("hello"));
        assert_eq!(store.cached("fresh"), Some(&Value::from("hello")));
    }
}
