//! Lexical scopes
//!
//! Scopes live in an arena owned by [`ScopeTree`] and point at their parent
//! by [`ScopeId`]. The chain is strictly tree-shaped: a scope has at most one
//! parent and the root owns the lifetime of the whole compilation pass.

use std::collections::HashMap;
use tracing::trace;

use crate::{EvalError, EvalResult, Value};

/// Handle to a scope inside a [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
struct ScopeRecord {
    parent: Option<ScopeId>,
    vars: HashMap<String, Value>,
}

/// Arena of scopes for one compilation pass
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<ScopeRecord>,
}

impl ScopeTree {
    /// Create a tree holding only the root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeRecord::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Number of scopes in the arena
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Open a new scope enclosed by `parent`
    pub fn child(&mut self, parent: ScopeId) -> EvalResult<ScopeId> {
        self.record(parent)?;
        let id = ScopeId(self.scopes.len());
        self.scopes.push(ScopeRecord {
            parent: Some(parent),
            vars: HashMap::new(),
        });
        Ok(id)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes.get(id.0).and_then(|s| s.parent)
    }

    /// Bind `name` in `id` only; ancestors are never touched.
    ///
    /// Shadowing an ancestor's binding is allowed, rebinding a name
    /// already bound in the same scope is not.
    pub fn define(
        &mut self,
        id: ScopeId,
        name: impl Into<String>,
        value: Value,
    ) -> EvalResult<()> {
        let name = name.into();
        let record = self
            .scopes
            .get_mut(id.0)
            .ok_or(EvalError::UnknownScope(id.0))?;

        if record.vars.contains_key(&name) {
            return Err(EvalError::Reassignment { name });
        }

        trace!(scope = id.0, variable = %name, "Variable defined");
        record.vars.insert(name, value);
        Ok(())
    }

    /// First binding of `name` walking from `id` up through its ancestors
    pub fn get(&self, id: ScopeId, name: &str) -> Option<&Value> {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let record = self.scopes.get(scope_id.0)?;
            if let Some(value) = record.vars.get(name) {
                return Some(value);
            }
            current = record.parent;
        }
        None
    }

    /// Like [`ScopeTree::get`], resolving unbound names to `undef`
    pub fn lookup(&self, id: ScopeId, name: &str) -> Value {
        self.get(id, name).cloned().unwrap_or(Value::Undef)
    }

    pub fn is_defined(&self, id: ScopeId, name: &str) -> bool {
        self.get(id, name).is_some()
    }

    /// Read-only view of one scope, used by the evaluator
    pub fn scope(&self, id: ScopeId) -> Scope<'_> {
        Scope { tree: self, id }
    }

    fn record(&self, id: ScopeId) -> EvalResult<&ScopeRecord> {
        self.scopes.get(id.0).ok_or(EvalError::UnknownScope(id.0))
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view of a scope and its ancestor chain
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    tree: &'a ScopeTree,
    id: ScopeId,
}

impl<'a> Scope<'a> {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.tree.get(self.id, name)
    }

    pub fn lookup(&self, name: &str) -> Value {
        self.tree.lookup(self.id, name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.tree.is_defined(self.id, name)
    }

    /// View of the enclosing scope, if any
    pub fn parent(&self) -> Option<Scope<'a>> {
        self.tree.parent(self.id).map(|id| self.tree.scope(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.define(root, "os", Value::from("linux")).unwrap();

        let class = tree.child(root).unwrap();
        let inner = tree.child(class).unwrap();
        tree.define(class, "port", Value::Integer(80)).unwrap();

        assert_eq!(tree.lookup(inner, "os"), Value::from("linux"));
        assert_eq!(tree.lookup(inner, "port"), Value::Integer(80));
        assert_eq!(tree.lookup(root, "port"), Value::Undef);
    }

    #[test]
    fn missing_variable_is_undef() {
        let tree = ScopeTree::new();
        assert_eq!(tree.lookup(tree.root(), "nothing"), Value::Undef);
        assert!(!tree.scope(tree.root()).is_defined("nothing"));
    }

    #[test]
    fn define_binds_current_scope_only() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.define(root, "x", Value::Integer(1)).unwrap();

        let child = tree.child(root).unwrap();
        tree.define(child, "x", Value::Integer(2)).unwrap();

        assert_eq!(tree.lookup(child, "x"), Value::Integer(2));
        assert_eq!(tree.lookup(root, "x"), Value::Integer(1));
    }

    #[test]
    fn reassignment_in_same_scope_fails() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.define(root, "x", Value::Integer(1)).unwrap();

        let err = tree.define(root, "x", Value::Integer(2)).unwrap_err();
        assert_eq!(err, EvalError::Reassignment { name: "x".into() });
        assert_eq!(tree.lookup(root, "x"), Value::Integer(1));
    }

    #[test]
    fn foreign_scope_id_is_rejected() {
        let mut big = ScopeTree::new();
        let root = big.root();
        let far = big.child(root).unwrap();

        let mut small = ScopeTree::new();
        assert_eq!(small.child(far), Err(EvalError::UnknownScope(1)));
        assert_eq!(
            small.define(far, "x", Value::Undef),
            Err(EvalError::UnknownScope(1))
        );
        assert_eq!(small.lookup(far, "x"), Value::Undef);
    }

    #[test]
    fn scope_view_parent_chain() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let child = tree.child(root).unwrap();

        let view = tree.scope(child);
        assert_eq!(view.parent().map(|p| p.id()), Some(root));
        assert!(tree.scope(root).parent().is_none());
        assert_eq!(tree.len(), 2);
    }
}
