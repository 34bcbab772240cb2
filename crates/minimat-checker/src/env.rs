//! Static type environment with lexically scoped frames.
//!
//! [`TypeEnv`] manages a stack of scopes pushed per branch and loop body.
//! Lookup walks innermost-first; [`TypeEnv::define`] always writes the
//! **current** frame, so a reassignment inside a nested block shadows the
//! outer binding for the remainder of that block. The runtime chain
//! deliberately does not share this behavior.

use std::collections::HashMap;

use crate::ty::Ty;

/// What kind of construct a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The outermost program scope.
    Global,
    /// A for/while body.
    Loop,
    /// An if/else branch.
    Branch,
}

/// A single scope level.
#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, Ty>,
}

/// A stack of scopes for name resolution during checking.
#[derive(Debug)]
pub struct TypeEnv {
    scopes: Vec<Scope>,
}

impl TypeEnv {
    /// Create a new environment with the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                bindings: HashMap::new(),
            }],
        }
    }

    /// Push a new scope onto the stack.
    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            bindings: HashMap::new(),
        });
    }

    /// Pop the top scope off the stack.
    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    /// Define or overwrite a binding in the current (innermost) scope.
    ///
    /// First assignment declares; a reassignment may change the kind.
    pub fn define(&mut self, name: &str, ty: Ty) {
        let scope = self.scopes.last_mut().expect("no scope");
        scope.bindings.insert(name.to_string(), ty);
    }

    /// Look up a binding, searching from innermost to outermost scope.
    pub fn lookup(&self, name: &str) -> Option<&Ty> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.bindings.get(name) {
                return Some(ty);
            }
        }
        None
    }

    /// Check if any scope on the stack is a loop body.
    pub fn in_loop(&self) -> bool {
        self.scopes.iter().any(|s| s.kind == ScopeKind::Loop)
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}
