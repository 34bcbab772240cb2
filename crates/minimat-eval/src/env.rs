//! Scoped runtime environment for the Minimat evaluator.

use crate::value::Value;
use std::collections::HashMap;

/// A single scope level.
#[derive(Debug, Clone)]
struct Scope {
    bindings: HashMap<String, Value>,
}

impl Scope {
    fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

/// Scoped variable environment with push/pop semantics.
///
/// Lookup walks from the innermost scope outward. [`Environment::define`]
/// always creates in the current (innermost) scope. [`Environment::set`]
/// updates the nearest scope that already owns the name and falls back to
/// defining in the current scope — an assignment can therefore reach
/// through loop and branch frames to an outer binding, unlike the static
/// chain's always-current-frame write.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    /// Create a new environment with one global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    /// Push a new scope (for loop and branch bodies).
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the innermost scope.
    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    /// Bind a variable in the current (innermost) scope.
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name.to_string(), value);
        }
    }

    /// Look up a variable, searching from innermost to outermost scope.
    pub fn get(&self, name: &str) -> Option<&Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.bindings.get(name) {
                return Some(value);
            }
        }
        None
    }

    /// Update the nearest scope that owns `name`, or bind it in the
    /// current scope when no scope does.
    pub fn set(&mut self, name: &str, value: Value) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.bindings.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.define(name, value);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
