//! Minimat static pass: single-sweep type and shape checking over a parsed
//! AST. The checker annotates matrix shapes onto the tree in place and
//! accumulates diagnostics; it never aborts.

mod checker;
mod env;
mod ty;

pub use checker::{check, TypeChecker};
pub use env::{ScopeKind, TypeEnv};
pub use ty::{binary_result, Ty};
