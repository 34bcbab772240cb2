//! Runtime failures — fatal, unrecoverable aborts.
//!
//! These cover what the static pass could not or did not resolve: shapes
//! unknown until runtime, non-literal index values, and the defensive arms
//! a checked program never reaches. The two matrix-shape failures are
//! deliberately distinct variants.

use thiserror::Error;

/// A fatal evaluation error. There is no retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// `.+ .- .* ./` over differently-shaped matrices.
    #[error("line {line}: elementwise '{op}' on mismatched shapes {left} and {right}")]
    ElementwiseShapeMismatch {
        op: &'static str,
        left: String,
        right: String,
        line: u32,
    },

    /// `*` where `left.cols != right.rows`.
    #[error("line {line}: matrix multiplication on incompatible shapes {left} and {right}")]
    InnerDimMismatch {
        left: String,
        right: String,
        line: u32,
    },

    #[error("line {line}: operator '{op}' is not supported for {left} and {right}")]
    UnsupportedOperator {
        op: &'static str,
        left: &'static str,
        right: &'static str,
        line: u32,
    },

    #[error("line {line}: unary '{op}' is not supported for {operand}")]
    UnsupportedUnary {
        op: &'static str,
        operand: &'static str,
        line: u32,
    },

    #[error("line {line}: unknown function '{name}'")]
    UnknownBuiltin { name: String, line: u32 },

    #[error("line {line}: index {index} out of range for a dimension of size {size}")]
    IndexOutOfRange { index: i64, size: usize, line: u32 },

    #[error("line {line}: {got} index(es) cannot address an element of a {dims}-dimensional matrix")]
    IndexArity { got: usize, dims: usize, line: u32 },

    #[error("line {line}: matrix dimensions must be positive, got {value}")]
    BadDimension { value: i64, line: u32 },

    #[error("line {line}: undefined variable '{name}'")]
    UndefinedVariable { name: String, line: u32 },

    #[error("line {line}: type mismatch: {message}")]
    TypeMismatch { message: String, line: u32 },

    #[error("line {line}: {message}")]
    Runtime { message: String, line: u32 },
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, RuntimeError>;
