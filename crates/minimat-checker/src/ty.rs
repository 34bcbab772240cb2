//! Semantic type representation for the Minimat type checker.
//!
//! [`Ty`] is the resolved kind used during checking. It is distinct from
//! the AST annotation slots: a matrix type bundles the element kind and
//! `[rows, cols]` shape of the symbol or node it describes, so shape
//! validation can read from whichever side is available.

use std::fmt;

use minimat_types::ast::{BinOp, ElemKind};
use minimat_types::Shape;

// ══════════════════════════════════════════════════════════════════════════════
// Ty
// ══════════════════════════════════════════════════════════════════════════════

/// A resolved static kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Int,
    Float,
    Str,
    Bool,
    /// `start:end` — consumable only by a for-loop.
    Range,
    /// A matrix with its element kind and `[rows, cols]` shape.
    Matrix { elem: ElemKind, shape: Shape },
    /// Kind could not be determined (error recovery). An unknown operand
    /// suppresses follow-on diagnostics on the same node.
    Unknown,
}

impl Ty {
    pub fn from_elem(elem: ElemKind) -> Ty {
        match elem {
            ElemKind::Int => Ty::Int,
            ElemKind::Float => Ty::Float,
            ElemKind::Str => Ty::Str,
        }
    }

    /// The element kind of a scalar type, if it has one.
    pub fn as_elem(&self) -> Option<ElemKind> {
        match self {
            Ty::Int => Some(ElemKind::Int),
            Ty::Float => Some(ElemKind::Float),
            Ty::Str => Some(ElemKind::Str),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Int | Ty::Float)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    /// The shape of a matrix type.
    pub fn shape(&self) -> Option<Shape> {
        match self {
            Ty::Matrix { shape, .. } => Some(*shape),
            _ => None,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "int"),
            Ty::Float => write!(f, "float"),
            Ty::Str => write!(f, "str"),
            Ty::Bool => write!(f, "bool"),
            Ty::Range => write!(f, "range"),
            Ty::Matrix { .. } => write!(f, "matrix"),
            Ty::Unknown => write!(f, "unknown"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Operator table
// ══════════════════════════════════════════════════════════════════════════════

/// The closed operator table: result kind for `(op, left, right)`, or
/// `None` when the combination is unsupported.
///
/// The table decides kinds and result shapes only; agreement between two
/// matrix operand shapes is validated separately by the checker, which
/// owns the diagnostics.
pub fn binary_result(op: BinOp, left: &Ty, right: &Ty) -> Option<Ty> {
    use BinOp::*;

    match (op, left, right) {
        // int ∘ int stays int, except division
        (Add | Sub | Mul, Ty::Int, Ty::Int) => Some(Ty::Int),
        (Div, Ty::Int, Ty::Int) => Some(Ty::Float),
        // any remaining int/float mix promotes to float
        (Add | Sub | Mul | Div, l, r) if l.is_numeric() && r.is_numeric() => Some(Ty::Float),

        // scalar broadcast exists only for addition
        (Add, Ty::Matrix { elem, shape }, s) | (Add, s, Ty::Matrix { elem, shape })
            if s.is_numeric() =>
        {
            Some(Ty::Matrix {
                elem: promote_with_scalar(*elem, s),
                shape: *shape,
            })
        }

        // matmul: [m, k] * [k, n] → [m, n]
        (
            Mul,
            Ty::Matrix {
                elem: le,
                shape: ls,
            },
            Ty::Matrix {
                elem: re,
                shape: rs,
            },
        ) => Some(Ty::Matrix {
            elem: promote_elems(op, *le, *re),
            shape: Shape::new(ls.rows, rs.cols),
        }),

        // elementwise matrix arithmetic
        (
            DotAdd | DotSub | DotMul | DotDiv,
            Ty::Matrix {
                elem: le,
                shape: ls,
            },
            Ty::Matrix {
                elem: re,
                shape: rs,
            },
        ) => Some(Ty::Matrix {
            elem: promote_elems(op, *le, *re),
            shape: merge_shapes(*ls, *rs),
        }),

        // comparisons: numeric ∘ numeric, or str ∘ str
        (o, l, r) if o.is_comparison() && l.is_numeric() && r.is_numeric() => Some(Ty::Bool),
        (o, Ty::Str, Ty::Str) if o.is_comparison() => Some(Ty::Bool),

        _ => None,
    }
}

/// Element-kind promotion for matrix∘matrix results: int stays int except
/// under division; str propagates (rejected again at materialization).
fn promote_elems(op: BinOp, a: ElemKind, b: ElemKind) -> ElemKind {
    match (a, b) {
        (ElemKind::Str, _) | (_, ElemKind::Str) => ElemKind::Str,
        (ElemKind::Int, ElemKind::Int) if !matches!(op, BinOp::Div | BinOp::DotDiv) => {
            ElemKind::Int
        }
        _ => ElemKind::Float,
    }
}

/// Element-kind promotion for the matrix-plus-scalar broadcast.
fn promote_with_scalar(elem: ElemKind, scalar: &Ty) -> ElemKind {
    match (elem, scalar) {
        (ElemKind::Str, _) => ElemKind::Str,
        (ElemKind::Int, Ty::Int) => ElemKind::Int,
        _ => ElemKind::Float,
    }
}

/// Combine two elementwise operand shapes, preferring known axes.
fn merge_shapes(a: Shape, b: Shape) -> Shape {
    let pick = |x: i64, y: i64| if x == Shape::UNKNOWN { y } else { x };
    Shape::new(pick(a.rows, b.rows), pick(a.cols, b.cols))
}
