use serde::{Deserialize, Serialize};
use std::fmt;

/// `[rows, cols]` descriptor attached to matrix-typed nodes and symbols.
///
/// An axis the checker cannot resolve statically (a builtin call with a
/// non-literal argument) is recorded as [`Shape::UNKNOWN`] and is exempt
/// from static bound and compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: i64,
    pub cols: i64,
}

impl Shape {
    /// Placeholder for an axis that is only known at runtime.
    pub const UNKNOWN: i64 = -1;

    pub fn new(rows: i64, cols: i64) -> Self {
        Self { rows, cols }
    }

    /// An `n`×`n` shape.
    pub fn square(n: i64) -> Self {
        Self::new(n, n)
    }

    /// A flat row vector: `[1, len]`.
    pub fn row(len: i64) -> Self {
        Self::new(1, len)
    }

    /// Dimensionality as seen by indexing: 1 for a flat row vector,
    /// 2 for everything else.
    pub fn dims(&self) -> usize {
        if self.rows == 1 {
            1
        } else {
            2
        }
    }

    /// The statically-known bound of an axis (0 = rows, 1 = cols),
    /// or `None` if the axis is unknown.
    pub fn axis(&self, index: usize) -> Option<i64> {
        let n = if index == 0 { self.rows } else { self.cols };
        (n != Self::UNKNOWN).then_some(n)
    }

    /// The shape with its axes swapped.
    pub fn transposed(self) -> Shape {
        Shape::new(self.cols, self.rows)
    }

    /// Axis-wise equality, treating an unknown axis as compatible with
    /// anything.
    pub fn agrees_with(&self, other: &Shape) -> bool {
        axis_agrees(self.rows, other.rows) && axis_agrees(self.cols, other.cols)
    }
}

fn axis_agrees(a: i64, b: i64) -> bool {
    a == Shape::UNKNOWN || b == Shape::UNKNOWN || a == b
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis = |n: i64| {
            if n == Self::UNKNOWN {
                "?".to_string()
            } else {
                n.to_string()
            }
        };
        write!(f, "[{}, {}]", axis(self.rows), axis(self.cols))
    }
}
