//! Runtime values for the Minimat evaluator.
//!
//! A matrix is stored row-major behind `Rc<RefCell<..>>`: binding it to a
//! second variable aliases the same storage, so an element write through
//! either name is visible through both. This aliasing is part of the
//! language semantics, not an optimization.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A runtime value: `int | float | str | matrix`.
///
/// The language has no boolean value — comparisons evaluate to `Int(1)` /
/// `Int(0)` and conditions test for nonzero.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Matrix(Rc<RefCell<MatrixData>>),
}

impl Value {
    /// Wrap matrix data in fresh shared storage.
    pub fn matrix(data: MatrixData) -> Value {
        Value::Matrix(Rc::new(RefCell::new(data)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Matrix(_) => "matrix",
        }
    }

    /// The numeric value of a scalar, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Matrix(m) => write!(f, "{}", m.borrow()),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// MatrixData
// ══════════════════════════════════════════════════════════════════════════════

/// A row-major grid of numbers. A flat vector is a matrix with one row.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixData {
    pub rows: usize,
    pub cols: usize,
    data: Vec<f64>,
}

impl MatrixData {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols, "matrix data length mismatch");
        Self { rows, cols, data }
    }

    /// A rows×cols matrix with every entry set to `fill`.
    pub fn filled(rows: usize, cols: usize, fill: f64) -> Self {
        Self::new(rows, cols, vec![fill; rows * cols])
    }

    /// The n×n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::filled(n, n, 0.0);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    /// A fresh copy of one row as a 1×cols matrix.
    pub fn row(&self, row: usize) -> Option<MatrixData> {
        (row < self.rows).then(|| {
            let start = row * self.cols;
            MatrixData::new(1, self.cols, self.data[start..start + self.cols].to_vec())
        })
    }

    pub fn same_shape(&self, other: &MatrixData) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    /// `"2x3"`, for runtime failure messages.
    pub fn dims_string(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }

    /// Apply `f` to every entry.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> MatrixData {
        MatrixData::new(self.rows, self.cols, self.data.iter().map(|&x| f(x)).collect())
    }

    /// Pointwise combination of two equal-shape matrices. The caller is
    /// responsible for the shape check.
    pub fn zip_map(&self, other: &MatrixData, f: impl Fn(f64, f64) -> f64) -> MatrixData {
        debug_assert!(self.same_shape(other));
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        MatrixData::new(self.rows, self.cols, data)
    }

    /// Standard row-by-column composition. The caller is responsible for
    /// the inner-dimension check.
    pub fn matmul(&self, other: &MatrixData) -> MatrixData {
        debug_assert_eq!(self.cols, other.rows);
        let mut out = MatrixData::filled(self.rows, other.cols, 0.0);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.data[i * self.cols + k] * other.data[k * other.cols + j];
                }
                out.data[i * other.cols + j] = sum;
            }
        }
        out
    }

    /// Standard index-swap transpose.
    pub fn transposed(&self) -> MatrixData {
        let mut out = MatrixData::filled(self.cols, self.rows, 0.0);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        out
    }

    /// The same entries under new dimensions — used when transposing a
    /// flat row or a single column, where the storage order is unchanged.
    pub fn reshaped(&self, rows: usize, cols: usize) -> MatrixData {
        debug_assert_eq!(rows * cols, self.data.len());
        MatrixData::new(rows, cols, self.data.clone())
    }
}

impl fmt::Display for MatrixData {
    /// A genuine matrix (more than one row) renders as a bracketed
    /// multi-line block; a flat vector as space-separated elements.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = |x: f64| format!("{x}");
        if self.rows > 1 {
            for (i, row) in self.data.chunks(self.cols).enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                let entries: Vec<String> = row.iter().map(|&x| entry(x)).collect();
                write!(f, "[{}]", entries.join(" "))?;
            }
            Ok(())
        } else {
            let entries: Vec<String> = self.data.iter().map(|&x| entry(x)).collect();
            write!(f, "{}", entries.join(" "))
        }
    }
}
