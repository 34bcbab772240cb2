//! Core expression and instruction evaluator.
//!
//! Control flow is threaded as an explicit [`Flow`] signal through every
//! block, loop and branch instead of unwinding through the host: `return`
//! escapes all the way to [`Evaluator::run`], `break`/`continue` stop at
//! the nearest enclosing loop, and if/else passes every signal through
//! untouched. Each pushed scope frame is popped exactly once, including
//! when a signal or a runtime error unwinds through it.

use crate::env::Environment;
use crate::error::{EvalResult, RuntimeError};
use crate::value::{MatrixData, Value};
use minimat_types::ast::*;
use minimat_types::Shape;
use std::cell::RefCell;
use std::rc::Rc;

/// Control-flow signal produced by instruction execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// The tree-walking evaluator. Executes a checked program; dispatch is
/// decided from the runtime values, independently of the checker's static
/// decisions (transpose excepted).
pub struct Evaluator {
    /// Variable environment (scoped).
    pub env: Environment,
    /// Captured output: one line per `print` instruction, plus the final
    /// exit report when a `return` escapes to the top.
    pub output: Vec<String>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            output: Vec::new(),
        }
    }

    /// Run a program to completion. Returns the value of the escaping
    /// `return`, if any; print output accumulates in [`Evaluator::output`].
    pub fn run(&mut self, program: &Program) -> EvalResult<Option<Value>> {
        for instr in &program.instructions {
            match self.exec_instr(instr)? {
                Flow::Normal => {}
                Flow::Return(value) => {
                    self.output.push(format!("exited with value {value}"));
                    return Ok(Some(value));
                }
                Flow::Break | Flow::Continue => {
                    return Err(RuntimeError::Runtime {
                        message: "loop control outside of a loop".into(),
                        line: instr.line,
                    });
                }
            }
        }
        Ok(None)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Instructions
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a straight-line instruction sequence, stopping at the first
    /// non-normal signal. Frame management belongs to the caller.
    fn exec_instrs(&mut self, instrs: &[Instr]) -> EvalResult<Flow> {
        for instr in instrs {
            let flow = self.exec_instr(instr)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_instr(&mut self, instr: &Instr) -> EvalResult<Flow> {
        match &instr.kind {
            InstrKind::Assign(assign) => {
                self.exec_assign(assign, instr.line)?;
                Ok(Flow::Normal)
            }
            InstrKind::Return(value) => Ok(Flow::Return(self.eval_expr(value)?)),
            InstrKind::Break => Ok(Flow::Break),
            InstrKind::Continue => Ok(Flow::Continue),
            InstrKind::If(if_instr) => self.exec_if(if_instr),
            InstrKind::Print(args) => {
                self.exec_print(args)?;
                Ok(Flow::Normal)
            }
            InstrKind::For(for_loop) => self.exec_for(for_loop),
            InstrKind::While(while_loop) => self.exec_while(while_loop),
            InstrKind::ParseError(message) => Err(RuntimeError::Runtime {
                message: format!("cannot execute a program with parse errors: {message}"),
                line: instr.line,
            }),
        }
    }

    fn exec_if(&mut self, if_instr: &IfInstr) -> EvalResult<Flow> {
        let taken = if self.eval_condition(&if_instr.condition)? {
            Some(&if_instr.then_block)
        } else {
            if_instr.else_block.as_ref()
        };
        let Some(block) = taken else {
            return Ok(Flow::Normal);
        };
        self.env.push_scope();
        let flow = self.exec_instrs(&block.instructions);
        self.env.pop_scope();
        // break/continue/return pass through an if untouched
        flow
    }

    fn exec_while(&mut self, while_loop: &WhileLoop) -> EvalResult<Flow> {
        // one persistent frame for the whole loop; the condition is
        // re-evaluated inside it each iteration
        self.env.push_scope();
        let result = self.run_while(while_loop);
        self.env.pop_scope();
        result
    }

    fn run_while(&mut self, while_loop: &WhileLoop) -> EvalResult<Flow> {
        loop {
            if !self.eval_condition(&while_loop.condition)? {
                return Ok(Flow::Normal);
            }
            match self.exec_instrs(&while_loop.body.instructions)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
    }

    fn exec_for(&mut self, for_loop: &ForLoop) -> EvalResult<Flow> {
        // endpoints are evaluated once, before the loop frame opens
        let (start, end) = self.eval_range(&for_loop.range)?;
        self.env.push_scope();
        let result = self.run_for(for_loop, start, end);
        self.env.pop_scope();
        result
    }

    fn run_for(&mut self, for_loop: &ForLoop, start: i64, end: i64) -> EvalResult<Flow> {
        let mut i = start;
        // inclusive of both ends; start > end runs zero iterations
        while i <= end {
            self.env.define(&for_loop.var.name, Value::Int(i));
            match self.exec_instrs(&for_loop.body.instructions)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                ret @ Flow::Return(_) => return Ok(ret),
            }
            i += 1;
        }
        Ok(Flow::Normal)
    }

    fn exec_print(&mut self, args: &[Expr]) -> EvalResult<()> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(self.eval_expr(arg)?.to_string());
        }
        self.output.push(parts.join(" "));
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Assignment
    // ══════════════════════════════════════════════════════════════════════

    fn exec_assign(&mut self, assign: &AssignInstr, line: u32) -> EvalResult<()> {
        let value = self.eval_expr(&assign.value)?;
        match &assign.target {
            AssignTarget::Variable(ident) => {
                let new_value = match assign.op.base_op() {
                    None => value,
                    Some(op) => {
                        let current = self.env.get(&ident.name).cloned().ok_or_else(|| {
                            RuntimeError::UndefinedVariable {
                                name: ident.name.clone(),
                                line: ident.line,
                            }
                        })?;
                        self.apply_binary(op, current, value, line)?
                    }
                };
                // the update walks outward to the owning frame and only
                // binds in the innermost frame when none owns the name
                self.env.set(&ident.name, new_value);
            }
            AssignTarget::Index { base, indexes } => {
                let new_value = match assign.op.base_op() {
                    None => value,
                    Some(op) => {
                        let current = self.read_index(base, indexes)?;
                        self.apply_binary(op, current, value, line)?
                    }
                };
                self.write_index(base, indexes, new_value, line)?;
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::IntLit(n) => Ok(Value::Int(*n)),
            ExprKind::FloatLit(n) => Ok(Value::Float(*n)),
            ExprKind::StrLit(s) => Ok(Value::Str(s.clone())),

            ExprKind::Variable(name) => {
                self.env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: name.clone(),
                        line: expr.line,
                    })
            }
            ExprKind::Index { base, indexes } => self.read_index(base, indexes),

            ExprKind::Range { .. } => Err(RuntimeError::Runtime {
                message: "a range is only usable in a for loop".into(),
                line: expr.line,
            }),

            ExprKind::Binary {
                op, left, right, ..
            } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                self.apply_binary(*op, left, right, expr.line)
            }
            ExprKind::Unary { op, operand, shape } => {
                self.eval_unary(*op, operand, *shape, expr.line)
            }

            ExprKind::MatrixLit { values, .. } => self.eval_matrix_lit(values, expr.line),
            ExprKind::Builtin { name, args, .. } => self.eval_builtin(name, args, expr.line),
        }
    }

    /// Evaluate a condition to a truth value: nonzero numbers are true.
    fn eval_condition(&mut self, condition: &Expr) -> EvalResult<bool> {
        let value = self.eval_expr(condition)?;
        value
            .as_number()
            .map(|n| n != 0.0)
            .ok_or_else(|| RuntimeError::TypeMismatch {
                message: format!("condition must be a number, got {}", value.type_name()),
                line: condition.line,
            })
    }

    fn eval_int(&mut self, expr: &Expr) -> EvalResult<i64> {
        match self.eval_expr(expr)? {
            Value::Int(n) => Ok(n),
            other => Err(RuntimeError::TypeMismatch {
                message: format!("expected int, got {}", other.type_name()),
                line: expr.line,
            }),
        }
    }

    fn eval_range(&mut self, range: &Expr) -> EvalResult<(i64, i64)> {
        let ExprKind::Range { start, end } = &range.kind else {
            return Err(RuntimeError::TypeMismatch {
                message: "for loop requires a range".into(),
                line: range.line,
            });
        };
        let start = self.eval_int(start)?;
        let end = self.eval_int(end)?;
        Ok((start, end))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Binary dispatch
    // ══════════════════════════════════════════════════════════════════════

    /// Dispatch on the runtime values: the matrix table when either
    /// operand is a matrix, the scalar table otherwise.
    fn apply_binary(&self, op: BinOp, left: Value, right: Value, line: u32) -> EvalResult<Value> {
        if matches!(left, Value::Matrix(_)) || matches!(right, Value::Matrix(_)) {
            self.matrix_binary(op, left, right, line)
        } else {
            self.scalar_binary(op, left, right, line)
        }
    }

    fn scalar_binary(&self, op: BinOp, left: Value, right: Value, line: u32) -> EvalResult<Value> {
        use BinOp::*;
        match (op, &left, &right) {
            // int ∘ int stays int, except division
            (Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
            (Mul, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
            (Div, Value::Int(a), Value::Int(b)) => Ok(Value::Float(*a as f64 / *b as f64)),

            (Add | Sub | Mul | Div, _, _)
                if left.as_number().is_some() && right.as_number().is_some() =>
            {
                let a = left.as_number().unwrap();
                let b = right.as_number().unwrap();
                Ok(Value::Float(match op {
                    Add => a + b,
                    Sub => a - b,
                    Mul => a * b,
                    _ => a / b,
                }))
            }

            // comparisons produce 1/0 — there is no boolean value
            (Less | Greater | LessEq | GreaterEq | Eq | NotEq, _, _)
                if left.as_number().is_some() && right.as_number().is_some() =>
            {
                let a = left.as_number().unwrap();
                let b = right.as_number().unwrap();
                Ok(truth(match op {
                    Less => a < b,
                    Greater => a > b,
                    LessEq => a <= b,
                    GreaterEq => a >= b,
                    Eq => a == b,
                    _ => a != b,
                }))
            }
            (Less | Greater | LessEq | GreaterEq | Eq | NotEq, Value::Str(a), Value::Str(b)) => {
                Ok(truth(match op {
                    Less => a < b,
                    Greater => a > b,
                    LessEq => a <= b,
                    GreaterEq => a >= b,
                    Eq => a == b,
                    _ => a != b,
                }))
            }

            _ => Err(RuntimeError::UnsupportedOperator {
                op: op.as_str(),
                left: left.type_name(),
                right: right.type_name(),
                line,
            }),
        }
    }

    fn matrix_binary(&self, op: BinOp, left: Value, right: Value, line: u32) -> EvalResult<Value> {
        use BinOp::*;
        match (op, &left, &right) {
            // elementwise arithmetic requires identical shapes
            (DotAdd | DotSub | DotMul | DotDiv, Value::Matrix(a), Value::Matrix(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                if !a.same_shape(&b) {
                    return Err(RuntimeError::ElementwiseShapeMismatch {
                        op: op.as_str(),
                        left: a.dims_string(),
                        right: b.dims_string(),
                        line,
                    });
                }
                let f: fn(f64, f64) -> f64 = match op {
                    DotAdd => |x, y| x + y,
                    DotSub => |x, y| x - y,
                    DotMul => |x, y| x * y,
                    _ => |x, y| x / y,
                };
                Ok(Value::matrix(a.zip_map(&b, f)))
            }

            // standard row-by-column composition; the inner-dimension
            // failure is distinct from the elementwise one
            (Mul, Value::Matrix(a), Value::Matrix(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                if a.cols != b.rows {
                    return Err(RuntimeError::InnerDimMismatch {
                        left: a.dims_string(),
                        right: b.dims_string(),
                        line,
                    });
                }
                Ok(Value::matrix(a.matmul(&b)))
            }

            // scalar broadcast exists only for addition
            (Add, Value::Matrix(m), scalar) | (Add, scalar, Value::Matrix(m))
                if scalar.as_number().is_some() =>
            {
                let offset = scalar.as_number().unwrap();
                Ok(Value::matrix(m.borrow().map(|x| x + offset)))
            }

            _ => Err(RuntimeError::UnsupportedOperator {
                op: op.as_str(),
                left: left.type_name(),
                right: right.type_name(),
                line,
            }),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Unary operators
    // ══════════════════════════════════════════════════════════════════════

    fn eval_unary(
        &mut self,
        op: UnOp,
        operand: &Expr,
        shape: Option<Shape>,
        line: u32,
    ) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            UnOp::Neg => match value {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(RuntimeError::UnsupportedUnary {
                    op: op.as_str(),
                    operand: other.type_name(),
                    line,
                }),
            },
            UnOp::Transpose => {
                let Value::Matrix(m) = value else {
                    return Err(RuntimeError::UnsupportedUnary {
                        op: op.as_str(),
                        operand: value.type_name(),
                        line,
                    });
                };
                // the checker-assigned operand shape picks the strategy;
                // axes it could not resolve fall back to the runtime
                // dimensions
                let shape = shape.ok_or_else(|| RuntimeError::Runtime {
                    message: "transpose requires shape annotations from the checking pass".into(),
                    line,
                })?;
                let m = m.borrow();
                let rows = shape.axis(0).map(|n| n as usize).unwrap_or(m.rows);
                let cols = shape.axis(1).map(|n| n as usize).unwrap_or(m.cols);
                let transposed = if cols == 1 {
                    // a column flattens into a single row
                    m.reshaped(1, m.rows)
                } else if rows == 1 {
                    // a row becomes a column of singleton rows
                    m.reshaped(m.cols, 1)
                } else {
                    m.transposed()
                };
                Ok(Value::matrix(transposed))
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Indexed reads & writes
    // ══════════════════════════════════════════════════════════════════════

    /// The shared storage bound to `base`. Cloning the `Rc` preserves
    /// aliasing: mutations are visible through every binding.
    fn lookup_matrix(&self, base: &Ident) -> EvalResult<Rc<RefCell<MatrixData>>> {
        match self.env.get(&base.name) {
            Some(Value::Matrix(m)) => Ok(m.clone()),
            Some(other) => Err(RuntimeError::TypeMismatch {
                message: format!("cannot index {} '{}'", other.type_name(), base.name),
                line: base.line,
            }),
            None => Err(RuntimeError::UndefinedVariable {
                name: base.name.clone(),
                line: base.line,
            }),
        }
    }

    fn read_index(&mut self, base: &Ident, indexes: &[Expr]) -> EvalResult<Value> {
        let matrix = self.lookup_matrix(base)?;
        let idx = self.eval_index_values(indexes)?;
        let m = matrix.borrow();
        let line = base.line;
        match idx.as_slice() {
            [i] if m.rows == 1 => {
                let col = checked_axis(*i, m.cols, line)?;
                Ok(Value::Float(m.get(0, col).expect("bounds checked")))
            }
            // a single index into a 2-D matrix reads a copy of the row
            [r] => {
                let row = checked_axis(*r, m.rows, line)?;
                Ok(Value::matrix(m.row(row).expect("bounds checked")))
            }
            [r, c] => {
                let row = checked_axis(*r, m.rows, line)?;
                let col = checked_axis(*c, m.cols, line)?;
                Ok(Value::Float(m.get(row, col).expect("bounds checked")))
            }
            _ => Err(RuntimeError::IndexArity {
                got: idx.len(),
                dims: if m.rows == 1 { 1 } else { 2 },
                line,
            }),
        }
    }

    /// Mutate the addressed element in place through the shared storage.
    /// A write must fully address one element.
    fn write_index(
        &mut self,
        base: &Ident,
        indexes: &[Expr],
        value: Value,
        line: u32,
    ) -> EvalResult<()> {
        let entry = value
            .as_number()
            .ok_or_else(|| RuntimeError::TypeMismatch {
                message: format!(
                    "cannot assign {} into a matrix element",
                    value.type_name()
                ),
                line,
            })?;
        let matrix = self.lookup_matrix(base)?;
        let idx = self.eval_index_values(indexes)?;
        let mut m = matrix.borrow_mut();
        let (row, col) = match idx.as_slice() {
            [i] if m.rows == 1 => (0, checked_axis(*i, m.cols, line)?),
            [r, c] => (
                checked_axis(*r, m.rows, line)?,
                checked_axis(*c, m.cols, line)?,
            ),
            _ => {
                return Err(RuntimeError::IndexArity {
                    got: idx.len(),
                    dims: if m.rows == 1 { 1 } else { 2 },
                    line,
                });
            }
        };
        m.set(row, col, entry);
        Ok(())
    }

    fn eval_index_values(&mut self, indexes: &[Expr]) -> EvalResult<Vec<i64>> {
        let mut values = Vec::with_capacity(indexes.len());
        for index in indexes {
            values.push(self.eval_int(index)?);
        }
        Ok(values)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Matrix literals & builtins
    // ══════════════════════════════════════════════════════════════════════

    fn eval_matrix_lit(&mut self, values: &[Expr], line: u32) -> EvalResult<Value> {
        let mut evaluated = Vec::with_capacity(values.len());
        for value in values {
            evaluated.push(self.eval_expr(value)?);
        }
        if evaluated.is_empty() {
            return Err(RuntimeError::Runtime {
                message: "empty matrix literal".into(),
                line,
            });
        }

        if evaluated.iter().all(|v| v.as_number().is_some()) {
            let data: Vec<f64> = evaluated.iter().map(|v| v.as_number().unwrap()).collect();
            return Ok(Value::matrix(MatrixData::new(1, data.len(), data)));
        }

        // nested form: every element is a flat row of the same width
        let mut width = None;
        let mut data = Vec::new();
        for value in &evaluated {
            let Value::Matrix(row) = value else {
                return Err(RuntimeError::TypeMismatch {
                    message: "matrix literal elements must be numeric scalars or rows".into(),
                    line,
                });
            };
            let row = row.borrow();
            if row.rows != 1 {
                return Err(RuntimeError::TypeMismatch {
                    message: "matrix literal rows must be flat vectors".into(),
                    line,
                });
            }
            match width {
                None => width = Some(row.cols),
                Some(expected) if expected != row.cols => {
                    return Err(RuntimeError::TypeMismatch {
                        message: format!(
                            "inconsistent row widths in matrix literal: {} and {}",
                            expected, row.cols
                        ),
                        line,
                    });
                }
                Some(_) => {}
            }
            for col in 0..row.cols {
                data.push(row.get(0, col).expect("in range"));
            }
        }
        let width = width.expect("at least one row");
        Ok(Value::matrix(MatrixData::new(
            evaluated.len(),
            width,
            data,
        )))
    }

    fn eval_builtin(&mut self, name: &Ident, args: &[Expr], line: u32) -> EvalResult<Value> {
        let mut dims = Vec::with_capacity(args.len());
        for arg in args {
            let n = self.eval_int(arg)?;
            if n <= 0 {
                return Err(RuntimeError::BadDimension { value: n, line });
            }
            dims.push(n as usize);
        }

        let arity = |expected: &'static str| RuntimeError::Runtime {
            message: format!("'{}' expects {expected}, got {}", name.name, args.len()),
            line,
        };
        let data = match name.name.as_str() {
            "eye" => match dims.as_slice() {
                [n] => MatrixData::identity(*n),
                _ => return Err(arity("1 argument")),
            },
            "zeros" | "ones" => {
                let fill = if name.name == "zeros" { 0.0 } else { 1.0 };
                match dims.as_slice() {
                    [n] => MatrixData::filled(*n, *n, fill),
                    [r, c] => MatrixData::filled(*r, *c, fill),
                    _ => return Err(arity("1 or 2 arguments")),
                }
            }
            other => {
                return Err(RuntimeError::UnknownBuiltin {
                    name: other.to_string(),
                    line,
                });
            }
        };
        Ok(Value::matrix(data))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn truth(b: bool) -> Value {
    Value::Int(b as i64)
}

/// Bounds-check one index against a dimension.
fn checked_axis(index: i64, size: usize, line: u32) -> EvalResult<usize> {
    if index < 0 || index as usize >= size {
        Err(RuntimeError::IndexOutOfRange { index, size, line })
    } else {
        Ok(index as usize)
    }
}
