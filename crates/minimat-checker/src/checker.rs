//! Minimat type checker — walks a parsed AST, validates kinds and matrix
//! shapes, and annotates shapes onto the tree in place.
//!
//! Entry point: [`check`].
//!
//! The checker never aborts: every reachable node is visited exactly once,
//! diagnostics accumulate with their source line, and [`Ty::Unknown`] is
//! returned wherever a kind could not be resolved so downstream checks
//! degrade without cascading. The external driver must only run the
//! evaluator when the returned diagnostics list is empty.

use minimat_types::ast::*;
use minimat_types::{Diagnostics, Shape};

use crate::env::{ScopeKind, TypeEnv};
use crate::ty::{binary_result, Ty};

const RANGE_MISUSE: &str = "a range is only usable in a for loop";

/// Type-check a program, filling in its shape annotations.
pub fn check(program: &mut Program) -> Diagnostics {
    let mut checker = TypeChecker::new();
    checker.check_program(program);
    checker.into_diagnostics()
}

// ══════════════════════════════════════════════════════════════════════════════
// TypeChecker
// ══════════════════════════════════════════════════════════════════════════════

/// Walks a parsed [`Program`] and validates all kinds and shapes.
pub struct TypeChecker {
    env: TypeEnv,
    diagnostics: Diagnostics,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            env: TypeEnv::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn error(&mut self, line: u32, message: impl Into<String>) {
        self.diagnostics.push(line, message);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Program, blocks & instructions
    // ══════════════════════════════════════════════════════════════════════

    pub fn check_program(&mut self, program: &mut Program) {
        self.check_instrs(&mut program.instructions);
    }

    fn check_instrs(&mut self, instrs: &mut [Instr]) {
        for instr in instrs {
            self.check_instr(instr);
        }
    }

    /// Visit a block in its own fresh scope frame.
    fn check_block(&mut self, block: &mut Block, kind: ScopeKind) {
        self.env.push_scope(kind);
        self.check_instrs(&mut block.instructions);
        self.env.pop_scope();
    }

    fn check_instr(&mut self, instr: &mut Instr) {
        let line = instr.line;
        match &mut instr.kind {
            InstrKind::Assign(assign) => self.check_assign(assign, line),
            InstrKind::Return(value) => {
                let ty = self.check_expr(value);
                if matches!(ty, Ty::Range) {
                    self.error(value.line, RANGE_MISUSE);
                }
            }
            InstrKind::Break => {
                if !self.env.in_loop() {
                    self.error(line, "'break' outside of a loop");
                }
            }
            InstrKind::Continue => {
                if !self.env.in_loop() {
                    self.error(line, "'continue' outside of a loop");
                }
            }
            InstrKind::If(if_instr) => self.check_if(if_instr),
            InstrKind::Print(args) => {
                for arg in args {
                    let ty = self.check_expr(arg);
                    if matches!(ty, Ty::Range) {
                        self.error(arg.line, RANGE_MISUSE);
                    }
                }
            }
            InstrKind::For(for_loop) => self.check_for(for_loop),
            InstrKind::While(while_loop) => self.check_while(while_loop),
            InstrKind::ParseError(message) => {
                self.error(line, format!("parse error: {message}"));
            }
        }
    }

    fn check_if(&mut self, if_instr: &mut IfInstr) {
        let cond_ty = self.check_expr(&mut if_instr.condition);
        if !matches!(cond_ty, Ty::Bool | Ty::Unknown) {
            self.error(
                if_instr.condition.line,
                format!("type error in if condition: '{cond_ty}'"),
            );
        }
        self.check_block(&mut if_instr.then_block, ScopeKind::Branch);
        if let Some(else_block) = &mut if_instr.else_block {
            self.check_block(else_block, ScopeKind::Branch);
        }
    }

    fn check_while(&mut self, while_loop: &mut WhileLoop) {
        let cond_ty = self.check_expr(&mut while_loop.condition);
        if !matches!(cond_ty, Ty::Bool | Ty::Unknown) {
            self.error(
                while_loop.condition.line,
                format!("type error in while condition: '{cond_ty}'"),
            );
        }
        // kind mismatch does not block visiting the body
        self.env.push_scope(ScopeKind::Loop);
        self.check_instrs(&mut while_loop.body.instructions);
        self.env.pop_scope();
    }

    fn check_for(&mut self, for_loop: &mut ForLoop) {
        let range_ty = self.check_expr(&mut for_loop.range);
        if !matches!(range_ty, Ty::Range | Ty::Unknown) {
            self.error(
                for_loop.range.line,
                format!("for loop requires a range, got {range_ty}"),
            );
        }
        // one frame for the whole loop; the loop variable lives in it
        self.env.push_scope(ScopeKind::Loop);
        self.env.define(&for_loop.var.name, Ty::Int);
        self.check_instrs(&mut for_loop.body.instructions);
        self.env.pop_scope();
    }

    // ══════════════════════════════════════════════════════════════════════
    // Assignment
    // ══════════════════════════════════════════════════════════════════════

    fn check_assign(&mut self, assign: &mut AssignInstr, line: u32) {
        let mut value_ty = self.check_expr(&mut assign.value);
        if matches!(value_ty, Ty::Range) {
            self.error(assign.value.line, RANGE_MISUSE);
            value_ty = Ty::Unknown;
        }

        match &mut assign.target {
            AssignTarget::Variable(ident) => match assign.op.base_op() {
                // plain `=` (re)declares in the current frame; the recorded
                // kind may change between assignments
                None => self.env.define(&ident.name, value_ty),
                Some(base) => {
                    let Some(target_ty) = self.env.lookup(&ident.name).cloned() else {
                        self.error(ident.line, format!("undeclared variable '{}'", ident.name));
                        return;
                    };
                    let result =
                        self.resolve_binary(base, assign.op.as_str(), &target_ty, &value_ty, line);
                    self.env.define(&ident.name, result);
                }
            },
            AssignTarget::Index { base, indexes } => {
                if matches!(value_ty, Ty::Str | Ty::Matrix { .. }) {
                    self.error(
                        line,
                        format!("cannot assign {value_ty} into a matrix element"),
                    );
                }
                let elem_ty = self.check_index(base, indexes);
                // a write must fully address one element; a partial index
                // path resolves to a row
                if matches!(elem_ty, Ty::Matrix { .. }) {
                    self.error(line, "an indexed assignment must address a single element");
                }
                if let Some(base_op) = assign.op.base_op() {
                    self.resolve_binary(base_op, assign.op.as_str(), &elem_ty, &value_ty, line);
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn check_expr(&mut self, expr: &mut Expr) -> Ty {
        let line = expr.line;
        match &mut expr.kind {
            // ── Literals ──
            ExprKind::IntLit(_) => Ty::Int,
            ExprKind::FloatLit(_) => Ty::Float,
            ExprKind::StrLit(_) => Ty::Str,

            // ── References ──
            ExprKind::Variable(name) => {
                // a read never creates a binding
                if let Some(ty) = self.env.lookup(name) {
                    ty.clone()
                } else {
                    self.error(line, format!("undeclared variable '{name}'"));
                    Ty::Unknown
                }
            }
            ExprKind::Index { base, indexes } => self.check_index(base, indexes),

            // ── Range ──
            ExprKind::Range { start, end } => {
                let start_ty = self.check_expr(start);
                let end_ty = self.check_expr(end);
                let endpoint_ok = |ty: &Ty| matches!(ty, Ty::Int | Ty::Unknown);
                if !endpoint_ok(&start_ty) || !endpoint_ok(&end_ty) {
                    self.error(
                        line,
                        format!("type error in range: start is {start_ty}, end is {end_ty}"),
                    );
                }
                Ty::Range
            }

            // ── Operators ──
            ExprKind::Binary {
                op,
                left,
                right,
                shape,
            } => {
                let op = *op;
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                let result = self.resolve_binary(op, op.as_str(), &left_ty, &right_ty, line);
                *shape = result.shape();
                result
            }
            ExprKind::Unary { op, operand, shape } => {
                let op = *op;
                let operand_ty = self.check_expr(operand);
                self.check_unary(op, operand_ty, shape, line)
            }

            // ── Aggregates ──
            ExprKind::MatrixLit {
                values,
                shape,
                elem,
            } => self.check_matrix_lit(values, shape, elem, line),
            ExprKind::Builtin { name, args, shape } => self.check_builtin(name, args, shape, line),
        }
    }

    fn check_unary(
        &mut self,
        op: UnOp,
        operand_ty: Ty,
        shape_slot: &mut Option<Shape>,
        line: u32,
    ) -> Ty {
        match op {
            UnOp::Neg => match operand_ty {
                Ty::Int | Ty::Float | Ty::Unknown => operand_ty,
                other => {
                    self.error(line, format!("type error in unary expression: - {other}"));
                    Ty::Unknown
                }
            },
            UnOp::Transpose => match operand_ty {
                Ty::Matrix { elem, shape } => {
                    // the evaluator reads the operand shape off this node
                    *shape_slot = Some(shape);
                    Ty::Matrix {
                        elem,
                        shape: shape.transposed(),
                    }
                }
                Ty::Unknown => Ty::Unknown,
                other => {
                    self.error(line, format!("transpose requires a matrix, got {other}"));
                    Ty::Unknown
                }
            },
        }
    }

    /// Consult the closed operator table and validate matrix operand shapes.
    /// `symbol` is the source spelling (a compound assignment reports its
    /// own operator).
    fn resolve_binary(
        &mut self,
        op: BinOp,
        symbol: &str,
        left_ty: &Ty,
        right_ty: &Ty,
        line: u32,
    ) -> Ty {
        if left_ty.is_unknown() || right_ty.is_unknown() {
            return Ty::Unknown;
        }
        let Some(result) = binary_result(op, left_ty, right_ty) else {
            self.error(
                line,
                format!("type error in binary expression: {left_ty} {symbol} {right_ty}"),
            );
            return Ty::Unknown;
        };
        if let (Ty::Matrix { shape: ls, .. }, Ty::Matrix { shape: rs, .. }) = (left_ty, right_ty) {
            if op.is_elementwise() && !ls.agrees_with(rs) {
                self.error(
                    line,
                    format!("elementwise '{symbol}' requires matching shapes, got {ls} and {rs}"),
                );
            }
            if op == BinOp::Mul {
                if let (Some(inner_left), Some(inner_right)) = (ls.axis(1), rs.axis(0)) {
                    if inner_left != inner_right {
                        self.error(
                            line,
                            format!(
                                "matrix multiplication requires inner dimensions to agree, got {ls} and {rs}"
                            ),
                        );
                    }
                }
            }
        }
        result
    }

    // ══════════════════════════════════════════════════════════════════════
    // Indexed references
    // ══════════════════════════════════════════════════════════════════════

    /// Shared validation for `A[i, j]` reads and writes. Returns the kind
    /// the reference resolves to.
    fn check_index(&mut self, base: &Ident, indexes: &mut [Expr]) -> Ty {
        let mut index_tys = Vec::with_capacity(indexes.len());
        for index in indexes.iter_mut() {
            index_tys.push(self.check_expr(index));
        }
        for (index, ty) in indexes.iter().zip(&index_tys) {
            if !matches!(ty, Ty::Int | Ty::Unknown) {
                self.error(index.line, format!("matrix index must be int, got {ty}"));
            }
        }

        let base_ty = match self.env.lookup(&base.name) {
            Some(ty) => ty.clone(),
            None => {
                self.error(base.line, format!("undeclared variable '{}'", base.name));
                return Ty::Unknown;
            }
        };
        let Ty::Matrix { elem, shape } = base_ty else {
            if !base_ty.is_unknown() {
                self.error(
                    base.line,
                    format!("indexing requires a matrix, '{}' is {base_ty}", base.name),
                );
            }
            return Ty::Unknown;
        };

        let dims = shape.dims();
        if indexes.len() > dims {
            self.error(
                base.line,
                format!(
                    "too many indexes for '{}': got {}, matrix has {} dimension(s)",
                    base.name,
                    indexes.len(),
                    dims
                ),
            );
            return Ty::Unknown;
        }

        // literal indexes are bounds-checked statically; the rest at runtime
        for (position, index) in indexes.iter().enumerate() {
            let Some(n) = literal_int(index) else { continue };
            let bound = if dims == 1 {
                shape.axis(1)
            } else {
                shape.axis(position)
            };
            if let Some(bound) = bound {
                if n < 0 || n >= bound {
                    self.error(
                        index.line,
                        format!("index {n} out of bounds for a dimension of size {bound}"),
                    );
                }
            }
        }

        if indexes.len() == dims {
            Ty::from_elem(elem)
        } else {
            // a single index into a 2-D matrix selects a row
            Ty::Matrix {
                elem,
                shape: Shape::row(shape.cols),
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Matrix literals
    // ══════════════════════════════════════════════════════════════════════

    fn check_matrix_lit(
        &mut self,
        values: &mut [Expr],
        shape_slot: &mut Option<Shape>,
        elem_slot: &mut Option<ElemKind>,
        line: u32,
    ) -> Ty {
        if values.is_empty() {
            self.error(line, "empty matrix literal");
            // kind stays matrix so downstream checks can recover
            let shape = Shape::row(0);
            *shape_slot = Some(shape);
            return Ty::Matrix {
                elem: ElemKind::Int,
                shape,
            };
        }

        let nested = matches!(values[0].kind, ExprKind::MatrixLit { .. });
        let (elem, shape) = if nested {
            self.check_nested_rows(values, line)
        } else {
            self.check_flat_elements(values, line)
        };

        *shape_slot = Some(shape);
        *elem_slot = Some(elem);
        Ty::Matrix { elem, shape }
    }

    /// `{{1, 2}, {3, 4}}`: every element must be a flat row of the same
    /// width and element kind.
    fn check_nested_rows(&mut self, values: &mut [Expr], line: u32) -> (ElemKind, Shape) {
        let height = values.len() as i64;
        let mut width: Option<i64> = None;
        let mut elem: Option<ElemKind> = None;

        for value in values.iter_mut() {
            let ty = self.check_expr(value);
            let Ty::Matrix {
                elem: row_elem,
                shape: row_shape,
            } = ty
            else {
                if !ty.is_unknown() {
                    self.error(value.line, "matrix literal mixes scalar and row elements");
                }
                continue;
            };
            if row_shape.rows != 1 {
                self.error(value.line, "matrix literal rows must be flat vectors");
                continue;
            }
            match width {
                None => width = Some(row_shape.cols),
                Some(expected) if expected != row_shape.cols => {
                    self.error(
                        value.line,
                        format!(
                            "inconsistent row widths in matrix literal: {} and {}",
                            expected, row_shape.cols
                        ),
                    );
                }
                Some(_) => {}
            }
            match elem {
                None => elem = Some(row_elem),
                Some(expected) if expected != row_elem => {
                    self.error(
                        value.line,
                        format!(
                            "mixed types in matrix literal: {} and {}",
                            expected.as_str(),
                            row_elem.as_str()
                        ),
                    );
                }
                Some(_) => {}
            }
        }

        (
            elem.unwrap_or(ElemKind::Int),
            Shape::new(height, width.unwrap_or(0)),
        )
    }

    /// `{1, 2, 3}`: every element must be a scalar of one consistent kind.
    fn check_flat_elements(&mut self, values: &mut [Expr], _line: u32) -> (ElemKind, Shape) {
        let width = values.len() as i64;
        let mut elem: Option<ElemKind> = None;

        for value in values.iter_mut() {
            let ty = self.check_expr(value);
            let Some(value_elem) = ty.as_elem() else {
                if !ty.is_unknown() {
                    self.error(
                        value.line,
                        format!("matrix elements must be scalars, got {ty}"),
                    );
                }
                continue;
            };
            match elem {
                None => elem = Some(value_elem),
                Some(expected) if expected != value_elem => {
                    self.error(
                        value.line,
                        format!(
                            "mixed types in matrix literal: {} and {}",
                            expected.as_str(),
                            value_elem.as_str()
                        ),
                    );
                }
                Some(_) => {}
            }
        }

        (elem.unwrap_or(ElemKind::Int), Shape::row(width))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Builtin calls
    // ══════════════════════════════════════════════════════════════════════

    fn check_builtin(
        &mut self,
        name: &Ident,
        args: &mut [Expr],
        shape_slot: &mut Option<Shape>,
        line: u32,
    ) -> Ty {
        for arg in args.iter_mut() {
            let ty = self.check_expr(arg);
            if !matches!(ty, Ty::Int | Ty::Unknown) {
                self.error(
                    arg.line,
                    format!("'{}' argument must be int, got {ty}", name.name),
                );
            }
        }
        // a literal argument pins the axis; anything else stays unknown
        // until runtime
        let dim = |i: usize| {
            args.get(i)
                .and_then(literal_int)
                .unwrap_or(Shape::UNKNOWN)
        };

        let shape = match name.name.as_str() {
            "eye" => {
                if args.len() != 1 {
                    self.error(
                        line,
                        format!("'eye' expects 1 argument, got {}", args.len()),
                    );
                }
                Shape::square(dim(0))
            }
            "zeros" | "ones" => match args.len() {
                1 => Shape::square(dim(0)),
                2 => Shape::new(dim(0), dim(1)),
                n => {
                    self.error(
                        line,
                        format!("'{}' expects 1 or 2 arguments, got {n}", name.name),
                    );
                    Shape::square(Shape::UNKNOWN)
                }
            },
            other => {
                self.error(name.line, format!("unknown function '{other}'"));
                return Ty::Unknown;
            }
        };

        *shape_slot = Some(shape);
        Ty::Matrix {
            elem: ElemKind::Float,
            shape,
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// The value of a literal integer index or dimension argument, if the
/// expression is one.
fn literal_int(expr: &Expr) -> Option<i64> {
    match expr.kind {
        ExprKind::IntLit(n) => Some(n),
        _ => None,
    }
}
