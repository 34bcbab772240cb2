//! AST node types for the Minimat language.
//!
//! Every node carries a 1-based source line number for diagnostics.
//! Large recursive types are boxed to keep enum sizes reasonable.
//!
//! The tree is produced by an external parser. The `shape`/`elem` slots on
//! expression nodes start out as `None` and are filled in by the checker;
//! the evaluator reads them where runtime dispatch depends on a static
//! shape (transpose).

use crate::Shape;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete Minimat program: an ordered instruction sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instr>,
    pub line: u32,
}

impl Program {
    /// True if the parser left an error placeholder anywhere in the tree.
    /// Such a program is not valid input for checking or evaluation.
    pub fn has_parse_errors(&self) -> bool {
        fn block_has(block: &Block) -> bool {
            block.instructions.iter().any(instr_has)
        }
        fn instr_has(instr: &Instr) -> bool {
            match &instr.kind {
                InstrKind::ParseError(_) => true,
                InstrKind::If(if_instr) => {
                    block_has(&if_instr.then_block)
                        || if_instr.else_block.as_ref().is_some_and(block_has)
                }
                InstrKind::For(for_loop) => block_has(&for_loop.body),
                InstrKind::While(while_loop) => block_has(&while_loop.body),
                _ => false,
            }
        }
        self.instructions.iter().any(instr_has)
    }
}

/// `{ instructions... }` — the body of an if-branch or loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub instructions: Vec<Instr>,
    pub line: u32,
}

/// An identifier with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub line: u32,
}

impl Ident {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instructions
// ══════════════════════════════════════════════════════════════════════════════

/// An instruction node.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub kind: InstrKind,
    pub line: u32,
}

impl Instr {
    pub fn new(kind: InstrKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// The kind of instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    /// `x = expr`, `x += expr`, `A[i, j] = expr`, ...
    Assign(AssignInstr),
    /// `return expr`
    Return(Expr),
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `if (cond) { ... } [else { ... }]`
    If(IfInstr),
    /// `print arg, arg, ...`
    Print(Vec<Expr>),
    /// `for i = start:end { ... }`
    For(ForLoop),
    /// `while (cond) { ... }`
    While(WhileLoop),
    /// Placeholder emitted by the parser for a construct it could not parse.
    ParseError(String),
}

/// An assignment: compound operators read the target before writing it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignInstr {
    pub op: AssignOp,
    pub target: AssignTarget,
    pub value: Expr,
}

/// The left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    /// A bare variable — plain `=` (re)declares it.
    Variable(Ident),
    /// An indexed element of a matrix variable.
    Index { base: Ident, indexes: Vec<Expr> },
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        }
    }

    /// The binary operator a compound assignment applies, if any.
    pub fn base_op(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
        }
    }
}

/// `if (cond) { then } [else { else }]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfInstr {
    pub condition: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

/// `for var = range { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub var: Ident,
    pub range: Expr,
    pub body: Block,
}

/// `while (cond) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: Expr,
    pub body: Block,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `42`
    IntLit(i64),
    /// `3.14`
    FloatLit(f64),
    /// `"hello"`
    StrLit(String),

    // ── References ──
    /// `x`
    Variable(String),
    /// `A[i]`, `A[i, j]`
    Index { base: Ident, indexes: Vec<Expr> },

    // ── Operators & aggregates ──
    /// `start:end` — only a for-loop may consume this.
    Range { start: Box<Expr>, end: Box<Expr> },
    /// `a + b`, `A .* B`, `a < b`, ...
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        /// Result shape, filled in by the checker for matrix results.
        shape: Option<Shape>,
    },
    /// `-x`, `A'`
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        /// For transpose: the *operand's* checker-resolved shape. The
        /// evaluator requires it to pick the reshape strategy.
        shape: Option<Shape>,
    },
    /// `{1, 2, 3}` or `{{1, 2}, {3, 4}}`
    MatrixLit {
        values: Vec<Expr>,
        /// `[height, width]`, filled in by the checker.
        shape: Option<Shape>,
        /// Common element kind, filled in by the checker.
        elem: Option<ElemKind>,
    },
    /// `eye(n)`, `zeros(r, c)`, `ones(n)` — `name` keeps the source
    /// spelling so the checker can flag unrecognized calls.
    Builtin {
        name: Ident,
        args: Vec<Expr>,
        /// Result shape, filled in by the checker (unknown axes as `-1`).
        shape: Option<Shape>,
    },
}

/// Scalar kind of a matrix's entries, as resolved by the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKind {
    Int,
    Float,
    Str,
}

impl ElemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElemKind::Int => "int",
            ElemKind::Float => "float",
            ElemKind::Str => "str",
        }
    }
}

// ── Binary Operators ──────────────────────────────────────────────────────────

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Elementwise matrix arithmetic
    DotAdd,
    DotSub,
    DotMul,
    DotDiv,
    // Comparison
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Eq,
    NotEq,
}

impl BinOp {
    /// Returns the operator symbol for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::DotAdd => ".+",
            BinOp::DotSub => ".-",
            BinOp::DotMul => ".*",
            BinOp::DotDiv => "./",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
        }
    }

    /// True for `.+ .- .* ./`.
    pub fn is_elementwise(&self) -> bool {
        matches!(
            self,
            BinOp::DotAdd | BinOp::DotSub | BinOp::DotMul | BinOp::DotDiv
        )
    }

    /// True for `< > <= >= == !=`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Less
                | BinOp::Greater
                | BinOp::LessEq
                | BinOp::GreaterEq
                | BinOp::Eq
                | BinOp::NotEq
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// `-x`
    Neg,
    /// `x'` — matrix transpose
    Transpose,
}

impl UnOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Transpose => "'",
        }
    }
}
