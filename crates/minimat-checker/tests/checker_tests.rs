//! Type-checker integration tests.
//!
//! Each test builds a small AST (the parser is an external collaborator)
//! and asserts on the presence or absence of specific diagnostics.

use minimat_checker::check;
use minimat_types::ast::*;
use minimat_types::Diagnostics;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn program(instructions: Vec<Instr>) -> Program {
    Program {
        instructions,
        line: 1,
    }
}

fn block(instructions: Vec<Instr>) -> Block {
    Block {
        instructions,
        line: 1,
    }
}

fn int(n: i64) -> Expr {
    Expr::new(ExprKind::IntLit(n), 1)
}

fn float(x: f64) -> Expr {
    Expr::new(ExprKind::FloatLit(x), 1)
}

fn str_lit(s: &str) -> Expr {
    Expr::new(ExprKind::StrLit(s.into()), 1)
}

fn var(name: &str) -> Expr {
    Expr::new(ExprKind::Variable(name.into()), 1)
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            shape: None,
        },
        1,
    )
}

fn unary(op: UnOp, operand: Expr) -> Expr {
    Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
            shape: None,
        },
        1,
    )
}

fn range(start: Expr, end: Expr) -> Expr {
    Expr::new(
        ExprKind::Range {
            start: Box::new(start),
            end: Box::new(end),
        },
        1,
    )
}

fn index(base: &str, indexes: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Index {
            base: Ident::new(base, 1),
            indexes,
        },
        1,
    )
}

fn matrix(values: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::MatrixLit {
            values,
            shape: None,
            elem: None,
        },
        1,
    )
}

/// A flat row of int literals.
fn row(values: &[i64]) -> Expr {
    matrix(values.iter().map(|&n| int(n)).collect())
}

fn builtin(name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Builtin {
            name: Ident::new(name, 1),
            args,
            shape: None,
        },
        1,
    )
}

fn assign(name: &str, value: Expr) -> Instr {
    assign_op(AssignOp::Assign, name, value)
}

fn assign_op(op: AssignOp, name: &str, value: Expr) -> Instr {
    Instr::new(
        InstrKind::Assign(AssignInstr {
            op,
            target: AssignTarget::Variable(Ident::new(name, 1)),
            value,
        }),
        1,
    )
}

fn assign_index(base: &str, indexes: Vec<Expr>, value: Expr) -> Instr {
    Instr::new(
        InstrKind::Assign(AssignInstr {
            op: AssignOp::Assign,
            target: AssignTarget::Index {
                base: Ident::new(base, 1),
                indexes,
            },
            value,
        }),
        1,
    )
}

fn print_instr(args: Vec<Expr>) -> Instr {
    Instr::new(InstrKind::Print(args), 1)
}

fn ret(value: Expr) -> Instr {
    Instr::new(InstrKind::Return(value), 1)
}

fn if_instr(condition: Expr, then: Vec<Instr>, els: Option<Vec<Instr>>) -> Instr {
    Instr::new(
        InstrKind::If(IfInstr {
            condition,
            then_block: block(then),
            else_block: els.map(block),
        }),
        1,
    )
}

fn for_instr(var_name: &str, start: Expr, end: Expr, body: Vec<Instr>) -> Instr {
    Instr::new(
        InstrKind::For(ForLoop {
            var: Ident::new(var_name, 1),
            range: range(start, end),
            body: block(body),
        }),
        1,
    )
}

fn while_instr(condition: Expr, body: Vec<Instr>) -> Instr {
    Instr::new(
        InstrKind::While(WhileLoop {
            condition,
            body: block(body),
        }),
        1,
    )
}

fn run_check(instrs: Vec<Instr>) -> Diagnostics {
    check(&mut program(instrs))
}

fn assert_ok(instrs: Vec<Instr>) {
    let diags = run_check(instrs);
    assert!(
        diags.is_empty(),
        "expected no diagnostics, got:\n{}",
        diags
            .iter()
            .map(|d| format!("  {d}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn assert_diag(instrs: Vec<Instr>, fragment: &str) {
    let diags = run_check(instrs);
    assert!(
        diags.iter().any(|d| d.message.contains(fragment)),
        "expected a diagnostic containing {fragment:?}, got:\n{}",
        diags
            .iter()
            .map(|d| format!("  {d}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Variables & assignment
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn first_assignment_declares() {
    assert_ok(vec![assign("x", int(1)), print_instr(vec![var("x")])]);
}

#[test]
fn undeclared_variable_is_one_diagnostic_and_checking_continues() {
    let diags = run_check(vec![
        print_instr(vec![var("x")]),
        assign("y", int(1)),
        print_instr(vec![var("y"), var("z")]),
    ]);
    assert_eq!(diags.len(), 2);
    assert!(diags.iter().any(|d| d.message.contains("'x'")));
    assert!(diags.iter().any(|d| d.message.contains("'z'")));
}

#[test]
fn reading_a_variable_never_declares_it() {
    // both reads of 'x' are flagged — the first read did not create it
    let diags = run_check(vec![
        print_instr(vec![var("x")]),
        print_instr(vec![var("x")]),
    ]);
    assert_eq!(diags.len(), 2);
}

#[test]
fn reassignment_may_change_the_recorded_kind() {
    assert_ok(vec![
        assign("x", int(1)),
        assign("x", str_lit("hello")),
        if_instr(
            binary(BinOp::Eq, var("x"), str_lit("hello")),
            vec![print_instr(vec![var("x")])],
            None,
        ),
    ]);
}

#[test]
fn compound_assignment_promotes_int_to_float() {
    // x: int, then x += 2.5 makes it float — a float range endpoint is
    // rejected, which observes the promotion
    assert_diag(
        vec![
            assign("x", int(1)),
            assign_op(AssignOp::AddAssign, "x", float(2.5)),
            for_instr("i", var("x"), int(3), vec![]),
        ],
        "type error in range",
    );
    // control: += int keeps it int
    assert_ok(vec![
        assign("x", int(1)),
        assign_op(AssignOp::AddAssign, "x", int(2)),
        for_instr("i", var("x"), int(3), vec![]),
    ]);
}

#[test]
fn int_division_yields_float() {
    assert_diag(
        vec![
            assign("x", binary(BinOp::Div, int(1), int(2))),
            for_instr("i", var("x"), int(3), vec![]),
        ],
        "type error in range",
    );
}

#[test]
fn compound_assignment_to_undeclared_variable() {
    assert_diag(
        vec![assign_op(AssignOp::AddAssign, "x", int(1))],
        "undeclared variable 'x'",
    );
}

#[test]
fn compound_assignment_reports_its_own_symbol() {
    assert_diag(
        vec![
            assign("x", str_lit("a")),
            assign_op(AssignOp::SubAssign, "x", int(1)),
        ],
        "str -= int",
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn string_arithmetic_is_rejected() {
    assert_diag(
        vec![assign("x", binary(BinOp::Add, str_lit("a"), str_lit("b")))],
        "type error in binary expression",
    );
}

#[test]
fn comparing_string_to_number_is_rejected() {
    assert_diag(
        vec![assign("x", binary(BinOp::Less, str_lit("a"), int(1)))],
        "type error in binary expression",
    );
}

#[test]
fn mixed_numeric_comparison_is_accepted() {
    assert_ok(vec![if_instr(
        binary(BinOp::Less, int(1), float(2.5)),
        vec![],
        None,
    )]);
}

#[test]
fn negation_preserves_numeric_kinds() {
    assert_ok(vec![
        assign("x", unary(UnOp::Neg, int(1))),
        for_instr("i", var("x"), int(3), vec![]),
    ]);
    assert_diag(
        vec![assign("x", unary(UnOp::Neg, str_lit("a")))],
        "type error in unary expression",
    );
}

#[test]
fn unknown_operand_suppresses_cascading_diagnostics() {
    // only the undeclared read is reported, not the binary expression
    let diags = run_check(vec![assign("y", binary(BinOp::Add, var("x"), int(1)))]);
    assert_eq!(diags.len(), 1);
    assert!(diags.diagnostics[0].message.contains("undeclared"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Conditions, loops & control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn if_condition_must_be_bool() {
    assert_diag(
        vec![if_instr(int(1), vec![], None)],
        "type error in if condition",
    );
}

#[test]
fn while_condition_must_be_bool() {
    assert_diag(
        vec![while_instr(int(1), vec![])],
        "type error in while condition",
    );
}

#[test]
fn condition_mismatch_still_visits_the_body() {
    let diags = run_check(vec![if_instr(
        int(1),
        vec![print_instr(vec![var("missing")])],
        None,
    )]);
    assert_eq!(diags.len(), 2);
}

#[test]
fn range_endpoints_must_be_int() {
    assert_diag(
        vec![for_instr("i", int(1), float(2.5), vec![])],
        "type error in range",
    );
}

#[test]
fn range_outside_for_loop_is_rejected() {
    assert_diag(
        vec![assign("x", range(int(1), int(5)))],
        "only usable in a for loop",
    );
    assert_diag(
        vec![print_instr(vec![range(int(1), int(5))])],
        "only usable in a for loop",
    );
}

#[test]
fn break_and_continue_require_a_loop() {
    assert_diag(
        vec![Instr::new(InstrKind::Break, 1)],
        "'break' outside of a loop",
    );
    assert_diag(
        vec![Instr::new(InstrKind::Continue, 1)],
        "'continue' outside of a loop",
    );
}

#[test]
fn break_inside_an_if_inside_a_loop_is_fine() {
    assert_ok(vec![for_instr(
        "i",
        int(0),
        int(3),
        vec![if_instr(
            binary(BinOp::Eq, var("i"), int(1)),
            vec![Instr::new(InstrKind::Break, 1)],
            None,
        )],
    )]);
}

#[test]
fn loop_variable_is_int_and_scoped_to_the_loop() {
    assert_ok(vec![for_instr(
        "i",
        int(0),
        int(3),
        vec![assign("x", binary(BinOp::Add, var("i"), int(1)))],
    )]);
    // the loop frame is popped — 'i' is gone afterwards
    assert_diag(
        vec![
            for_instr("i", int(0), int(3), vec![]),
            print_instr(vec![var("i")]),
        ],
        "undeclared variable 'i'",
    );
}

#[test]
fn branch_frames_are_popped() {
    assert_diag(
        vec![
            if_instr(
                binary(BinOp::Less, int(1), int(2)),
                vec![assign("y", int(1))],
                None,
            ),
            print_instr(vec![var("y")]),
        ],
        "undeclared variable 'y'",
    );
}

#[test]
fn return_accepts_any_kind() {
    assert_ok(vec![ret(binary(BinOp::Add, int(1), int(2)))]);
    assert_ok(vec![ret(str_lit("done"))]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Matrix literals
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn flat_and_nested_literals_are_accepted() {
    assert_ok(vec![assign("v", row(&[1, 2, 3]))]);
    assert_ok(vec![assign(
        "a",
        matrix(vec![row(&[1, 2]), row(&[3, 4])]),
    )]);
}

#[test]
fn empty_matrix_literal_is_rejected() {
    assert_diag(vec![assign("v", matrix(vec![]))], "empty matrix literal");
}

#[test]
fn mixed_element_kinds_are_rejected() {
    assert_diag(
        vec![assign("v", matrix(vec![int(1), float(2.5)]))],
        "mixed types in matrix literal",
    );
}

#[test]
fn ragged_rows_are_rejected() {
    assert_diag(
        vec![assign("a", matrix(vec![row(&[1, 2]), row(&[3])]))],
        "inconsistent row widths",
    );
}

#[test]
fn elementwise_shape_mismatch_is_static_when_shapes_are_known() {
    assert_diag(
        vec![
            assign("a", matrix(vec![row(&[1, 2]), row(&[3, 4])])),
            assign("b", row(&[1, 2])),
            assign("c", binary(BinOp::DotAdd, var("a"), var("b"))),
        ],
        "requires matching shapes",
    );
}

#[test]
fn matmul_inner_dimensions_are_checked_statically() {
    assert_diag(
        vec![
            assign("a", builtin("zeros", vec![int(2), int(3)])),
            assign("b", builtin("zeros", vec![int(2), int(2)])),
            assign("c", binary(BinOp::Mul, var("a"), var("b"))),
        ],
        "inner dimensions",
    );
    assert_ok(vec![
        assign("a", builtin("zeros", vec![int(2), int(3)])),
        assign("b", builtin("zeros", vec![int(3), int(4)])),
        assign("c", binary(BinOp::Mul, var("a"), var("b"))),
    ]);
}

#[test]
fn matmul_result_shape_flows_into_the_symbol() {
    // zeros(2,3) * zeros(3,4) is 2x4 — c[1,3] is in bounds, c[2,0] is not
    assert_ok(vec![
        assign("a", builtin("zeros", vec![int(2), int(3)])),
        assign("b", builtin("zeros", vec![int(3), int(4)])),
        assign("c", binary(BinOp::Mul, var("a"), var("b"))),
        print_instr(vec![index("c", vec![int(1), int(3)])]),
    ]);
    assert_diag(
        vec![
            assign("a", builtin("zeros", vec![int(2), int(3)])),
            assign("b", builtin("zeros", vec![int(3), int(4)])),
            assign("c", binary(BinOp::Mul, var("a"), var("b"))),
            print_instr(vec![index("c", vec![int(2), int(0)])]),
        ],
        "out of bounds",
    );
}

#[test]
fn broadcast_exists_only_for_addition() {
    assert_ok(vec![
        assign("a", builtin("zeros", vec![int(2)])),
        assign("b", binary(BinOp::Add, var("a"), int(1))),
        assign("c", binary(BinOp::Add, int(1), var("a"))),
    ]);
    assert_diag(
        vec![
            assign("a", builtin("zeros", vec![int(2)])),
            assign("b", binary(BinOp::Sub, var("a"), int(1))),
        ],
        "type error in binary expression",
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Transpose
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn transpose_requires_a_matrix() {
    assert_diag(
        vec![assign("x", int(1)), assign("y", unary(UnOp::Transpose, var("x")))],
        "transpose requires a matrix",
    );
}

#[test]
fn transpose_swaps_the_recorded_shape() {
    // zeros(2,3)' is 3x2 — b[2,1] is in bounds, b[1,2] is not
    assert_ok(vec![
        assign("a", builtin("zeros", vec![int(2), int(3)])),
        assign("b", unary(UnOp::Transpose, var("a"))),
        print_instr(vec![index("b", vec![int(2), int(1)])]),
    ]);
    assert_diag(
        vec![
            assign("a", builtin("zeros", vec![int(2), int(3)])),
            assign("b", unary(UnOp::Transpose, var("a"))),
            print_instr(vec![index("b", vec![int(1), int(2)])]),
        ],
        "out of bounds",
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Indexed references
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn indexing_requires_a_matrix_base() {
    assert_diag(
        vec![assign("x", int(1)), print_instr(vec![index("x", vec![int(0)])])],
        "indexing requires a matrix",
    );
}

#[test]
fn too_many_indexes_for_a_flat_vector() {
    assert_diag(
        vec![
            assign("v", row(&[1, 2, 3])),
            print_instr(vec![index("v", vec![int(0), int(1)])]),
        ],
        "too many indexes",
    );
}

#[test]
fn literal_index_bounds_are_checked() {
    assert_ok(vec![
        assign("v", row(&[1, 2, 3])),
        print_instr(vec![index("v", vec![int(2)])]),
    ]);
    assert_diag(
        vec![
            assign("v", row(&[1, 2, 3])),
            print_instr(vec![index("v", vec![int(3)])]),
        ],
        "out of bounds",
    );
}

#[test]
fn non_literal_indexes_are_left_to_the_runtime() {
    assert_ok(vec![
        assign("v", row(&[1, 2, 3])),
        assign("i", int(99)),
        print_instr(vec![index("v", vec![var("i")])]),
    ]);
}

#[test]
fn indexes_must_be_int() {
    assert_diag(
        vec![
            assign("v", row(&[1, 2])),
            print_instr(vec![index("v", vec![float(1.5)])]),
        ],
        "matrix index must be int",
    );
}

#[test]
fn single_index_into_a_matrix_selects_a_row() {
    // a[0] is a 1x2 row — indexing it once more is fine
    assert_ok(vec![
        assign("a", matrix(vec![row(&[1, 2]), row(&[3, 4])])),
        assign("r", index("a", vec![int(0)])),
        print_instr(vec![index("r", vec![int(1)])]),
    ]);
}

#[test]
fn unknown_builtin_axes_skip_bound_checks() {
    assert_ok(vec![
        assign("n", int(2)),
        assign("a", builtin("zeros", vec![var("n")])),
        print_instr(vec![index("a", vec![int(5), int(5)])]),
    ]);
}

#[test]
fn indexed_assignment_must_address_an_element() {
    assert_diag(
        vec![
            assign("a", builtin("zeros", vec![int(2)])),
            assign_index("a", vec![int(0)], int(5)),
        ],
        "must address a single element",
    );
}

#[test]
fn indexed_assignment_forbids_str_and_matrix_values() {
    assert_diag(
        vec![
            assign("a", builtin("zeros", vec![int(2)])),
            assign_index("a", vec![int(0), int(0)], str_lit("x")),
        ],
        "cannot assign str",
    );
    assert_diag(
        vec![
            assign("a", builtin("zeros", vec![int(2)])),
            assign_index("a", vec![int(0), int(0)], row(&[1, 2])),
        ],
        "cannot assign matrix",
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Builtin calls
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn unrecognized_builtin_names_are_rejected() {
    assert_diag(
        vec![assign("x", builtin("rand", vec![int(2)]))],
        "unknown function 'rand'",
    );
}

#[test]
fn eye_takes_exactly_one_argument() {
    assert_ok(vec![assign("a", builtin("eye", vec![int(3)]))]);
    assert_diag(
        vec![assign("a", builtin("eye", vec![int(2), int(3)]))],
        "'eye' expects 1 argument",
    );
}

#[test]
fn zeros_and_ones_take_one_or_two_arguments() {
    assert_ok(vec![assign("a", builtin("zeros", vec![int(2)]))]);
    assert_ok(vec![assign("a", builtin("ones", vec![int(2), int(3)]))]);
    assert_diag(
        vec![assign("a", builtin("zeros", vec![int(1), int(2), int(3)]))],
        "expects 1 or 2 arguments",
    );
}

#[test]
fn builtin_arguments_must_be_int() {
    assert_diag(
        vec![assign("a", builtin("zeros", vec![float(2.5)]))],
        "argument must be int",
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Scenarios & the scoping divergence
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn scenario_zeros_write_print_has_no_diagnostics() {
    // A = zeros(2); A[0,0] = 1; print A;
    assert_ok(vec![
        assign("A", builtin("zeros", vec![int(2)])),
        assign_index("A", vec![int(0), int(0)], int(1)),
        print_instr(vec![var("A")]),
    ]);
}

#[test]
fn branch_reassignment_shadows_only_statically() {
    // The static chain writes the branch frame, so after the if the outer
    // 'x' is still int and the range is accepted. The runtime chain walks
    // outward and really updates 'x' — see the paired evaluator test.
    assert_ok(vec![
        assign("x", int(1)),
        if_instr(
            binary(BinOp::Less, int(1), int(2)),
            vec![assign("x", float(2.5))],
            None,
        ),
        for_instr("i", var("x"), int(3), vec![]),
    ]);
}

#[test]
fn parse_error_placeholder_is_surfaced() {
    assert_diag(
        vec![Instr::new(
            InstrKind::ParseError("unexpected token ';'".into()),
            1,
        )],
        "parse error",
    );
}

#[test]
fn parse_errors_are_detectable_before_checking() {
    // the driver gates both passes on this
    let with_error = program(vec![if_instr(
        binary(BinOp::Less, int(1), int(2)),
        vec![Instr::new(InstrKind::ParseError("bad expr".into()), 2)],
        None,
    )]);
    assert!(with_error.has_parse_errors());
    assert!(!program(vec![assign("x", int(1))]).has_parse_errors());
}

#[test]
fn diagnostics_carry_line_numbers() {
    let mut prog = program(vec![Instr::new(
        InstrKind::Print(vec![Expr::new(ExprKind::Variable("x".into()), 7)]),
        7,
    )]);
    let diags = check(&mut prog);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags.diagnostics[0].line, 7);
}
