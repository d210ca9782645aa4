//! Statement checks: clauses, branches and simple statements.

mod common;

use common::Checked;
use typeattr_analysis::TypeError;
use typeattr_syntax::ast::{BinaryOp, ChanDir, Param, Stmt};
use typeattr_syntax::AstBuilder;

/// Checks `func f(x int, ch chan int) <results> { body }`.
fn func(b: AstBuilder, results: Vec<Param>, body: Vec<Stmt>) -> Checked {
    let params = vec![
        b.param(&["x"], b.t("int")),
        b.param(&["ch"], b.t_chan(ChanDir::Both, b.t("int"))),
    ];
    let sig = b.sig(params, results);
    let decls = vec![b.func_decl("f", sig, Some(body))];
    Checked::new(b, decls)
}

fn int_result(b: &AstBuilder) -> Vec<Param> {
    vec![b.param(&[], b.t("int"))]
}

// ============================================================================
// Clauses and branches
// ============================================================================

#[test]
fn labeled_loops_and_branches_open_their_scopes() {
    let b = AstBuilder::new();
    let inner = b.for_stmt(None, None, None, vec![b.cont_to("L"), b.brk_to("L"), b.brk()]);
    let inner_id = inner.id;
    let outer = b.for_stmt(None, None, None, vec![inner]);
    let outer_id = outer.id;
    let body = vec![b.labeled("L", outer), b.goto("L")];
    let c = func(b, vec![], body);
    c.assert_ok();
    assert!(c.scope_names(outer_id).is_empty());
    assert!(c.scope_names(inner_id).is_empty());
}

#[test]
fn duplicate_cases_and_defaults() {
    let b = AstBuilder::new();
    let body = vec![b.switch_stmt(
        None,
        Some(b.name("x")),
        vec![
            b.case(vec![b.int("1")], vec![]),
            b.case(vec![b.int("1")], vec![]),
            b.case(vec![], vec![]),
            b.case(vec![], vec![]),
        ],
    )];
    let c = func(b, vec![], body);
    c.assert_error(TypeError::DuplicateCase, "duplicate case");
    c.assert_error(TypeError::DuplicateDefault, "multiple defaults");
}

// ============================================================================
// Simple statements
// ============================================================================

#[test]
fn unused_expression() {
    let b = AstBuilder::new();
    let body = vec![b.expr_stmt(b.binary(b.name("x"), BinaryOp::Add, b.int("1")))];
    let c = func(b, vec![], body);
    c.assert_error(TypeError::UnusedExpr, "is not used");
}

#[test]
fn calls_and_receives_are_statements() {
    let b = AstBuilder::new();
    let body = vec![
        b.expr_stmt(b.recv(b.name("ch"))),
        b.expr_stmt(b.call(b.name("println"), vec![b.name("x")])),
        b.send(b.name("ch"), b.name("x")),
        b.go_stmt(b.call(b.name("close"), vec![b.name("ch")])),
    ];
    func(b, vec![], body).assert_ok();
}

#[test]
fn send_needs_a_channel() {
    let b = AstBuilder::new();
    let body = vec![b.send(b.name("x"), b.int("1"))];
    let c = func(b, vec![], body);
    c.assert_error(TypeError::InvalidSend, "cannot send to non-chan type int");
}

#[test]
fn conditions_must_be_boolean() {
    let b = AstBuilder::new();
    let body = vec![b.if_stmt(None, b.name("x"), vec![], None)];
    let c = func(b, vec![], body);
    c.assert_error(TypeError::InvalidCond, "non-boolean condition in if statement");
}

#[test]
fn range_over_non_iterable() {
    let b = AstBuilder::new();
    let body = vec![b.range_stmt(Some(b.name("i")), None, true, b.name("x"), vec![])];
    let c = func(b, vec![], body);
    c.assert_error(TypeError::InvalidRangeExpr, "cannot range over");
}

#[test]
fn range_over_channel_takes_one_variable() {
    let b = AstBuilder::new();
    let body = vec![b.range_stmt(
        Some(b.name("v")),
        Some(b.name("w")),
        true,
        b.name("ch"),
        vec![],
    )];
    let c = func(b, vec![], body);
    c.assert_error(TypeError::InvalidRangeExpr, "permits only one iteration variable");
}

#[test]
fn result_count() {
    let b = AstBuilder::new();
    let body = vec![b.ret(vec![b.int("1")])];
    let c = func(b, vec![], body);
    c.assert_error(TypeError::WrongResultCount, "no result values expected");
}

#[test]
fn returns_are_matched_against_results() {
    let b = AstBuilder::new();
    let results = int_result(&b);
    let body = vec![b.ret(vec![b.name("ch")])];
    let c = func(b, results, body);
    c.assert_error(TypeError::TypeMismatch, "cannot use ch");
}
