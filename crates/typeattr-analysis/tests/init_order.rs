//! Package-level initialization order.

mod common;

use common::Checked;
use typeattr_analysis::{Config, TypeError};
use typeattr_syntax::ast::BinaryOp;
use typeattr_syntax::AstBuilder;

#[test]
fn dependencies_come_first() {
    let b = AstBuilder::new();
    let decls = vec![b.var_group(vec![
        b.var_spec(&["x"], None, vec![b.int("1")]),
        b.var_spec(&["y"], None, vec![b.name("x")]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["x = 1", "y = x"]);
}

#[test]
fn independent_variables_keep_declaration_order() {
    let b = AstBuilder::new();
    let decls = vec![
        b.var_group(vec![
            b.var_spec(&["a"], None, vec![b.int("1")]),
            b.var_spec(&["b"], None, vec![b.int("2")]),
            b.var_spec(&["c"], None, vec![b.int("3")]),
        ]),
        b.var_decl(&["d", "e", "f"], None, vec![b.int("4"), b.int("5"), b.int("6")]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["a = 1", "b = 2", "c = 3", "d = 4", "e = 5", "f = 6"]);
}

#[test]
fn blank_variables_are_initialized() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![], vec![b.param(&[], b.t("int"))]);
    let decls = vec![
        b.var_decl(&["_"], None, vec![b.call(b.name("f"), vec![])]),
        b.func_decl("f", sig, Some(vec![b.ret(vec![b.int("1")])])),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["_ = f()"]);
}

#[test]
fn chains_are_emitted_in_dependency_order() {
    let b = AstBuilder::new();
    let decls = vec![b.var_group(vec![
        b.var_spec(&["a"], None, vec![b.int("0")]),
        b.var_spec(&["x"], None, vec![b.name("y")]),
        b.var_spec(&["y"], None, vec![b.name("z")]),
        b.var_spec(&["z"], None, vec![b.int("0")]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["a = 0", "z = 0", "y = z", "x = y"]);
}

#[test]
fn comma_ok_initializer_is_one_entry() {
    let b = AstBuilder::new();
    let decls = vec![b.var_group(vec![
        b.var_spec(&["a", "_"], None, vec![b.index(b.name("m"), b.int("0"))]),
        b.var_spec(&["m"], Some(b.t_map(b.t("int"), b.t("string"))), vec![]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["a, _ = m[0]"]);
}

#[test]
fn dependencies_through_called_functions() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![], vec![b.param(&["_", "_"], b.t("int"))]);
    let decls = vec![
        b.var_decl(&["a", "b"], None, vec![b.call(b.name("f"), vec![])]),
        b.func_decl("f", sig, Some(vec![b.ret(vec![b.name("z"), b.name("z")])])),
        b.var_decl(&["z"], None, vec![b.int("0")]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["z = 0", "a, b = f()"]);
}

#[test]
fn dependencies_through_function_literals() {
    let b = AstBuilder::new();
    let lit_sig = b.sig(vec![], vec![b.param(&[], b.t("int"))]);
    let lit = b.func_lit(lit_sig, vec![b.ret(vec![b.name("b")])]);
    let decls = vec![b.var_group(vec![
        b.var_spec(&["a"], None, vec![b.call(lit, vec![])]),
        b.var_spec(&["b"], None, vec![b.int("1")]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["b = 1", "a = (func() int literal)()"]);
}

#[test]
fn multi_value_function_literal() {
    let b = AstBuilder::new();
    let lit_sig = b.sig(vec![], vec![b.param(&["_", "_"], b.t("int"))]);
    let lit = b.func_lit(lit_sig, vec![b.ret(vec![b.name("c"), b.name("c")])]);
    let decls = vec![b.var_group(vec![
        b.var_spec(&["a", "b"], None, vec![b.call(lit, vec![])]),
        b.var_spec(&["c"], None, vec![b.int("1")]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["c = 1", "a, b = (func() (_, _ int) literal)()"]);
}

#[test]
fn dependencies_through_method_expressions() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![], vec![b.param(&[], b.t("int"))]);
    let body = vec![
        b.assign(vec![b.name("_")], vec![b.name("y")]),
        b.ret(vec![b.int("0")]),
    ];
    let decls = vec![
        b.type_decl("T", b.t_struct(vec![])),
        b.method_decl(b.receiver(None, "T", false), "m", sig, Some(body)),
        b.var_decl(&["x", "y"], None, vec![b.sel(b.name("T"), "m"), b.int("1")]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["y = 1", "x = T.m"]);
}

#[test]
fn operands_are_visited_in_declaration_order() {
    let b = AstBuilder::new();
    let decls = vec![b.var_group(vec![
        b.var_spec(&["d"], None, vec![b.binary(b.name("c"), BinaryOp::Add, b.name("b"))]),
        b.var_spec(&["a"], None, vec![b.int("0")]),
        b.var_spec(&["b"], None, vec![b.int("0")]),
        b.var_spec(&["c"], None, vec![b.int("0")]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["b = 0", "c = 0", "d = c + b", "a = 0"]);
}

#[test]
fn shared_counter_initializers() {
    let b = AstBuilder::new();
    let int_result = || b.sig(vec![], vec![b.param(&[], b.t("int"))]);
    let next_body = vec![b.inc(b.name("counter")), b.ret(vec![b.name("counter")])];
    let order = b.composite(
        b.t_slice(b.t("int")),
        ["f", "b", "d", "e", "c", "a"].iter().map(|n| b.elem(b.name(n))).collect(),
    );
    let next = || b.call(b.name("next"), vec![]);
    let decls = vec![
        b.var_decl(&["counter"], Some(b.t("int")), vec![]),
        b.func_decl("next", int_result(), Some(next_body)),
        b.var_decl(&["_"], None, vec![b.call(b.name("makeOrder"), vec![])]),
        b.func_decl(
            "makeOrder",
            b.sig(vec![], vec![b.param(&[], b.t_slice(b.t("int")))]),
            Some(vec![b.ret(vec![order])]),
        ),
        b.var_decl(&["a"], None, vec![next()]),
        b.var_decl(&["b", "c"], None, vec![next(), next()]),
        b.var_decl(&["d", "e", "f"], None, vec![next(), next(), next()]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(
        c.init_order(),
        [
            "a = next()",
            "b = next()",
            "c = next()",
            "d = next()",
            "e = next()",
            "f = next()",
            "_ = makeOrder()",
        ]
    );
}

#[test]
fn constants_order_but_are_not_initializers() {
    let b = AstBuilder::new();
    let decls = vec![
        b.var_decl(&["v"], None, vec![b.name("k")]),
        b.const_decl(&["k"], None, vec![b.name("w")]),
        b.const_decl(&["w"], None, vec![b.int("2")]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["v = k"]);
}

/// `var x int = f(); func f() int { return x }`
fn cyclic(b: &AstBuilder) -> Vec<typeattr_syntax::ast::Decl> {
    let sig = b.sig(vec![], vec![b.param(&[], b.t("int"))]);
    vec![
        b.var_decl(&["y"], None, vec![b.name("x")]),
        b.var_decl(&["x"], Some(b.t("int")), vec![b.call(b.name("f"), vec![])]),
        b.func_decl("f", sig, Some(vec![b.ret(vec![b.name("x")])])),
    ]
}

#[test]
fn cycles_are_tolerated_by_default() {
    let b = AstBuilder::new();
    let decls = cyclic(&b);
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.init_order(), ["x = f()", "y = x"]);
}

#[test]
fn cycles_are_reported_on_request() {
    let b = AstBuilder::new();
    let decls = cyclic(&b);
    let config = Config {
        report_init_cycles: true,
        ..Config::default()
    };
    let c = Checked::with_config(b, decls, config);
    c.assert_error(TypeError::InitCycle, "initialization cycle for x");
    assert!(c.messages().iter().all(|m| !m.contains("for y")));
    assert_eq!(c.init_order(), ["x = f()", "y = x"]);
}
