//! Types and constant values recorded for expressions.

mod common;

use common::Checked;
use typeattr_analysis::TypeError;
use typeattr_syntax::ast::{BinaryOp, ChanDir, Expr, ExprKind, NodeId, TypeExpr};
use typeattr_syntax::visit::{self, Visitor};
use typeattr_syntax::AstBuilder;

#[test]
fn untyped_constants_keep_their_literal_kind() {
    let b = AstBuilder::new();
    let rune = b.rune("'A'");
    let float = b.float("1.5");
    let string = b.string("\"foo\"");
    let boolean = b.name("true");
    let (r, f, s, t) = (rune.id, float.id, string.id, boolean.id);
    let decls = vec![b.const_group(vec![
        b.const_spec(&["_"], None, vec![rune]),
        b.const_spec(&["_"], None, vec![float]),
        b.const_spec(&["_"], None, vec![string]),
        b.const_spec(&["_"], None, vec![boolean]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(r), "untyped rune");
    assert_eq!(c.value_of(r), "65");
    assert_eq!(c.type_of(f), "untyped float");
    assert_eq!(c.value_of(f), "1.5");
    assert_eq!(c.type_of(s), "untyped string");
    assert_eq!(c.value_of(s), "\"foo\"");
    assert_eq!(c.type_of(t), "untyped bool");
    assert_eq!(c.value_of(t), "true");
}

#[test]
fn untyped_values_take_default_types_in_variables() {
    let b = AstBuilder::new();
    let int = b.int("1");
    let rune = b.rune("'a'");
    let float = b.float("2.5");
    let (i, r, f) = (int.id, rune.id, float.id);
    let decls = vec![b.var_group(vec![
        b.var_spec(&["x"], None, vec![int]),
        b.var_spec(&["y"], None, vec![rune]),
        b.var_spec(&["z"], None, vec![float]),
    ])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(i), "int");
    assert_eq!(c.type_of(r), "rune");
    assert_eq!(c.type_of(f), "float64");
}

#[test]
fn typed_destination_converts_constant() {
    let b = AstBuilder::new();
    let one = b.int("1");
    let id = one.id;
    let decls = vec![b.var_decl(&["x"], Some(b.t("float32")), vec![one])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(id), "float32");
    assert_eq!(c.value_of(id), "1");
}

#[test]
fn conversion_to_named_type_yields_typed_constant() {
    let b = AstBuilder::new();
    let conv = b.convert(b.t("T"), b.int("1"));
    let id = conv.id;
    let decls = vec![
        b.type_decl("T", b.t("int")),
        b.const_decl(&["_"], None, vec![conv]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(id), "p.T");
    assert_eq!(c.value_of(id), "1");
}

#[test]
fn float_underflow_rounds_to_zero() {
    let b = AstBuilder::new();
    let conv = b.convert(b.t("float32"), b.float("1e-200"));
    let id = conv.id;
    let decls = vec![b.const_decl(&["_"], None, vec![conv])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(id), "float32");
    assert_eq!(c.value_of(id), "0");
}

#[test]
fn constant_overflow_is_an_error() {
    let b = AstBuilder::new();
    let conv = b.convert(b.t("int8"), b.int("1000"));
    let decls = vec![b.const_decl(&["_"], None, vec![conv])];
    let c = Checked::new(b, decls);
    assert!(c.result.has_errors());
}

#[test]
fn constant_arithmetic_is_exact() {
    let b = AstBuilder::new();
    let sum = b.binary(b.int("1"), BinaryOp::Add, b.rune("'a'"));
    let id = sum.id;
    let decls = vec![b.const_decl(&["_"], None, vec![sum])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    // the rune kind is the larger of the two
    assert_eq!(c.type_of(id), "untyped rune");
    assert_eq!(c.value_of(id), "98");
}

#[test]
fn iota_and_repeated_const_specs() {
    let b = AstBuilder::new();
    let decls = vec![
        b.type_decl("T", b.t("int")),
        b.const_group(vec![
            b.const_spec(&["a"], Some(b.t("T")), vec![b.name("iota")]),
            b.const_spec(&["_"], None, vec![]),
            b.const_spec(&["c"], None, vec![]),
        ]),
        b.const_group(vec![
            b.const_spec(&["x", "y"], None, vec![b.binary(b.int("1"), BinaryOp::Shl, b.name("iota")), b.name("iota")]),
            b.const_spec(&["z", "w"], None, vec![]),
        ]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.constant("a"), ("p.T".to_string(), "0".to_string()));
    assert_eq!(c.constant("c"), ("p.T".to_string(), "2".to_string()));
    assert_eq!(c.constant("x"), ("untyped int".to_string(), "1".to_string()));
    assert_eq!(c.constant("z"), ("untyped int".to_string(), "2".to_string()));
    assert_eq!(c.constant("w"), ("untyped int".to_string(), "1".to_string()));
}

#[test]
fn comma_ok_map_index_is_a_tuple_only_in_two_value_context() {
    let b = AstBuilder::new();
    let pair = b.index(b.name("m"), b.int("0"));
    let single = b.index(b.name("m"), b.int("1"));
    let (p, s) = (pair.id, single.id);
    let decls = vec![
        b.var_decl(&["m"], Some(b.t_map(b.t("int"), b.t("string"))), vec![]),
        b.var_decl(&["v", "ok"], None, vec![pair]),
        b.var_decl(&["w"], None, vec![single]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(p), "(string, bool)");
    assert_eq!(c.type_of(s), "string");
}

#[test]
fn comma_ok_through_parentheses() {
    let b = AstBuilder::new();
    let recv = b.recv(b.name("ch"));
    let inner = recv.id;
    let paren = b.paren(b.paren(recv));
    let outer = paren.id;
    let decls = vec![
        b.var_decl(&["ch"], Some(b.t_chan(ChanDir::Both, b.t("int"))), vec![]),
        b.var_decl(&["v", "ok"], None, vec![paren]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(inner), "(int, bool)");
    assert_eq!(c.type_of(outer), "(int, bool)");
}

#[test]
fn comma_ok_type_assertion() {
    let b = AstBuilder::new();
    let assert = b.assert(b.name("x"), b.t("int"));
    let id = assert.id;
    let body = vec![
        b.define(&["v", "ok"], vec![assert]),
        b.assign(vec![b.name("_"), b.name("_")], vec![b.name("v"), b.name("ok")]),
    ];
    let sig = b.sig(vec![b.param(&["x"], b.t_any())], vec![]);
    let decls = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(id), "(int, bool)");
}

#[test]
fn comma_ok_takes_the_type_of_a_named_bool_destination() {
    let b = AstBuilder::new();
    let index = b.index(b.name("m"), b.string("\"foo\""));
    let id = index.id;
    let body = vec![b.assign(vec![b.name("_"), b.name("bv")], vec![index])];
    let decls = vec![
        b.type_decl("mybool", b.t("bool")),
        b.var_decl(&["m"], Some(b.t_map(b.t("string"), b.t("complex128"))), vec![]),
        b.var_decl(&["bv"], Some(b.t("mybool")), vec![]),
        b.func_decl("f", b.sig(vec![], vec![]), Some(body)),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(id), "(complex128, p.mybool)");
}

#[test]
fn complex_constants_round_to_their_component_precision() {
    let b = AstBuilder::new();
    let conv = b.convert(b.t("complex64"), b.float("1e-200"));
    let imag = b.imag("1e-2000i");
    let (cv, im) = (conv.id, imag.id);
    let decls = vec![
        b.const_decl(&["_"], None, vec![conv]),
        b.var_decl(&["_"], None, vec![imag]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(cv), "complex64");
    assert_eq!(c.value_of(cv), "0");
    assert_eq!(c.type_of(im), "complex128");
    assert_eq!(c.value_of(im), "0");
}

#[test]
fn nested_conversion_keeps_the_inner_constant() {
    let b = AstBuilder::new();
    let inner = b.convert(b.t("string"), b.string("\"foo\""));
    let id = inner.id;
    let outer = b.convert(b.t_slice(b.t("byte")), inner);
    let oid = outer.id;
    let decls = vec![b.var_decl(&["_"], None, vec![outer])];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.type_of(id), "string");
    assert_eq!(c.value_of(id), "\"foo\"");
    assert_eq!(c.type_of(oid), "[]byte");
    assert!(c.result.info.type_and_value(oid).unwrap().value().is_none());
}

#[test]
fn mismatched_operands_are_reported() {
    let b = AstBuilder::new();
    let sum = b.binary(b.name("s"), BinaryOp::Add, b.name("i"));
    let body = vec![b.define(&["_x"], vec![sum])];
    let sig = b.sig(vec![b.param(&["s"], b.t("string")), b.param(&["i"], b.t("int"))], vec![]);
    let decls = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);
    assert!(c.has_error(TypeError::MismatchedTypes));
}

/// Collects every expression except blank identifiers.
struct ExprIds<'i> {
    interner: &'i typeattr_common::SymbolInterner,
    ids: Vec<NodeId>,
}

impl Visitor for ExprIds<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        let blank = matches!(&expr.kind, ExprKind::Ident(id) if self.interner.resolve(id.symbol) == Some("_"));
        if !blank {
            self.ids.push(expr.id);
        }
        visit::walk_expr(self, expr);
    }

    fn visit_type_expr(&mut self, _ty: &TypeExpr) {}
}

#[test]
fn every_checked_expression_has_a_type() {
    let b = AstBuilder::new();
    let body = vec![
        b.define(&["s"], vec![b.call(b.name("make"), vec![b.type_operand(b.t_slice(b.t("int"))), b.int("3")])]),
        b.assign(vec![b.index(b.name("s"), b.int("0"))], vec![b.binary(b.name("n"), BinaryOp::Mul, b.int("2"))]),
        b.define(&["l"], vec![b.call(b.name("len"), vec![b.name("s")])]),
        b.if_stmt(
            None,
            b.binary(b.name("l"), BinaryOp::Gt, b.int("1")),
            vec![b.ret(vec![b.paren(b.name("l"))])],
            None,
        ),
        b.ret(vec![b.convert(b.t("int"), b.float("2.0"))]),
    ];
    let sig = b.sig(vec![b.param(&["n"], b.t("int"))], vec![b.param(&[], b.t("int"))]);
    let func = b.func_decl("f", sig, Some(body));
    let file = b.file("p", vec![], vec![func]);

    let interner = b.finish();
    let mut objs = typeattr_analysis::TCObjects::new();
    let result = typeattr_analysis::check_package(
        &mut objs,
        &interner,
        &mut typeattr_analysis::NullImporter,
        "p",
        std::slice::from_ref(&file),
        typeattr_analysis::Config::default(),
    );
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let mut collect = ExprIds {
        interner: &interner,
        ids: Vec::new(),
    };
    collect.visit_file(&file);
    assert!(collect.ids.len() > 15);
    for id in collect.ids {
        assert!(result.info.type_and_value(id).is_some(), "no type for {:?}", id);
    }
}

#[test]
fn modes_of_recorded_expressions() {
    let b = AstBuilder::new();
    let len_fn = b.name("len");
    let m_use = b.name("m");
    let (len_id, m_use_id) = (len_fn.id, m_use.id);
    let len_call = b.call(len_fn, vec![m_use]);
    let conv_fn = b.name("int");
    let conv_fn_id = conv_fn.id;
    let conv = b.call(conv_fn, vec![b.int("1")]);
    let lookup = b.index(b.name("m"), b.string("\"k\""));
    let void_call = b.call(b.name("g"), vec![]);
    let (len_call_id, conv_id, lookup_id, void_id) = (len_call.id, conv.id, lookup.id, void_call.id);
    let decls = vec![
        b.var_decl(&["m"], Some(b.t_map(b.t("string"), b.t("int"))), vec![]),
        b.var_decl(&["_", "_", "_"], None, vec![len_call, conv, lookup]),
        b.func_decl("g", b.sig(vec![], vec![]), Some(vec![])),
        b.func_decl("h", b.sig(vec![], vec![]), Some(vec![b.expr_stmt(void_call)])),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    let info = &c.result.info;
    let tv = move |id: NodeId| info.type_and_value(id).unwrap();

    assert!(tv(len_id).is_builtin());
    assert_eq!(c.type_of(len_id), "func(map[string]int) int");
    assert!(tv(len_call_id).is_value());
    assert!(tv(conv_fn_id).is_type());
    assert!(tv(conv_id).is_value() && tv(conv_id).value().is_some());
    assert!(tv(lookup_id).has_ok() && tv(lookup_id).is_value());
    assert!(tv(void_id).is_void());

    let m = info.object_of(m_use_id).unwrap();
    assert_eq!(c.objs.lobjs[m].name(), "m");
}
