//! Selector resolution through embedded fields and method sets.

mod common;

use common::Checked;
use typeattr_analysis::{SelectionKind, TypeError};
use typeattr_syntax::ast::{Decl, Expr};
use typeattr_syntax::AstBuilder;

use SelectionKind::{FieldVal, MethodExpr, MethodVal};

/// `type B struct{b int}; type C struct{c int}; type A struct{*B; C}`,
/// `func (C) m()`, `func (*C) n()`, `func (*B) pm()`, `var a A`, `var pa *A`.
fn embedding_decls(b: &AstBuilder) -> Vec<Decl> {
    let empty = || b.sig(vec![], vec![]);
    vec![
        b.type_decl("B", b.t_struct(vec![b.field(&["b"], b.t("int"))])),
        b.type_decl("C", b.t_struct(vec![b.field(&["c"], b.t("int"))])),
        b.type_decl("A", b.t_struct(vec![b.embed(b.t_ptr(b.t("B"))), b.embed(b.t("C"))])),
        b.method_decl(b.receiver(None, "C", false), "m", empty(), Some(vec![])),
        b.method_decl(b.receiver(None, "C", true), "n", empty(), Some(vec![])),
        b.method_decl(b.receiver(None, "B", true), "pm", empty(), Some(vec![])),
        b.var_decl(&["a"], Some(b.t("A")), vec![]),
        b.var_decl(&["pa"], Some(b.t_ptr(b.t("A"))), vec![]),
    ]
}

/// Appends `var _ = e` for each expression.
fn blanks(b: &AstBuilder, mut decls: Vec<Decl>, exprs: Vec<Expr>) -> Vec<Decl> {
    decls.extend(exprs.into_iter().map(|e| b.var_decl(&["_"], None, vec![e])));
    decls
}

#[test]
fn fields_through_embedding() {
    let b = AstBuilder::new();
    let sels = vec![
        b.sel(b.name("a"), "B"),
        b.sel(b.name("a"), "b"),
        b.sel(b.name("a"), "c"),
        b.sel(b.name("pa"), "c"),
    ];
    let ids: Vec<_> = sels.iter().map(|e| e.id).collect();
    let decls = blanks(&b, embedding_decls(&b), sels);
    let c = Checked::new(b, decls);
    c.assert_ok();

    assert_eq!(c.selection(ids[0]), (FieldVal, vec![0], false));
    assert_eq!(c.type_of(ids[0]), "*p.B");
    // reached through the embedded *B
    assert_eq!(c.selection(ids[1]), (FieldVal, vec![0, 0], true));
    assert_eq!(c.type_of(ids[1]), "int");
    assert_eq!(c.selection(ids[2]), (FieldVal, vec![1, 0], false));
    assert_eq!(c.selection(ids[3]), (FieldVal, vec![1, 0], true));
}

#[test]
fn promoted_methods() {
    let b = AstBuilder::new();
    let sels = vec![
        b.sel(b.name("a"), "m"),
        b.sel(b.name("a"), "n"),
        b.sel(b.name("a"), "pm"),
    ];
    let ids: Vec<_> = sels.iter().map(|e| e.id).collect();
    let decls = blanks(&b, embedding_decls(&b), sels);
    let c = Checked::new(b, decls);
    c.assert_ok();

    assert_eq!(c.selection(ids[0]), (MethodVal, vec![1, 0], false));
    assert_eq!(c.type_of(ids[0]), "func()");
    // pointer receiver on an addressable value takes its address
    assert_eq!(c.selection(ids[1]), (MethodVal, vec![1, 1], true));
    assert_eq!(c.selection(ids[2]), (MethodVal, vec![0, 0], true));
}

#[test]
fn method_expressions_prepend_the_receiver() {
    let b = AstBuilder::new();
    let value = b.sel(b.name("C"), "m");
    let pointer = b.sel(b.paren(b.type_operand(b.t_ptr(b.t("C")))), "n");
    let (v, p) = (value.id, pointer.id);
    let decls = blanks(&b, embedding_decls(&b), vec![value, pointer]);
    let c = Checked::new(b, decls);
    c.assert_ok();

    assert_eq!(c.selection(v), (MethodExpr, vec![0], false));
    assert_eq!(c.type_of(v), "func(p.C)");
    assert_eq!(c.selection(p), (MethodExpr, vec![1], true));
    assert_eq!(c.type_of(p), "func(*p.C)");
    let sel = c.result.info.selection(v).unwrap();
    assert_eq!(sel.display(&c.objs), "method expr (p.C) m(p.C)");
}

#[test]
fn pointer_receiver_method_expression_needs_a_pointer() {
    let b = AstBuilder::new();
    let bad = b.sel(b.name("C"), "n");
    let id = bad.id;
    let decls = blanks(&b, embedding_decls(&b), vec![bad]);
    let c = Checked::new(b, decls);
    c.assert_error(TypeError::InvalidMethodExpr, "needs pointer receiver");
    assert!(c.result.info.selection(id).is_none());
    assert!(c.result.info.type_and_value(id).is_none());
}

#[test]
fn pointer_receiver_method_on_unaddressable_value() {
    let b = AstBuilder::new();
    let mut decls = embedding_decls(&b);
    let mk_sig = b.sig(vec![], vec![b.param(&[], b.t("C"))]);
    let mk_body = vec![b.ret(vec![b.composite(b.t("C"), vec![])])];
    decls.push(b.func_decl("mk", mk_sig, Some(mk_body)));
    let call = b.sel(b.call(b.name("mk"), vec![]), "n");
    let decls = blanks(&b, decls, vec![call]);
    let c = Checked::new(b, decls);
    c.assert_error(TypeError::InvalidMethodExpr, "n is not in method set of p.C");
}

#[test]
fn interface_methods() {
    let b = AstBuilder::new();
    let sel = b.sel(b.name("i"), "m");
    let id = sel.id;
    let decls = vec![
        b.type_decl("I", b.t_interface(vec![b.method_spec("m", b.sig(vec![], vec![b.param(&[], b.t("int"))]))])),
        b.var_decl(&["i"], Some(b.t("I")), vec![]),
        b.var_decl(&["_"], None, vec![sel]),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.selection(id), (MethodVal, vec![0], false));
    assert_eq!(c.type_of(id), "func() int");
}

#[test]
fn shallower_field_wins_and_equal_depth_is_ambiguous() {
    let b = AstBuilder::new();
    let ambiguous = b.sel(b.name("z"), "f");
    let shallow = b.sel(b.name("w"), "f");
    let (amb, sh) = (ambiguous.id, shallow.id);
    let decls = vec![
        b.type_decl("X", b.t_struct(vec![b.field(&["f"], b.t("int"))])),
        b.type_decl("Y", b.t_struct(vec![b.field(&["f"], b.t("int"))])),
        b.type_decl("Z", b.t_struct(vec![b.embed(b.t("X")), b.embed(b.t("Y"))])),
        b.type_decl("W", b.t_struct(vec![b.embed(b.t("Z")), b.field(&["f"], b.t("string"))])),
        b.var_decl(&["z"], Some(b.t("Z")), vec![]),
        b.var_decl(&["w"], Some(b.t("W")), vec![]),
        b.var_decl(&["_"], None, vec![ambiguous]),
        b.var_decl(&["_"], None, vec![shallow]),
    ];
    let c = Checked::new(b, decls);

    c.assert_error(TypeError::AmbiguousSelector, "ambiguous selector z.f");
    assert!(c.result.info.selection(amb).is_none());
    assert_eq!(c.selection(sh), (FieldVal, vec![1], false));
    assert_eq!(c.type_of(sh), "string");
}

#[test]
fn unknown_member_is_unresolved() {
    let b = AstBuilder::new();
    let missing = b.sel(b.name("a"), "zz");
    let decls = blanks(&b, embedding_decls(&b), vec![missing]);
    let c = Checked::new(b, decls);
    c.assert_error(TypeError::UnresolvedSelector, "a.zz undefined");
}

#[test]
fn selections_inside_function_bodies() {
    let b = AstBuilder::new();
    let mut decls = embedding_decls(&b);
    let local = b.sel(b.name("v"), "c");
    let param = b.sel(b.name("q"), "b");
    let (l, p) = (local.id, param.id);
    let sig = b.sig(vec![b.param(&["q"], b.t_ptr(b.t("B")))], vec![]);
    let body = vec![
        b.define(&["v"], vec![b.composite(b.t("A"), vec![])]),
        b.assign(vec![b.name("_"), b.name("_")], vec![local, param]),
    ];
    decls.push(b.func_decl("f", sig, Some(body)));
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.selection(l), (FieldVal, vec![1, 0], false));
    assert_eq!(c.selection(p), (FieldVal, vec![0], true));
}
