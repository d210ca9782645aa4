//! The scope tree recorded for declarations and statements.

mod common;

use common::Checked;
use typeattr_analysis::{ScopeKind, TypeError};
use typeattr_syntax::ast::{BinaryOp, ChanDir, Decl, NodeId, StmtKind};
use typeattr_syntax::AstBuilder;

fn kind(c: &Checked, id: NodeId) -> ScopeKind {
    c.objs.scopes[c.scope(id)].kind()
}

#[test]
fn function_scope_holds_params_and_top_level_locals() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![b.param(&["x", "y"], b.t("int"))], vec![]);
    let sig_id = sig.id;
    let body = vec![
        b.define(&["x", "z"], vec![b.int("1"), b.int("2")]),
        b.assign(vec![b.name("_")], vec![b.name("z")]),
    ];
    let decls = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(kind(&c, sig_id), ScopeKind::Func);
    assert_eq!(c.scope_names(sig_id), ["x", "y", "z"]);
}

#[test]
fn named_results_and_receiver_live_in_the_signature_scope() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![b.param(&["a"], b.t("int"))], vec![b.param(&["r"], b.t("int"))]);
    let sig_id = sig.id;
    let recv = b.receiver(Some("t"), "T", true);
    let decls = vec![
        b.type_decl("T", b.t_struct(vec![])),
        b.method_decl(recv, "m", sig, Some(vec![b.ret(vec![])])),
    ];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.scope_names(sig_id), ["t", "a", "r"]);
}

#[test]
fn every_statement_kind_opens_its_scope() {
    let b = AstBuilder::new();
    let sig = b.sig(
        vec![
            b.param(&["v"], b.t_any()),
            b.param(&["ch"], b.t_chan(ChanDir::Both, b.t("int"))),
            b.param(&["s"], b.t_slice(b.t("int"))),
        ],
        vec![],
    );

    let if_s = b.if_stmt(
        Some(b.define(&["a"], vec![b.int("1")])),
        b.binary(b.name("a"), BinaryOp::Gt, b.int("0")),
        vec![],
        None,
    );
    let for_s = b.for_stmt(
        Some(b.define(&["i"], vec![b.int("0")])),
        Some(b.binary(b.name("i"), BinaryOp::Lt, b.int("3"))),
        Some(b.inc(b.name("i"))),
        vec![],
    );
    let range_s = b.range_stmt(
        Some(b.name("k")),
        Some(b.name("e")),
        true,
        b.name("s"),
        vec![b.assign(vec![b.name("_"), b.name("_")], vec![b.name("k"), b.name("e")])],
    );
    let case = b.case(
        vec![b.int("1")],
        vec![
            b.define(&["w"], vec![b.name("t")]),
            b.assign(vec![b.name("_")], vec![b.name("w")]),
        ],
    );
    let case_id = case.id;
    let switch_s = b.switch_stmt(Some(b.define(&["t"], vec![b.int("2")])), Some(b.name("t")), vec![case]);
    let int_case = b.type_case(vec![Some(b.t("int"))], vec![b.assign(vec![b.name("_")], vec![b.name("u")])]);
    let default_case = b.type_case(vec![], vec![]);
    let (int_id, default_id) = (int_case.id, default_case.id);
    let tswitch_s = b.type_switch(None, Some("u"), b.name("v"), vec![int_case, default_case]);
    let comm = b.comm_recv(
        vec![b.name("n")],
        true,
        b.recv(b.name("ch")),
        vec![b.assign(vec![b.name("_")], vec![b.name("n")])],
    );
    let comm_id = comm.id;
    let select_s = b.select(vec![comm]);
    let block_s = b.block_stmt(vec![]);

    let then_id = match &if_s.kind {
        StmtKind::If(ifs) => ifs.then.id,
        _ => unreachable!(),
    };
    let block_id = match &block_s.kind {
        StmtKind::Block(block) => block.id,
        _ => unreachable!(),
    };
    let ids = [if_s.id, for_s.id, range_s.id, switch_s.id, tswitch_s.id];

    let body = vec![if_s, for_s, range_s, switch_s, tswitch_s, select_s, block_s];
    let decls = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);
    c.assert_ok();

    let [if_id, for_id, range_id, switch_id, tswitch_id] = ids;
    assert_eq!(kind(&c, if_id), ScopeKind::If);
    assert_eq!(c.scope_names(if_id), ["a"]);
    assert_eq!(kind(&c, then_id), ScopeKind::Block);
    assert!(c.scope_names(then_id).is_empty());

    assert_eq!(kind(&c, for_id), ScopeKind::For);
    assert_eq!(c.scope_names(for_id), ["i"]);
    assert_eq!(kind(&c, range_id), ScopeKind::Range);
    assert_eq!(c.scope_names(range_id), ["k", "e"]);

    assert_eq!(kind(&c, switch_id), ScopeKind::Switch);
    assert_eq!(c.scope_names(switch_id), ["t"]);
    assert_eq!(kind(&c, case_id), ScopeKind::Case);
    assert_eq!(c.scope_names(case_id), ["w"]);

    // the binding is declared per clause, never in the switch scope
    assert_eq!(kind(&c, tswitch_id), ScopeKind::TypeSwitch);
    assert!(c.scope_names(tswitch_id).is_empty());
    assert_eq!(c.scope_names(int_id), ["u"]);
    assert_eq!(c.scope_names(default_id), ["u"]);

    assert_eq!(kind(&c, comm_id), ScopeKind::Comm);
    assert_eq!(c.scope_names(comm_id), ["n"]);
    assert_eq!(kind(&c, block_id), ScopeKind::Block);
}

#[test]
fn type_switch_binding_takes_the_clause_type() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![b.param(&["v"], b.t_any())], vec![]);
    let use_int = b.name("u");
    let use_pair = b.name("u");
    let (int_use, pair_use) = (use_int.id, use_pair.id);
    let int_case = b.type_case(vec![Some(b.t("int"))], vec![b.assign(vec![b.name("_")], vec![use_int])]);
    let pair_case = b.type_case(
        vec![Some(b.t("int")), Some(b.t("string"))],
        vec![b.assign(vec![b.name("_")], vec![use_pair])],
    );
    let (int_id, pair_id) = (int_case.id, pair_case.id);
    let body = vec![b.type_switch(None, Some("u"), b.name("v"), vec![int_case, pair_case])];
    let decls = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);

    // int appears twice
    assert!(c.has_error(TypeError::DuplicateCase));
    assert_eq!(c.type_of(int_use), "int");
    assert_eq!(c.type_of(pair_use), "interface{}");
    assert!(c.result.info.implicits.contains_key(&int_id));
    assert!(c.result.info.implicits.contains_key(&pair_id));
}

#[test]
fn file_scope_holds_imports_and_nests_in_the_package_scope() {
    let b = AstBuilder::new();
    let lib = b.file("lib", vec![], vec![b.const_decl(&["C"], None, vec![b.int("1")])]);
    let user = b.file("main", vec![b.import("lib")], vec![b.var_decl(&["x"], None, vec![b.sel(b.name("lib"), "C")])]);
    let user_id = user.id;
    let interner = b.finish();

    let mut objs = typeattr_analysis::TCObjects::new();
    let mut importer = typeattr_analysis::PackageMapImporter::new();
    let config = typeattr_analysis::Config::default();
    let lib_res = typeattr_analysis::check_package(&mut objs, &interner, &mut importer, "lib", &[lib], config.clone());
    assert!(lib_res.errors.is_empty());
    let res = typeattr_analysis::check_package(&mut objs, &interner, &mut importer, "main", &[user], config);
    assert!(res.errors.is_empty(), "{:?}", res.errors);

    let fscope = res.info.scopes[&user_id];
    assert_eq!(objs.scopes[fscope].kind(), ScopeKind::File);
    assert_eq!(objs.scopes[fscope].names(), ["lib"]);
    let pscope = objs.scopes[fscope].parent().unwrap();
    assert_eq!(objs.scopes[pscope].kind(), ScopeKind::Package);
    assert_eq!(objs.scopes[pscope].names(), ["x"]);
}

#[test]
fn innermost_scope_walks_enclosing_records() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![], vec![]);
    let inner = b.name("y");
    let inner_id = inner.id;
    let body = vec![b.block_stmt(vec![
        b.define(&["y"], vec![b.int("1")]),
        b.assign(vec![b.name("_")], vec![inner]),
    ])];
    let block_id = match &body[0].kind {
        StmtKind::Block(block) => block.id,
        _ => unreachable!(),
    };
    let decls: Vec<Decl> = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert_eq!(c.result.info.innermost_scope(inner_id), Some(c.scope(block_id)));
}

#[test]
fn short_variable_declaration_needs_a_new_name() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![b.param(&["x"], b.t("int"))], vec![]);
    let body = vec![b.define(&["x"], vec![b.int("1")])];
    let decls = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);
    c.assert_error(TypeError::NoNewVariables, "no new variables");
}

#[test]
fn redeclaration_in_one_block() {
    let b = AstBuilder::new();
    let decls = vec![
        b.var_decl(&["x"], Some(b.t("int")), vec![]),
        b.const_decl(&["x"], None, vec![b.int("1")]),
    ];
    let c = Checked::new(b, decls);
    c.assert_error(TypeError::Redeclared, "x redeclared");
}

#[test]
fn blank_names_are_never_declared() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![b.param(&["_"], b.t("int"))], vec![]);
    let sig_id = sig.id;
    let body = vec![b.var_stmt(&["_"], None, vec![b.int("1")])];
    let decls = vec![b.func_decl("f", sig, Some(body))];
    let c = Checked::new(b, decls);
    c.assert_ok();
    assert!(c.scope_names(sig_id).is_empty());
}
