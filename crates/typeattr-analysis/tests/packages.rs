//! Imports, qualified identifiers and incremental checking.

use typeattr_analysis::obj::obj_string;
use typeattr_analysis::typ::type_string;
use typeattr_analysis::{check_package, Checker, Config, NullImporter, PackageMapImporter, TCObjects, TypeError};
use typeattr_syntax::ast::ExprKind;
use typeattr_syntax::AstBuilder;

#[test]
fn qualified_identifiers_are_uses_not_selections() {
    let b = AstBuilder::new();
    let lib = b.file(
        "lib",
        vec![],
        vec![
            b.type_decl("T", b.t("int")),
            b.const_decl(&["C"], Some(b.t("T")), vec![b.int("1")]),
        ],
    );
    let qualified = b.sel(b.name("lib"), "C");
    let (sel_id, member_id) = match &qualified.kind {
        ExprKind::Selector(s) => (qualified.id, s.sel.id),
        _ => unreachable!(),
    };
    let main = b.file("main", vec![b.import("lib")], vec![b.var_decl(&["x"], None, vec![qualified])]);
    let interner = b.finish();

    let mut objs = TCObjects::new();
    let mut importer = PackageMapImporter::new();
    let lib_res = check_package(&mut objs, &interner, &mut importer, "lib", &[lib], Config::default());
    assert!(lib_res.errors.is_empty(), "{:?}", lib_res.errors);
    let res = check_package(&mut objs, &interner, &mut importer, "main", &[main], Config::default());
    assert!(res.errors.is_empty(), "{:?}", res.errors);

    assert!(res.info.selection(sel_id).is_none());
    let c = res.info.uses[&member_id];
    assert_eq!(obj_string(c, &objs), "const lib.C lib.T");
    let tv = res.info.type_and_value(sel_id).unwrap();
    assert_eq!(type_string(tv.typ, &objs), "lib.T");
    assert_eq!(tv.value().unwrap().to_string(), "1");
}

#[test]
fn unexported_and_missing_members() {
    let b = AstBuilder::new();
    let lib = b.file("lib", vec![], vec![b.const_decl(&["c"], None, vec![b.int("1")])]);
    let main = b.file(
        "main",
        vec![b.import("lib")],
        vec![
            b.var_decl(&["x"], None, vec![b.sel(b.name("lib"), "c")]),
            b.var_decl(&["y"], None, vec![b.sel(b.name("lib"), "D")]),
        ],
    );
    let interner = b.finish();

    let mut objs = TCObjects::new();
    let mut importer = PackageMapImporter::new();
    check_package(&mut objs, &interner, &mut importer, "lib", &[lib], Config::default());
    let res = check_package(&mut objs, &interner, &mut importer, "main", &[main], Config::default());

    let codes: Vec<TypeError> = res.errors.iter().map(|e| e.code).collect();
    assert!(codes.contains(&TypeError::UnexportedName), "{:?}", res.errors);
    assert!(codes.contains(&TypeError::UnresolvedSelector), "{:?}", res.errors);
}

#[test]
fn members_of_failed_imports_are_silently_invalid() {
    let b = AstBuilder::new();
    let main = b.file(
        "main",
        vec![b.import("missing")],
        vec![b.var_decl(&["x"], None, vec![b.sel(b.name("missing"), "C")])],
    );
    let interner = b.finish();

    let mut objs = TCObjects::new();
    let res = check_package(&mut objs, &interner, &mut NullImporter, "main", &[main], Config::default());
    let codes: Vec<TypeError> = res.errors.iter().map(|e| e.code).collect();
    assert_eq!(codes, [TypeError::ImportFailed]);
}

#[test]
fn later_files_add_methods_to_earlier_types() {
    let b = AstBuilder::new();
    let empty = || b.sig(vec![], vec![]);
    let recv = || b.receiver(None, "T", false);
    let iface = |names: &[&str]| b.t_interface(names.iter().map(|n| b.method_spec(n, empty())).collect());
    let first = b.file(
        "p",
        vec![],
        vec![
            b.type_decl("T", b.t_struct(vec![])),
            b.method_decl(recv(), "m1", empty(), Some(vec![])),
        ],
    );
    let second = b.file(
        "p",
        vec![],
        vec![
            b.method_decl(recv(), "m2", empty(), Some(vec![])),
            b.var_decl(&["_"], Some(iface(&["m1", "m2"])), vec![b.composite(b.t("T"), vec![])]),
        ],
    );
    let third = b.file(
        "p",
        vec![],
        vec![
            b.method_decl(recv(), "m3", empty(), Some(vec![])),
            b.var_decl(&["_"], Some(iface(&["m1", "m2", "m3"])), vec![b.composite(b.t("T"), vec![])]),
        ],
    );
    let interner = b.finish();

    let mut objs = TCObjects::new();
    let pkg = objs.new_package("p".to_string());
    let mut importer = NullImporter;
    let mut checker = Checker::new(&mut objs, &interner, &mut importer, pkg, Config::default());
    for file in [first, second, third] {
        checker.check_files(std::slice::from_ref(&file));
        assert!(checker.errors().is_empty(), "{:?}", checker.errors());
    }
}

#[test]
fn missing_method_is_a_type_mismatch() {
    let b = AstBuilder::new();
    let sig = b.sig(vec![], vec![]);
    let file = b.file(
        "p",
        vec![],
        vec![
            b.type_decl("T", b.t_struct(vec![])),
            b.var_decl(
                &["_"],
                Some(b.t_interface(vec![b.method_spec("m", sig)])),
                vec![b.composite(b.t("T"), vec![])],
            ),
        ],
    );
    let interner = b.finish();

    let mut objs = TCObjects::new();
    let res = check_package(&mut objs, &interner, &mut NullImporter, "p", &[file], Config::default());
    assert!(
        res.errors
            .iter()
            .any(|e| e.code == TypeError::TypeMismatch && e.message.contains("missing method m")),
        "{:?}",
        res.errors
    );
}
