//! Shared helpers for the integration tests.

#![allow(dead_code)]

use typeattr_analysis::typ::type_string;
use typeattr_analysis::{
    check_package, CheckResult, Config, NullImporter, ScopeKey, SelectionKind, TCObjects, TypeError,
};
use typeattr_common::SymbolInterner;
use typeattr_syntax::ast::{Decl, NodeId};
use typeattr_syntax::AstBuilder;

/// A checked single-file package named `p`.
pub struct Checked {
    pub objs: TCObjects,
    pub interner: SymbolInterner,
    pub result: CheckResult,
}

impl Checked {
    pub fn new(b: AstBuilder, decls: Vec<Decl>) -> Checked {
        Checked::with_config(b, decls, Config::default())
    }

    pub fn with_config(b: AstBuilder, decls: Vec<Decl>, config: Config) -> Checked {
        let file = b.file("p", vec![], decls);
        let interner = b.finish();
        let mut objs = TCObjects::new();
        let result = check_package(&mut objs, &interner, &mut NullImporter, "p", &[file], config);
        Checked {
            objs,
            interner,
            result,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.result.errors.iter().map(|e| e.message.clone()).collect()
    }

    #[track_caller]
    pub fn assert_ok(&self) {
        assert!(self.result.errors.is_empty(), "unexpected errors: {:?}", self.messages());
    }

    pub fn has_error(&self, code: TypeError) -> bool {
        self.result.errors.iter().any(|e| e.code == code)
    }

    #[track_caller]
    pub fn assert_error(&self, code: TypeError, fragment: &str) {
        assert!(
            self.result
                .errors
                .iter()
                .any(|e| e.code == code && e.message.contains(fragment)),
            "no {:?} error containing {:?} in {:?}",
            code,
            fragment,
            self.messages()
        );
    }

    /// The recorded type of expression `id`, displayed.
    #[track_caller]
    pub fn type_of(&self, id: NodeId) -> String {
        let tv = self
            .result
            .info
            .type_and_value(id)
            .unwrap_or_else(|| panic!("no type recorded for {:?}", id));
        type_string(tv.typ, &self.objs)
    }

    /// The recorded constant value of expression `id`, displayed.
    #[track_caller]
    pub fn value_of(&self, id: NodeId) -> String {
        let tv = self
            .result
            .info
            .type_and_value(id)
            .unwrap_or_else(|| panic!("no type recorded for {:?}", id));
        tv.value()
            .unwrap_or_else(|| panic!("{:?} is not a constant", id))
            .to_string()
    }

    #[track_caller]
    pub fn scope(&self, id: NodeId) -> ScopeKey {
        *self
            .result
            .info
            .scopes
            .get(&id)
            .unwrap_or_else(|| panic!("no scope recorded for {:?}", id))
    }

    pub fn scope_names(&self, id: NodeId) -> Vec<String> {
        let skey = self.scope(id);
        self.objs.scopes[skey].names().into_iter().map(str::to_string).collect()
    }

    /// Type and value of package-level constant `name`, displayed.
    #[track_caller]
    pub fn constant(&self, name: &str) -> (String, String) {
        let pscope = *self.objs.pkgs[self.result.pkg].scope();
        let okey = self.objs.scopes[pscope]
            .lookup(name)
            .unwrap_or_else(|| panic!("{} not declared", name));
        let obj = &self.objs.lobjs[okey];
        let typ = obj.typ().map(|t| type_string(t, &self.objs)).unwrap_or_default();
        let val = obj
            .const_val()
            .unwrap_or_else(|| panic!("{} is not a constant", name))
            .to_string();
        (typ, val)
    }

    pub fn init_order(&self) -> Vec<String> {
        self.result
            .info
            .init_order()
            .iter()
            .map(|init| init.display(&self.objs, &self.interner))
            .collect()
    }

    /// Kind, field/method index path and indirection of selector `id`.
    #[track_caller]
    pub fn selection(&self, id: NodeId) -> (SelectionKind, Vec<usize>, bool) {
        let sel = self
            .result
            .info
            .selection(id)
            .unwrap_or_else(|| panic!("no selection recorded for {:?}", id));
        (sel.kind(), sel.indices().to_vec(), sel.indirect())
    }
}
