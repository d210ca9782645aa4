//! The checker: per-package state and the top-level driver.
//!
//! A [`Checker`] walks the files of one package, allocating objects, types
//! and scopes in a shared [`TCObjects`] and recording the attributes of every
//! node in a [`TypeInfo`]. `check_files` may be called more than once to add
//! files to the same package.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};
use typeattr_common::{Span, SymbolInterner};
use typeattr_syntax::ast::{BinaryOp, Block, Expr, ExprKind, File, FuncDecl, Ident, NodeId};

use super::type_info::{TypeAndValue, TypeInfo};
use crate::errors::{CheckError, TypeError};
use crate::importer::Importer;
use crate::obj::ConstValue;
use crate::objects::{DeclInfoKey, ObjKey, PackageKey, ScopeKey, TCObjects, TypeKey};
use crate::operand::{Operand, OperandMode};
use crate::scope::{self, ScopeKind};
use crate::selection::{Selection, SelectionKind};
use crate::typ;

/// Checker settings.
#[derive(Clone, Debug)]
pub struct Config {
    /// Size in bytes of `int`, `uint` and `uintptr`.
    pub word_size: u8,
    /// Report initialization cycles as errors.
    pub report_init_cycles: bool,
    /// Stop recording errors once this many have been collected.
    pub error_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            word_size: 8,
            report_init_cycles: false,
            error_limit: None,
        }
    }
}

/// Everything a finished check hands back.
#[derive(Debug)]
pub struct CheckResult {
    pub pkg: PackageKey,
    pub info: TypeInfo,
    pub errors: Vec<CheckError>,
}

impl CheckResult {
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| !e.soft)
    }
}

/// Syntactic shape of an untyped expression, enough to push a final type
/// down to its operands.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ExprShape {
    Leaf,
    Paren(NodeId),
    Unary(NodeId),
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
}

impl ExprShape {
    pub(crate) fn of(e: &Expr) -> ExprShape {
        match &e.kind {
            ExprKind::Paren(inner) => ExprShape::Paren(inner.id),
            ExprKind::Unary(u) => ExprShape::Unary(u.operand.id),
            ExprKind::Binary(b) => ExprShape::Binary {
                op: b.op,
                left: b.left.id,
                right: b.right.id,
            },
            _ => ExprShape::Leaf,
        }
    }
}

/// An expression whose final type is not known yet.
#[derive(Clone, Debug)]
pub(crate) struct ExprInfo {
    /// Left operand of a shift with a non-constant count.
    pub is_lhs: bool,
    pub mode: OperandMode,
    pub typ: TypeKey,
    pub shape: ExprShape,
    pub span: Span,
}

/// Context of the object or function body being checked.
#[derive(Clone, Debug, Default)]
pub(crate) struct ObjContext {
    /// Package-level declaration collecting dependencies.
    pub decl: Option<DeclInfoKey>,
    /// Innermost scope for lookups.
    pub scope: Option<ScopeKey>,
    /// Value of `iota` inside a constant declaration.
    pub iota: Option<ConstValue>,
    /// Signature of the enclosing function.
    pub sig: Option<TypeKey>,
    /// Set once the expression being checked calls a function or receives.
    pub has_call_or_recv: bool,
}

/// Work postponed until all package-level objects are declared.
#[derive(Clone)]
pub(crate) enum Delayed {
    FuncBody {
        decl: Rc<FuncDecl>,
        sig: TypeKey,
        info: DeclInfoKey,
    },
    /// A function literal in a package-level initializer.
    FuncLit {
        body: Rc<Block>,
        sig: TypeKey,
        decl: Option<DeclInfoKey>,
    },
    MapKey {
        key: TypeKey,
        span: Span,
    },
}

pub struct Checker<'a> {
    pub(crate) tc_objs: &'a mut TCObjects,
    pub(crate) interner: &'a SymbolInterner,
    pub(crate) importer: &'a mut dyn Importer,
    pub(crate) config: Config,
    pub(crate) pkg: PackageKey,
    pub(crate) result: TypeInfo,
    pub(crate) errors: Vec<CheckError>,
    suppressed: usize,
    /// Package-level objects and methods with their declarations, in
    /// declaration order. Kept across `check_files` calls.
    pub(crate) obj_map: IndexMap<ObjKey, DeclInfoKey>,
    pub(crate) octx: ObjContext,
    pub(crate) untyped: HashMap<NodeId, ExprInfo>,
    /// Methods waiting for their receiver base type, by type name.
    pub(crate) methods: HashMap<String, Vec<ObjKey>>,
    /// Objects whose declarations are being checked, outermost first.
    pub(crate) obj_path: Vec<ObjKey>,
    pub(crate) delayed: Vec<Delayed>,
    /// Named types whose underlying type is another, unfinished named type.
    pub(crate) pending_chains: Vec<TypeKey>,
    /// Imported packages by path.
    pub(crate) imp_map: HashMap<String, PackageKey>,
}

impl<'a> Checker<'a> {
    pub fn new(
        tc_objs: &'a mut TCObjects,
        interner: &'a SymbolInterner,
        importer: &'a mut dyn Importer,
        pkg: PackageKey,
        config: Config,
    ) -> Checker<'a> {
        Checker {
            tc_objs,
            interner,
            importer,
            config,
            pkg,
            result: TypeInfo::new(),
            errors: Vec::new(),
            suppressed: 0,
            obj_map: IndexMap::new(),
            octx: ObjContext::default(),
            untyped: HashMap::new(),
            methods: HashMap::new(),
            obj_path: Vec::new(),
            delayed: Vec::new(),
            pending_chains: Vec::new(),
            imp_map: HashMap::new(),
        }
    }

    pub fn pkg(&self) -> PackageKey {
        self.pkg
    }

    pub fn objects(&self) -> &TCObjects {
        self.tc_objs
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.result
    }

    pub fn errors(&self) -> &[CheckError] {
        &self.errors
    }

    /// Number of errors dropped because of [`Config::error_limit`].
    pub fn suppressed_errors(&self) -> usize {
        self.suppressed
    }

    pub fn finish(self) -> CheckResult {
        CheckResult {
            pkg: self.pkg,
            info: self.result,
            errors: self.errors,
        }
    }

    /// Checks `files` as (more) files of the checker's package.
    pub fn check_files(&mut self, files: &[File]) {
        let path = self.tc_objs.pkgs[self.pkg].path().to_string();
        debug!(package = %path, files = files.len(), "checking package");

        let files = self.init_files(files);
        self.methods.clear();
        self.collect_objects(&files);
        self.package_objects();
        self.process_delayed(0);
        self.init_order();
        self.record_untyped();
        self.tc_objs.pkgs[self.pkg].mark_complete();

        debug!(
            package = %path,
            errors = self.errors.len(),
            objects = self.obj_map.len(),
            "package checked"
        );
    }

    /// Settles the package name and drops files that disagree with it.
    fn init_files<'f>(&mut self, files: &'f [File]) -> Vec<&'f File> {
        let mut accepted = Vec::with_capacity(files.len());
        for file in files {
            let name = self.ident_name(&file.package);
            match self.tc_objs.pkgs[self.pkg].name().map(str::to_string) {
                None => {
                    if name != "_" {
                        self.tc_objs.pkgs[self.pkg].set_name(name.to_string());
                    } else {
                        self.error(
                            TypeError::MismatchedPkgName,
                            file.package.span,
                            "invalid package name _",
                        );
                    }
                    accepted.push(file);
                }
                Some(expected) if expected == name => accepted.push(file),
                Some(expected) => self.error(
                    TypeError::MismatchedPkgName,
                    file.package.span,
                    format!("package {}; expected {}", name, expected),
                ),
            }
        }
        accepted
    }

    // ------------------------------------------------------------------------
    // Errors

    pub(crate) fn error(&mut self, code: TypeError, span: Span, msg: impl Into<String>) {
        self.report(CheckError::new(code, span, msg));
    }

    pub(crate) fn soft_error(&mut self, code: TypeError, span: Span, msg: impl Into<String>) {
        self.report(CheckError::new(code, span, msg).soft());
    }

    fn report(&mut self, err: CheckError) {
        debug!(code = err.code.code(), span = ?err.span, "{}", err.message);
        if let Some(limit) = self.config.error_limit {
            if self.errors.len() >= limit {
                self.suppressed += 1;
                return;
            }
        }
        self.errors.push(err);
    }

    // ------------------------------------------------------------------------
    // Names and lookups

    pub(crate) fn ident_name(&self, ident: &Ident) -> &'a str {
        let interner: &'a SymbolInterner = self.interner;
        interner.resolve(ident.symbol).unwrap_or("_")
    }

    pub(crate) fn expr_str(&self, e: &Expr) -> String {
        typeattr_syntax::display::expr_string(e, self.interner)
    }

    /// An operand as diagnostics describe it, e.g. `x (variable of type int)`.
    pub(crate) fn op_str(&self, x: &Operand, e: &Expr) -> String {
        x.display(Some(&self.expr_str(e)), self.tc_objs)
    }

    pub(crate) fn op_desc(&self, x: &Operand, e: Option<&Expr>) -> String {
        match e {
            Some(e) => self.op_str(x, e),
            None => x.display(None, self.tc_objs),
        }
    }

    pub(crate) fn type_str(&self, t: TypeKey) -> String {
        typ::type_string(t, self.tc_objs)
    }

    pub(crate) fn invalid_type(&self) -> TypeKey {
        self.tc_objs.universe().invalid_type()
    }

    pub(crate) fn basic_type(&self, b: typ::BasicType) -> TypeKey {
        self.tc_objs.universe().types()[&b]
    }

    pub(crate) fn scope_key(&self) -> ScopeKey {
        self.octx
            .scope
            .unwrap_or_else(|| *self.tc_objs.pkgs[self.pkg].scope())
    }

    /// Resolves `name` from the current scope outwards.
    pub(crate) fn lookup(&self, name: &str) -> Option<ObjKey> {
        scope::lookup_parent(self.scope_key(), name, self.tc_objs).map(|(_, o)| o)
    }

    /// Opens a scope for the construct `id` and makes it current.
    pub(crate) fn open_scope(&mut self, id: NodeId, kind: ScopeKind, span: Span) -> ScopeKey {
        let parent = self.scope_key();
        let skey = self
            .tc_objs
            .new_scope(Some(parent), kind, span.start, span.end);
        self.record_scope(id, skey);
        self.octx.scope = Some(skey);
        trace!(scope = ?skey, kind = kind.name(), "open scope");
        skey
    }

    pub(crate) fn close_scope(&mut self) {
        let cur = self.scope_key();
        trace!(scope = ?cur, "close scope");
        self.octx.scope = self.tc_objs.scopes[cur].parent();
    }

    // ------------------------------------------------------------------------
    // Recording

    pub(crate) fn record_type_and_value(&mut self, id: NodeId, mode: OperandMode, typ: TypeKey) {
        if mode == OperandMode::Invalid {
            return;
        }
        self.result.types.insert(id, TypeAndValue { mode, typ });
    }

    /// Replaces the recorded type of a comma-ok expression, and of every
    /// parenthesis around it, with the tuple `(a[0], a[1])`.
    pub(crate) fn record_comma_ok_types(&mut self, e: &Expr, a: [TypeKey; 2]) {
        let pos = e.span.start;
        let pkg = Some(self.pkg);
        let mut cur = e;
        loop {
            if !self.result.types.contains_key(&cur.id) {
                break;
            }
            let v0 = self.tc_objs.new_var(pos, pkg, String::new(), Some(a[0]));
            let v1 = self.tc_objs.new_var(pos, pkg, String::new(), Some(a[1]));
            let tuple = self.tc_objs.new_t_tuple(vec![v0, v1]);
            if let Some(tv) = self.result.types.get_mut(&cur.id) {
                tv.typ = tuple;
            }
            match &cur.kind {
                ExprKind::Paren(inner) => cur = &**inner,
                _ => break,
            }
        }
    }

    pub(crate) fn record_type_expr(&mut self, id: NodeId, t: TypeKey) {
        self.result.type_exprs.insert(id, t);
    }

    pub(crate) fn record_def(&mut self, ident: &Ident, obj: Option<ObjKey>) {
        self.result.defs.insert(ident.id, obj);
    }

    pub(crate) fn record_use(&mut self, ident: &Ident, obj: ObjKey) {
        self.result.uses.insert(ident.id, obj);
    }

    pub(crate) fn record_implicit(&mut self, id: NodeId, obj: ObjKey) {
        self.result.implicits.insert(id, obj);
    }

    pub(crate) fn record_selection(
        &mut self,
        id: NodeId,
        kind: SelectionKind,
        recv: TypeKey,
        obj: ObjKey,
        indices: Vec<usize>,
        indirect: bool,
    ) {
        let sel = Selection::new(kind, recv, obj, indices, indirect, self.tc_objs);
        trace!(node = ?id, "{}", sel.display(self.tc_objs));
        self.result.selections.insert(id, sel);
    }

    pub(crate) fn record_scope(&mut self, id: NodeId, skey: ScopeKey) {
        self.result.scopes.insert(id, skey);
    }

    pub(crate) fn record_enclosing(&mut self, id: NodeId) {
        let skey = self.scope_key();
        self.result.enclosing.insert(id, skey);
    }

    /// Records the untyped expressions left over with their default-less
    /// untyped types.
    fn record_untyped(&mut self) {
        let mut left: Vec<(NodeId, ExprInfo)> = self.untyped.drain().collect();
        left.sort_by_key(|(id, _)| *id);
        for (id, info) in left {
            self.record_type_and_value(id, info.mode, info.typ);
        }
    }

    // ------------------------------------------------------------------------
    // Object path and delayed work

    pub(crate) fn push_obj_path(&mut self, obj: ObjKey) -> usize {
        self.obj_path.push(obj);
        self.obj_path.len() - 1
    }

    pub(crate) fn pop_obj_path(&mut self) -> Option<ObjKey> {
        self.obj_path.pop()
    }

    pub(crate) fn later(&mut self, action: Delayed) {
        self.delayed.push(action);
    }

    /// Runs delayed actions from index `top` on, including the ones they
    /// schedule themselves.
    pub(crate) fn process_delayed(&mut self, top: usize) {
        let done = Delayed::MapKey {
            key: self.invalid_type(),
            span: Span::dummy(),
        };
        let mut i = top;
        while i < self.delayed.len() {
            let action = std::mem::replace(&mut self.delayed[i], done.clone());
            match action {
                Delayed::FuncBody { decl, sig, info } => {
                    if let Some(body) = &decl.body {
                        let name = self.ident_name(&decl.name);
                        self.func_body(Some(info), name, sig, body);
                    }
                }
                Delayed::FuncLit { body, sig, decl } => {
                    self.func_body(decl, "<function literal>", sig, &body);
                }
                Delayed::MapKey { key, span } => self.check_map_key(key, span),
            }
            i += 1;
        }
        self.delayed.truncate(top);
    }

    fn check_map_key(&mut self, key: TypeKey, span: Span) {
        if typ::is_invalid(key, self.tc_objs) || typ::comparable(key, self.tc_objs) {
            return;
        }
        let msg = format!("invalid map key type {}", self.type_str(key));
        self.error(TypeError::InvalidMapKey, span, msg);
    }
}
