//! Collection of package-level declarations.
//!
//! The first pass over a package's files creates an object for every
//! package-level name, declares it in the package or file scope, and keeps
//! the syntax needed to check it later in a [`DeclInfo`].

use std::rc::Rc;

use indexmap::IndexSet;
use tracing::debug;
use typeattr_common::Span;
use typeattr_syntax::ast::{Decl, Expr, File, FuncDecl, Ident, TypeExpr};

use crate::errors::TypeError;
use crate::importer::ImportResult;
use crate::obj::{ConstValue, EntityType, Pos};
use crate::objects::{DeclInfoKey, ObjKey, PackageKey, ScopeKey};
use crate::scope::{Scope, ScopeKind};

use super::checker::Checker;

#[derive(Debug)]
pub struct DeclInfoConst {
    pub file_scope: ScopeKey,
    pub typ: Option<Rc<TypeExpr>>,
    pub init: Option<Rc<Expr>>,
    pub deps: IndexSet<ObjKey>,
}

#[derive(Debug)]
pub struct DeclInfoVar {
    pub file_scope: ScopeKey,
    /// All variables of an n:1 declaration `a, b = f()`.
    pub lhs: Option<Vec<ObjKey>>,
    pub typ: Option<Rc<TypeExpr>>,
    pub init: Option<Rc<Expr>>,
    pub deps: IndexSet<ObjKey>,
}

#[derive(Debug)]
pub struct DeclInfoType {
    pub file_scope: ScopeKey,
    pub typ: Rc<TypeExpr>,
}

#[derive(Debug)]
pub struct DeclInfoFunc {
    pub file_scope: ScopeKey,
    pub fdecl: Rc<FuncDecl>,
    pub deps: IndexSet<ObjKey>,
}

/// The declaration of a package-level const, var, type or func.
#[derive(Debug)]
pub enum DeclInfo {
    Const(DeclInfoConst),
    Var(DeclInfoVar),
    Type(DeclInfoType),
    Func(DeclInfoFunc),
}

impl DeclInfo {
    pub fn new_const(file_scope: ScopeKey, typ: Option<Rc<TypeExpr>>, init: Option<Rc<Expr>>) -> DeclInfo {
        DeclInfo::Const(DeclInfoConst {
            file_scope,
            typ,
            init,
            deps: IndexSet::new(),
        })
    }

    pub fn new_var(
        file_scope: ScopeKey,
        lhs: Option<Vec<ObjKey>>,
        typ: Option<Rc<TypeExpr>>,
        init: Option<Rc<Expr>>,
    ) -> DeclInfo {
        DeclInfo::Var(DeclInfoVar {
            file_scope,
            lhs,
            typ,
            init,
            deps: IndexSet::new(),
        })
    }

    pub fn new_type(file_scope: ScopeKey, typ: Rc<TypeExpr>) -> DeclInfo {
        DeclInfo::Type(DeclInfoType { file_scope, typ })
    }

    pub fn new_func(file_scope: ScopeKey, fdecl: Rc<FuncDecl>) -> DeclInfo {
        DeclInfo::Func(DeclInfoFunc {
            file_scope,
            fdecl,
            deps: IndexSet::new(),
        })
    }

    pub fn as_var(&self) -> Option<&DeclInfoVar> {
        match self {
            DeclInfo::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn file_scope(&self) -> ScopeKey {
        match self {
            DeclInfo::Const(c) => c.file_scope,
            DeclInfo::Var(v) => v.file_scope,
            DeclInfo::Type(t) => t.file_scope,
            DeclInfo::Func(f) => f.file_scope,
        }
    }

    /// Package-level objects the declaration refers to, in first-use order.
    pub fn deps(&self) -> Option<&IndexSet<ObjKey>> {
        match self {
            DeclInfo::Const(c) => Some(&c.deps),
            DeclInfo::Var(v) => Some(&v.deps),
            DeclInfo::Func(f) => Some(&f.deps),
            DeclInfo::Type(_) => None,
        }
    }

    pub fn add_dep(&mut self, okey: ObjKey) {
        match self {
            DeclInfo::Const(c) => c.deps.insert(okey),
            DeclInfo::Var(v) => v.deps.insert(okey),
            DeclInfo::Func(f) => f.deps.insert(okey),
            DeclInfo::Type(_) => false,
        };
    }
}

impl<'a> Checker<'a> {
    /// Declares `obj` in `skey` unless it is blank, reporting a
    /// redeclaration, and records the definition of `ident`.
    pub(crate) fn declare(&mut self, skey: ScopeKey, ident: Option<&Ident>, okey: ObjKey, scope_pos: Pos) {
        let name = self.tc_objs.lobjs[okey].name().to_string();
        if name != "_" {
            if let Some(alt) = Scope::insert(skey, okey, self.tc_objs) {
                let span = ident.map_or_else(|| self.obj_span(okey), |i| i.span);
                let prev = self.tc_objs.lobjs[alt].pos();
                self.error(
                    TypeError::Redeclared,
                    span,
                    format!("{} redeclared in this block (previous declaration at {})", name, prev),
                );
                return;
            }
            self.tc_objs.lobjs[okey].set_scope_pos(scope_pos);
        }
        if let Some(ident) = ident {
            self.record_def(ident, Some(okey));
        }
    }

    pub(crate) fn obj_span(&self, okey: ObjKey) -> Span {
        Span::point(self.tc_objs.lobjs[okey].pos())
    }

    fn declare_pkg_obj(&mut self, ident: &Ident, okey: ObjKey, dkey: DeclInfoKey) {
        if self.ident_name(ident) == "init" {
            self.error(TypeError::Redeclared, ident.span, "cannot declare init - must be func");
            return;
        }
        let pscope = *self.tc_objs.pkgs[self.pkg].scope();
        self.declare(pscope, Some(ident), okey, 0);
        self.obj_map.insert(okey, dkey);
        let order = self.obj_map.len() as u32;
        self.tc_objs.lobjs[okey].set_order(order);
    }

    /// Creates objects for all package-level declarations of `files`.
    pub(crate) fn collect_objects(&mut self, files: &[&File]) {
        let pkg = Some(self.pkg);
        let pscope = *self.tc_objs.pkgs[self.pkg].scope();

        for file in files {
            self.record_def(&file.package, None);
            let fscope = self
                .tc_objs
                .new_scope(Some(pscope), ScopeKind::File, file.span.start, file.span.end);
            self.record_scope(file.id, fscope);

            for imp in &file.imports {
                let interner = self.interner;
                let path = interner.resolve(imp.path).unwrap_or("");
                if path.is_empty() {
                    self.error(TypeError::ImportFailed, imp.span, "invalid import path (empty string)");
                    continue;
                }
                let Some(ipkg) = self.import_package(imp.span, path) else {
                    continue;
                };
                self.tc_objs.pkgs[self.pkg].add_import(ipkg);

                let mut name = self.tc_objs.pkgs[ipkg].name().unwrap_or("_").to_string();
                if let Some(alias) = &imp.alias {
                    name = self.ident_name(alias).to_string();
                }
                if name == "init" {
                    self.error(TypeError::Redeclared, imp.span, "cannot declare init - must be func");
                    continue;
                }
                let pkg_name = self.tc_objs.new_pkg_name(imp.span.start, pkg, name.clone(), ipkg);
                match &imp.alias {
                    Some(alias) => self.record_def(alias, Some(pkg_name)),
                    None => self.record_implicit(imp.id, pkg_name),
                }

                if name == "." {
                    // merge the exported names of the package into the file scope
                    let iscope = *self.tc_objs.pkgs[ipkg].scope();
                    let exported: Vec<ObjKey> = self.tc_objs.scopes[iscope]
                        .elems()
                        .values()
                        .copied()
                        .filter(|&o| self.tc_objs.lobjs[o].exported())
                        .collect();
                    for o in exported {
                        if Scope::insert(fscope, o, self.tc_objs).is_some() {
                            let msg = format!("{} redeclared in this block", self.tc_objs.lobjs[o].name());
                            self.error(TypeError::Redeclared, imp.span, msg);
                        }
                    }
                } else {
                    self.declare(fscope, None, pkg_name, 0);
                }
            }

            for decl in &file.decls {
                match decl {
                    Decl::Const(cdecl) => {
                        let mut last: Option<(Option<Rc<TypeExpr>>, Vec<Rc<Expr>>)> = None;
                        for (iota, spec) in cdecl.specs.iter().enumerate() {
                            if spec.ty.is_some() || !spec.values.is_empty() || last.is_none() {
                                last = Some((
                                    spec.ty.clone().map(Rc::new),
                                    spec.values.iter().cloned().map(Rc::new).collect(),
                                ));
                            }
                            let (typ, values) = last.clone().unwrap_or_default();
                            for (i, ident) in spec.names.iter().enumerate() {
                                let name = self.ident_name(ident).to_string();
                                let okey = self.tc_objs.new_const(
                                    ident.span.start,
                                    pkg,
                                    name,
                                    None,
                                    ConstValue::with_i64(iota as i64),
                                );
                                let init = values.get(i).cloned();
                                let dkey = self.tc_objs.decls.insert(DeclInfo::new_const(fscope, typ.clone(), init));
                                self.declare_pkg_obj(ident, okey, dkey);
                            }
                            self.arity_match(spec.span, spec.names.len(), values.len(), typ.is_some(), true);
                        }
                    }
                    Decl::Var(vdecl) => {
                        for spec in &vdecl.specs {
                            let typ = spec.ty.clone().map(Rc::new);
                            let values: Vec<Rc<Expr>> = spec.values.iter().cloned().map(Rc::new).collect();
                            let lhs: Vec<ObjKey> = spec
                                .names
                                .iter()
                                .map(|ident| {
                                    let name = self.ident_name(ident).to_string();
                                    self.tc_objs.new_var(ident.span.start, pkg, name, None)
                                })
                                .collect();
                            // the variables of an n:1 declaration share one declaration
                            let shared = match values.as_slice() {
                                [init] if lhs.len() > 1 => {
                                    let info = DeclInfo::new_var(fscope, Some(lhs.clone()), typ.clone(), Some(init.clone()));
                                    Some(self.tc_objs.decls.insert(info))
                                }
                                _ => None,
                            };
                            for (i, ident) in spec.names.iter().enumerate() {
                                let dkey = match shared {
                                    Some(dkey) => dkey,
                                    None => {
                                        let info = DeclInfo::new_var(fscope, None, typ.clone(), values.get(i).cloned());
                                        self.tc_objs.decls.insert(info)
                                    }
                                };
                                self.declare_pkg_obj(ident, lhs[i], dkey);
                            }
                            self.arity_match(spec.span, spec.names.len(), values.len(), typ.is_some(), false);
                        }
                    }
                    Decl::Type(tdecl) => {
                        let name = self.ident_name(&tdecl.name).to_string();
                        let okey = self
                            .tc_objs
                            .new_type_name(tdecl.name.span.start, pkg, name, None);
                        let dkey = self
                            .tc_objs
                            .decls
                            .insert(DeclInfo::new_type(fscope, Rc::new(tdecl.ty.clone())));
                        self.declare_pkg_obj(&tdecl.name, okey, dkey);
                    }
                    Decl::Func(fdecl) => self.collect_func(fdecl, fscope),
                }
            }
        }

        // names in file scopes must not clash with package-level names
        let file_scopes = self.tc_objs.scopes[pscope].children().clone();
        for fscope in file_scopes {
            let elems: Vec<ObjKey> = self.tc_objs.scopes[fscope].elems().values().copied().collect();
            for o in elems {
                let name = self.tc_objs.lobjs[o].name().to_string();
                if let Some(alt) = self.tc_objs.scopes[pscope].lookup(&name) {
                    let via = match self.tc_objs.lobjs[o].entity_type() {
                        EntityType::PkgName { imported, .. } => {
                            format!("import of {}", self.tc_objs.pkgs[*imported])
                        }
                        _ => match self.tc_objs.lobjs[o].pkg() {
                            Some(p) => format!("dot-import of {}", self.tc_objs.pkgs[p]),
                            None => "dot-import".to_string(),
                        },
                    };
                    let span = self.obj_span(alt);
                    self.error(
                        TypeError::Redeclared,
                        span,
                        format!("{} already declared through {}", name, via),
                    );
                }
            }
        }
        debug!(objects = self.obj_map.len(), "collected package objects");
    }

    fn collect_func(&mut self, fdecl: &FuncDecl, fscope: ScopeKey) {
        let name = self.ident_name(&fdecl.name).to_string();
        let okey = self
            .tc_objs
            .new_func(fdecl.name.span.start, Some(self.pkg), name.clone(), None);
        match &fdecl.recv {
            None => {
                if name == "init" {
                    // init functions are never declared
                    let pscope = *self.tc_objs.pkgs[self.pkg].scope();
                    self.tc_objs.lobjs[okey].set_parent(Some(pscope));
                    self.record_def(&fdecl.name, Some(okey));
                    if fdecl.body.is_none() {
                        self.soft_error(TypeError::InvalidRecv, fdecl.name.span, "missing function body");
                    }
                } else {
                    let pscope = *self.tc_objs.pkgs[self.pkg].scope();
                    self.declare(pscope, Some(&fdecl.name), okey, 0);
                }
            }
            Some(recv) => {
                self.record_def(&fdecl.name, Some(okey));
                self.tc_objs.lobjs[okey]
                    .entity_type_mut()
                    .func_set_has_ptr_recv(recv.is_pointer);
                let base = self.ident_name(&recv.ty);
                if base != "_" && name != "_" {
                    self.methods.entry(base.to_string()).or_default().push(okey);
                }
            }
        }
        let dkey: DeclInfoKey = self
            .tc_objs
            .decls
            .insert(DeclInfo::new_func(fscope, Rc::new(fdecl.clone())));
        self.obj_map.insert(okey, dkey);
        let order = self.obj_map.len() as u32;
        self.tc_objs.lobjs[okey].set_order(order);
    }

    /// Reports mismatches between the names and values of a const or var
    /// spec. Const specs pass the count of values they inherit.
    pub(crate) fn arity_match(&mut self, span: Span, names: usize, values: usize, has_type: bool, is_const: bool) {
        if !is_const && values == 0 {
            if !has_type {
                self.error(TypeError::AssignCountMismatch, span, "missing type or init expr");
            }
            return;
        }
        if names < values {
            self.error(TypeError::AssignCountMismatch, span, "extra init expr");
        } else if names > values && (is_const || values != 1) {
            self.error(TypeError::AssignCountMismatch, span, "missing init expr");
        }
    }

    /// Resolves an import path, falling back to a fake package on failure.
    fn import_package(&mut self, span: Span, path: &str) -> Option<PackageKey> {
        if let Some(&p) = self.imp_map.get(path) {
            return Some(p);
        }
        let failure = match self.importer.import(path, self.tc_objs) {
            ImportResult::Ok(p) => match self.tc_objs.pkgs[p].name() {
                Some(n) if !n.is_empty() && n != "_" => {
                    self.imp_map.insert(path.to_string(), p);
                    return Some(p);
                }
                other => format!("invalid package name: {:?}", other.unwrap_or("")),
            },
            ImportResult::Err(msg) => msg,
            ImportResult::Cycle => "import cycle not allowed".to_string(),
        };
        self.error(
            TypeError::ImportFailed,
            span,
            format!("could not import {} ({})", path, failure),
        );
        let trimmed = path.trim_end_matches('/');
        let name = trimmed.rsplit('/').next().unwrap_or(trimmed).to_string();
        let fake = self.tc_objs.new_package(path.to_string());
        self.tc_objs.pkgs[fake].mark_fake_with_name(name);
        self.imp_map.insert(path.to_string(), fake);
        Some(fake)
    }

    /// Adds a dependency on `okey` to the package-level declaration being
    /// checked, if `okey` is itself package-level.
    pub(crate) fn add_decl_dep(&mut self, okey: ObjKey) {
        let Some(dkey) = self.octx.decl else {
            return;
        };
        if !self.obj_map.contains_key(&okey) {
            return;
        }
        self.tc_objs.decls[dkey].add_dep(okey);
    }
}
