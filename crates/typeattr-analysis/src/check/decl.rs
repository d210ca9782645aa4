//! Declaration checking.
//!
//! Package-level objects are checked lazily: [`Checker::obj_decl`] is called
//! once for every object in declaration order, and again whenever an
//! identifier refers to an object whose type is not known yet. Objects on
//! the current declaration path are painted gray so that reference cycles
//! can be told apart from legal recursion through types.

use std::rc::Rc;

use tracing::debug;
use typeattr_common::Span;
use typeattr_syntax::ast::{ConstDecl, Expr, TypeDecl, TypeExpr, VarDecl};

use crate::errors::TypeError;
use crate::obj::{ConstValue, EntityType, ObjColor};
use crate::objects::{DeclInfoKey, ObjKey, TypeKey};
use crate::operand::Operand;
use crate::typ::{self, Type};

use super::checker::{Checker, Delayed, ObjContext};
use super::resolver::DeclInfo;

impl<'a> Checker<'a> {
    // =========================================================================
    // Part 1: Package-level objects
    // =========================================================================

    /// Checks all package-level objects in declaration order.
    pub(crate) fn package_objects(&mut self) {
        let objs: Vec<ObjKey> = self.obj_map.keys().copied().collect();

        // methods from new files may belong to types of earlier files
        for &okey in &objs {
            let obj = &self.tc_objs.lobjs[okey];
            if obj.entity_type().is_type_name() && obj.typ().is_some() {
                self.add_method_decls(okey);
            }
        }

        for &okey in &objs {
            self.obj_decl(okey);
        }

        // chains that never reached a type literal
        let invalid = self.invalid_type();
        for t in std::mem::take(&mut self.pending_chains) {
            if let Some(named) = self.tc_objs.types[t].try_as_named_mut() {
                named.set_underlying(invalid);
            }
        }
        // methods whose receiver base type was never found were reported
        // when their signatures were checked
        self.methods.clear();
    }

    /// Type-checks the declaration of `okey` if that has not happened yet.
    pub(crate) fn obj_decl(&mut self, okey: ObjKey) {
        let obj = &self.tc_objs.lobjs[okey];
        match obj.color() {
            ObjColor::White if obj.typ().is_some() => {
                // the type was set while checking another object, as for
                // the variables of an n:1 declaration
                self.tc_objs.lobjs[okey].set_color(ObjColor::Black);
                return;
            }
            ObjColor::White => {}
            ObjColor::Black => return,
            ObjColor::Gray(start) => {
                let valid = self.valid_cycle(start);
                let obj = &self.tc_objs.lobjs[okey];
                let invalidate = match obj.entity_type() {
                    EntityType::Const { .. } | EntityType::Var(_) => !valid || obj.typ().is_none(),
                    EntityType::TypeName => !valid,
                    _ => false,
                };
                if invalidate {
                    let invalid = self.invalid_type();
                    self.tc_objs.lobjs[okey].set_type(Some(invalid));
                }
                return;
            }
        }

        let Some(&dkey) = self.obj_map.get(&okey) else {
            return;
        };
        let idx = self.push_obj_path(okey);
        self.tc_objs.lobjs[okey].set_color(ObjColor::Gray(idx));

        let file_scope = self.tc_objs.decls[dkey].file_scope();
        let saved = std::mem::replace(
            &mut self.octx,
            ObjContext {
                scope: Some(file_scope),
                ..ObjContext::default()
            },
        );

        match &self.tc_objs.decls[dkey] {
            DeclInfo::Const(c) => {
                let (typ, init) = (c.typ.clone(), c.init.clone());
                self.octx.decl = Some(dkey);
                self.const_decl(okey, typ.as_deref(), init.as_deref());
            }
            DeclInfo::Var(v) => {
                let (lhs, typ, init) = (v.lhs.clone(), v.typ.clone(), v.init.clone());
                self.octx.decl = Some(dkey);
                self.var_decl(okey, lhs.as_deref(), typ.as_deref(), init.as_deref());
            }
            DeclInfo::Type(t) => {
                let texpr = Rc::clone(&t.typ);
                self.type_decl(okey, &texpr);
                self.add_method_decls(okey);
            }
            DeclInfo::Func(_) => self.func_decl(okey, dkey),
        }

        self.octx = saved;
        if let Some(done) = self.pop_obj_path() {
            self.tc_objs.lobjs[done].set_color(ObjColor::Black);
        }
        debug!(
            object = self.tc_objs.lobjs[okey].name(),
            typ = %self.tc_objs.lobjs[okey].typ().map_or_else(String::new, |t| self.type_str(t)),
            "declared"
        );
    }

    /// Decides whether the cycle closed by the object at `start` on the
    /// object path is legal, reporting it if not.
    fn valid_cycle(&mut self, start: usize) -> bool {
        let cycle = &self.obj_path[start.min(self.obj_path.len())..];
        let mut nval = 0;
        let mut ndef = 0;
        for &o in cycle {
            match self.tc_objs.lobjs[o].entity_type() {
                EntityType::Const { .. } | EntityType::Var(_) => nval += 1,
                EntityType::TypeName => ndef += 1,
                _ => {}
            }
        }
        // value-only cycles are initialization cycles, reported by init_order
        if nval == cycle.len() || (nval == 0 && ndef > 0) {
            return true;
        }
        let Some(&first) = cycle.first() else {
            return true;
        };
        let names: Vec<&str> = cycle.iter().map(|&o| self.tc_objs.lobjs[o].name()).collect();
        let msg = format!(
            "illegal cycle in declaration of {}: {}",
            self.tc_objs.lobjs[first].name(),
            names.join(" -> ")
        );
        let span = self.obj_span(first);
        self.error(TypeError::InvalidDeclCycle, span, msg);
        false
    }

    // =========================================================================
    // Part 2: Constants and variables
    // =========================================================================

    /// Checks a constant against its optional type and initializer. The
    /// object's value holds its `iota` on entry.
    pub(crate) fn const_decl(&mut self, okey: ObjKey, typ: Option<&TypeExpr>, init: Option<&Expr>) {
        let iota = self.tc_objs.lobjs[okey].const_val().cloned();
        self.tc_objs.lobjs[okey].set_const_val(ConstValue::Unknown);
        let saved_iota = std::mem::replace(&mut self.octx.iota, iota);

        if let Some(texpr) = typ {
            let t = self.typ(texpr);
            if !typ::is_const_type(t, self.tc_objs) {
                if !typ::is_invalid(t, self.tc_objs) {
                    let msg = format!("invalid constant type {}", self.type_str(t));
                    self.error(TypeError::NotConstant, texpr.span, msg);
                }
                let invalid = self.invalid_type();
                self.tc_objs.lobjs[okey].set_type(Some(invalid));
                self.octx.iota = saved_iota;
                return;
            }
            self.tc_objs.lobjs[okey].set_type(Some(t));
        }

        let mut x = Operand::new();
        if let Some(e) = init {
            self.expr(&mut x, e);
        }
        self.init_const(okey, &mut x, init);
        self.octx.iota = saved_iota;
    }

    /// Checks a variable declaration. `lhs` lists all variables of an n:1
    /// declaration, which are initialized together.
    pub(crate) fn var_decl(
        &mut self,
        okey: ObjKey,
        lhs: Option<&[ObjKey]>,
        typ: Option<&TypeExpr>,
        init: Option<&Expr>,
    ) {
        let declared = typ.map(|texpr| self.typ(texpr));
        if let Some(t) = declared {
            self.tc_objs.lobjs[okey].set_type(Some(t));
        }

        let Some(init) = init else {
            if declared.is_none() {
                // reported by arity_match
                let invalid = self.invalid_type();
                self.tc_objs.lobjs[okey].set_type(Some(invalid));
            }
            return;
        };

        match lhs {
            Some(lhs) if lhs.len() > 1 => {
                if let Some(t) = declared {
                    for &v in lhs {
                        self.tc_objs.lobjs[v].set_type(Some(t));
                    }
                }
                self.init_vars(lhs, std::slice::from_ref(init), None);
            }
            _ => {
                let mut x = Operand::new();
                self.expr(&mut x, init);
                self.init_var(okey, &mut x, Some(init), "variable declaration");
            }
        }
    }

    // =========================================================================
    // Part 3: Types
    // =========================================================================

    /// Declares the named type of `okey` and resolves its underlying type.
    pub(crate) fn type_decl(&mut self, okey: ObjKey, texpr: &TypeExpr) {
        let named = self.tc_objs.new_t_named(Some(okey), None, Vec::new());
        self.tc_objs.lobjs[okey].set_type(Some(named));

        let rhs = self.defined_type(texpr, Some(named));
        if let Some(detail) = self.tc_objs.types[named].try_as_named_mut() {
            detail.set_underlying(rhs);
        }
        if !self.resolve_chain(named) {
            self.pending_chains.push(named);
        }
        let pending = std::mem::take(&mut self.pending_chains);
        for t in pending {
            if !self.resolve_chain(t) {
                self.pending_chains.push(t);
            }
        }
        self.valid_type(named, &mut Vec::new());
    }

    /// Replaces a named underlying type by the type literal at the end of
    /// its chain. Returns false while some link is still being declared.
    fn resolve_chain(&mut self, t: TypeKey) -> bool {
        let Some(mut cur) = self.tc_objs.types[t].underlying() else {
            return false;
        };
        let mut seen = vec![t];
        loop {
            let next = match &self.tc_objs.types[cur] {
                Type::Named(detail) => detail.try_underlying(),
                _ => {
                    if let Some(detail) = self.tc_objs.types[t].try_as_named_mut() {
                        detail.set_underlying(cur);
                    }
                    return true;
                }
            };
            if seen.contains(&cur) {
                self.recursive_type_error(t);
                return true;
            }
            seen.push(cur);
            match next {
                Some(n) => cur = n,
                None => return false,
            }
        }
    }

    fn recursive_type_error(&mut self, t: TypeKey) {
        let obj = self.tc_objs.types[t].try_as_named().and_then(|n| n.obj());
        let span = obj.map_or_else(Span::dummy, |o| self.obj_span(o));
        let msg = format!("invalid recursive type {}", self.type_str(t));
        self.error(TypeError::InvalidRecursiveType, span, msg);
        let invalid = self.invalid_type();
        if let Some(detail) = self.tc_objs.types[t].try_as_named_mut() {
            detail.set_underlying(invalid);
        }
    }

    /// Reports types of this package that contain themselves without an
    /// indirection, such as `type T struct{ t T }`.
    fn valid_type(&mut self, t: TypeKey, path: &mut Vec<TypeKey>) -> bool {
        let children: Vec<TypeKey> = match &self.tc_objs.types[t] {
            Type::Array(a) => vec![a.elem()],
            Type::Struct(s) => s
                .fields()
                .iter()
                .filter_map(|&f| self.tc_objs.lobjs[f].typ())
                .collect(),
            Type::Interface(i) => i.embeddeds().clone(),
            Type::Named(n) => {
                let local = n
                    .obj()
                    .map_or(false, |o| self.tc_objs.lobjs[o].pkg() == Some(self.pkg));
                let Some(u) = n.try_underlying() else {
                    return true;
                };
                if !local || typ::is_invalid(u, self.tc_objs) {
                    return true;
                }
                if path.contains(&t) {
                    self.recursive_type_error(t);
                    return false;
                }
                path.push(t);
                let ok = self.valid_type(u, path);
                path.pop();
                return ok;
            }
            _ => return true,
        };
        children.into_iter().all(|c| self.valid_type(c, path))
    }

    /// Attaches the methods collected for the type name `okey` to its
    /// named type, rejecting duplicates and clashes with struct fields.
    pub(crate) fn add_method_decls(&mut self, okey: ObjKey) {
        if !self.obj_map.contains_key(&okey) {
            return;
        }
        let name = self.tc_objs.lobjs[okey].name().to_string();
        let Some(methods) = self.methods.remove(&name) else {
            return;
        };
        let Some(base) = self.tc_objs.lobjs[okey].typ() else {
            return;
        };
        let Some(named) = self.tc_objs.types[base].try_as_named() else {
            return;
        };

        let mut fields: Vec<String> = Vec::new();
        if let Some(s) = named
            .try_underlying()
            .and_then(|u| self.tc_objs.types[u].try_as_struct())
        {
            fields.extend(
                s.fields()
                    .iter()
                    .map(|&f| self.tc_objs.lobjs[f].name().to_string())
                    .filter(|n| n != "_"),
            );
        }
        let mut declared: Vec<String> = named
            .methods()
            .iter()
            .map(|&m| self.tc_objs.lobjs[m].name().to_string())
            .collect();

        for m in methods {
            let mname = self.tc_objs.lobjs[m].name().to_string();
            let span = self.obj_span(m);
            if fields.contains(&mname) {
                let msg = format!("field and method with the same name {}", mname);
                self.error(TypeError::DuplicateMethod, span, msg);
                continue;
            }
            if declared.contains(&mname) {
                let msg = format!("method {} already declared for {}", mname, self.type_str(base));
                self.error(TypeError::DuplicateMethod, span, msg);
                continue;
            }
            declared.push(mname);
            if let Some(detail) = self.tc_objs.types[base].try_as_named_mut() {
                detail.methods_mut().push(m);
            }
        }
    }

    // =========================================================================
    // Part 4: Functions
    // =========================================================================

    /// Sets the signature of a function or method; the body is checked
    /// once all package-level declarations are done.
    fn func_decl(&mut self, okey: ObjKey, dkey: DeclInfoKey) {
        let DeclInfo::Func(info) = &self.tc_objs.decls[dkey] else {
            return;
        };
        let fdecl = Rc::clone(&info.fdecl);
        let sig = self.func_type(fdecl.recv.as_ref(), &fdecl.sig);
        self.tc_objs.lobjs[okey].set_type(Some(sig));

        if fdecl.recv.is_none() && self.ident_name(&fdecl.name) == "init" {
            let takes_or_returns = self.tc_objs.types[sig]
                .try_as_signature()
                .map_or(false, |s| {
                    !s.param_vars(self.tc_objs).is_empty() || !s.result_vars(self.tc_objs).is_empty()
                });
            if takes_or_returns {
                self.error(
                    TypeError::WrongArgCount,
                    fdecl.name.span,
                    "func init must have no arguments and no return values",
                );
            }
        }

        if fdecl.body.is_some() {
            self.later(Delayed::FuncBody {
                decl: fdecl,
                sig,
                info: dkey,
            });
        }
    }

    // =========================================================================
    // Part 5: Local declarations
    // =========================================================================

    /// Declares the constants of a function-local `const` declaration. The
    /// names become visible after their spec.
    pub(crate) fn local_const_decl(&mut self, decl: &ConstDecl) {
        let pkg = Some(self.pkg);
        let mut last: Option<(Option<&TypeExpr>, &[Expr])> = None;
        for (iota, spec) in decl.specs.iter().enumerate() {
            if spec.ty.is_some() || !spec.values.is_empty() || last.is_none() {
                last = Some((spec.ty.as_ref(), spec.values.as_slice()));
            }
            let (typ, values) = last.unwrap_or((None, &[]));

            let mut lhs = Vec::with_capacity(spec.names.len());
            for (i, ident) in spec.names.iter().enumerate() {
                let name = self.ident_name(ident).to_string();
                let okey = self.tc_objs.new_const(
                    ident.span.start,
                    pkg,
                    name,
                    None,
                    ConstValue::with_i64(iota as i64),
                );
                self.const_decl(okey, typ, values.get(i));
                lhs.push(okey);
            }
            self.arity_match(spec.span, spec.names.len(), values.len(), typ.is_some(), true);

            let scope = self.scope_key();
            for (ident, okey) in spec.names.iter().zip(lhs) {
                self.declare(scope, Some(ident), okey, spec.span.end);
            }
        }
    }

    /// Declares the variables of a function-local `var` declaration.
    pub(crate) fn local_var_decl(&mut self, decl: &VarDecl) {
        let pkg = Some(self.pkg);
        for spec in &decl.specs {
            let lhs: Vec<ObjKey> = spec
                .names
                .iter()
                .map(|ident| {
                    let name = self.ident_name(ident).to_string();
                    self.tc_objs.new_var(ident.span.start, pkg, name, None)
                })
                .collect();

            if spec.values.len() == 1 && lhs.len() > 1 {
                self.var_decl(lhs[0], Some(lhs.as_slice()), spec.ty.as_ref(), spec.values.first());
            } else {
                for (i, &v) in lhs.iter().enumerate() {
                    self.var_decl(v, None, spec.ty.as_ref(), spec.values.get(i));
                }
            }
            self.arity_match(spec.span, spec.names.len(), spec.values.len(), spec.ty.is_some(), false);

            let scope = self.scope_key();
            for (ident, okey) in spec.names.iter().zip(lhs) {
                self.declare(scope, Some(ident), okey, spec.span.end);
            }
        }
    }

    /// Declares a function-local type. The name is visible inside its own
    /// declaration.
    pub(crate) fn local_type_decl(&mut self, decl: &TypeDecl) {
        let name = self.ident_name(&decl.name).to_string();
        let okey = self
            .tc_objs
            .new_type_name(decl.name.span.start, Some(self.pkg), name, None);
        let scope = self.scope_key();
        self.declare(scope, Some(&decl.name), okey, decl.name.span.start);

        let idx = self.push_obj_path(okey);
        self.tc_objs.lobjs[okey].set_color(ObjColor::Gray(idx));
        self.type_decl(okey, &decl.ty);
        if let Some(done) = self.pop_obj_path() {
            self.tc_objs.lobjs[done].set_color(ObjColor::Black);
        }
    }
}
