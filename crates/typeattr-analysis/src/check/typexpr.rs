//! Identifier resolution and type expressions.
//!
//! Type expressions are checked in the current scope and recorded in
//! `TypeInfo::type_exprs`. Function signatures open a function scope that
//! holds the receiver, parameters and named results.

use typeattr_syntax::ast::{
    self, Expr, Field, FuncType, Ident, InterfaceElem, InterfaceType, Param, Receiver, StructType, TypeExpr,
    TypeExprKind,
};

use crate::constant;
use crate::errors::TypeError;
use crate::obj::EntityType;
use crate::objects::{ObjKey, ScopeKey, TypeKey};
use crate::operand::{Operand, OperandMode};
use crate::scope::{self, ScopeKind};
use crate::typ::{self, BasicType, ChanDir, Type};

use super::checker::{Checker, Delayed};

impl<'a> Checker<'a> {
    // =========================================================================
    // Part 1: Identifiers
    // =========================================================================

    /// Resolves an identifier used as an operand or type name.
    pub(crate) fn ident(&mut self, x: &mut Operand, ident: &Ident, want_type: bool) {
        x.mode = OperandMode::Invalid;
        x.typ = None;
        x.span = ident.span;

        let name = self.ident_name(ident);
        let Some((_, okey)) = scope::lookup_parent(self.scope_key(), name, self.tc_objs) else {
            if name == "_" {
                self.error(TypeError::Undeclared, ident.span, "cannot use _ as value");
            } else {
                self.error(TypeError::Undeclared, ident.span, format!("undeclared name: {}", name));
            }
            return;
        };
        self.record_use(ident, okey);

        let is_type_name = self.tc_objs.lobjs[okey].entity_type().is_type_name();
        if self.tc_objs.lobjs[okey].typ().is_none() || (is_type_name && want_type) {
            self.obj_decl(okey);
        }
        let invalid = self.invalid_type();
        let t = self.tc_objs.lobjs[okey].typ().unwrap_or(invalid);

        let mode = match self.tc_objs.lobjs[okey].entity_type() {
            EntityType::PkgName { .. } => {
                self.error(
                    TypeError::NotAnExpr,
                    ident.span,
                    format!("use of package {} not in selector", name),
                );
                return;
            }
            EntityType::Const { val } => {
                let val = val.clone();
                self.add_decl_dep(okey);
                if t == invalid {
                    return;
                }
                if okey == self.tc_objs.universe().iota() {
                    match self.octx.iota.clone() {
                        Some(iota) => OperandMode::Constant(iota),
                        None => {
                            self.error(
                                TypeError::NotConstant,
                                ident.span,
                                "cannot use iota outside constant declaration",
                            );
                            return;
                        }
                    }
                } else {
                    OperandMode::Constant(val)
                }
            }
            EntityType::TypeName => OperandMode::TypeExpr,
            EntityType::Var(_) => {
                if self.tc_objs.lobjs[okey].pkg() == Some(self.pkg) {
                    self.tc_objs.lobjs[okey].set_var_used();
                }
                self.add_decl_dep(okey);
                if t == invalid {
                    return;
                }
                OperandMode::Variable
            }
            EntityType::Func { .. } => {
                self.add_decl_dep(okey);
                OperandMode::Value
            }
            EntityType::Builtin(b) => OperandMode::Builtin(*b),
            EntityType::Nil => OperandMode::Value,
        };
        x.mode = mode;
        x.typ = Some(t);
    }

    /// Resolves `pkg.Name` if `pkg` names an imported package. Returns false
    /// if `pkg` is not a package name, leaving `x` untouched.
    pub(crate) fn qualified_ident(&mut self, x: &mut Operand, pkg: &Ident, sel: &Ident) -> bool {
        let pname = self.ident_name(pkg);
        let Some((_, pobj)) = scope::lookup_parent(self.scope_key(), pname, self.tc_objs) else {
            return false;
        };
        let imported = match self.tc_objs.lobjs[pobj].entity_type() {
            EntityType::PkgName { imported, .. } => *imported,
            _ => return false,
        };
        self.record_use(pkg, pobj);
        self.tc_objs.lobjs[pobj].set_pkg_name_used();

        x.mode = OperandMode::Invalid;
        x.typ = None;
        x.span = pkg.span.merge(&sel.span);

        let sname = self.ident_name(sel);
        let ipkg = &self.tc_objs.pkgs[imported];
        let pkg_label = ipkg.name().unwrap_or("_").to_string();
        let Some(exp) = self.tc_objs.scopes[*ipkg.scope()].lookup(sname) else {
            if !ipkg.fake() {
                self.error(
                    TypeError::UnresolvedSelector,
                    sel.span,
                    format!("{} not declared by package {}", sname, pkg_label),
                );
            }
            return true;
        };
        if !self.tc_objs.lobjs[exp].exported() {
            self.error(
                TypeError::UnexportedName,
                sel.span,
                format!("{} not exported by package {}", sname, pkg_label),
            );
        }
        self.record_use(sel, exp);

        let obj = &self.tc_objs.lobjs[exp];
        let invalid = self.tc_objs.universe().invalid_type();
        x.typ = Some(obj.typ().unwrap_or(invalid));
        x.mode = match obj.entity_type() {
            EntityType::Const { val } => OperandMode::Constant(val.clone()),
            EntityType::TypeName => OperandMode::TypeExpr,
            EntityType::Var(_) => OperandMode::Variable,
            EntityType::Func { .. } | EntityType::Nil => OperandMode::Value,
            EntityType::Builtin(b) => OperandMode::Builtin(*b),
            EntityType::PkgName { .. } => OperandMode::Invalid,
        };
        true
    }

    // =========================================================================
    // Part 2: Type expressions
    // =========================================================================

    /// Checks a type expression.
    pub(crate) fn typ(&mut self, e: &TypeExpr) -> TypeKey {
        self.defined_type(e, None)
    }

    /// Checks a type expression; `def` is the named type being declared
    /// with `e` as its definition, used as receiver of interface methods.
    pub(crate) fn defined_type(&mut self, e: &TypeExpr, def: Option<TypeKey>) -> TypeKey {
        let t = self.typ_internal(e, def);
        self.record_type_expr(e.id, t);
        t
    }

    fn typ_internal(&mut self, e: &TypeExpr, def: Option<TypeKey>) -> TypeKey {
        match &e.kind {
            TypeExprKind::Ident(ident) => {
                let mut x = Operand::new();
                self.ident(&mut x, ident, true);
                self.type_operand(&x, self.ident_name(ident))
            }
            TypeExprKind::Selector(s) => {
                let mut x = Operand::new();
                if !self.qualified_ident(&mut x, &s.pkg, &s.sel) {
                    let name = self.ident_name(&s.pkg);
                    self.error(TypeError::NotAType, s.pkg.span, format!("{} is not a package", name));
                    return self.invalid_type();
                }
                let text = format!("{}.{}", self.ident_name(&s.pkg), self.ident_name(&s.sel));
                self.type_operand(&x, &text)
            }
            TypeExprKind::Array(a) => {
                let len = self.array_length(&a.len);
                let elem = self.typ(&a.elem);
                self.tc_objs.new_t_array(elem, len)
            }
            TypeExprKind::Slice(elem) => {
                let elem = self.typ(elem);
                self.tc_objs.new_t_slice(elem)
            }
            TypeExprKind::Map(m) => {
                let key = self.typ(&m.key);
                let elem = self.typ(&m.value);
                // comparability needs complete types
                self.later(Delayed::MapKey { key, span: m.key.span });
                self.tc_objs.new_t_map(key, elem)
            }
            TypeExprKind::Chan(c) => {
                let dir = match c.dir {
                    ast::ChanDir::Both => ChanDir::SendRecv,
                    ast::ChanDir::Send => ChanDir::SendOnly,
                    ast::ChanDir::Recv => ChanDir::RecvOnly,
                };
                let elem = self.typ(&c.elem);
                self.tc_objs.new_t_chan(dir, elem)
            }
            TypeExprKind::Func(f) => self.func_type(None, f),
            TypeExprKind::Struct(s) => self.struct_type(s),
            TypeExprKind::Pointer(base) => {
                let base = self.typ(base);
                self.tc_objs.new_t_pointer(base)
            }
            TypeExprKind::Interface(i) => self.interface_type(i, def),
        }
    }

    /// The type an operand denotes, reporting operands that are not types.
    fn type_operand(&mut self, x: &Operand, text: &str) -> TypeKey {
        match (&x.mode, x.typ) {
            (OperandMode::TypeExpr, Some(t)) => t,
            (OperandMode::Invalid, _) => self.invalid_type(),
            (OperandMode::NoValue, _) => {
                let msg = format!("{} used as type", x.display(Some(text), self.tc_objs));
                self.error(TypeError::NotAType, x.span, msg);
                self.invalid_type()
            }
            _ => {
                let msg = format!("{} is not a type", x.display(Some(text), self.tc_objs));
                self.error(TypeError::NotAType, x.span, msg);
                self.invalid_type()
            }
        }
    }

    /// Evaluates an array length, which must be a non-negative constant
    /// integer representable as `int`.
    fn array_length(&mut self, e: &Expr) -> Option<u64> {
        let mut x = Operand::new();
        self.expr(&mut x, e);
        let OperandMode::Constant(val) = &x.mode else {
            if !x.invalid() {
                let msg = format!("array length {} must be constant", self.op_str(&x, e));
                self.error(TypeError::InvalidArrayLength, x.span, msg);
            }
            return None;
        };
        let Some(t) = x.typ else {
            return None;
        };
        if typ::is_untyped(t, self.tc_objs) || typ::is_integer(t, self.tc_objs) {
            if let Some(i) = val.to_int() {
                let v = constant::Value::Int(i);
                if v.representable(BasicType::Int, self.config.word_size, None) {
                    if let Some(n) = v.to_u64() {
                        return Some(n);
                    }
                    let msg = format!("invalid array length {}", self.op_str(&x, e));
                    self.error(TypeError::InvalidArrayLength, x.span, msg);
                    return None;
                }
            }
        }
        let msg = format!("array length {} must be integer", self.op_str(&x, e));
        self.error(TypeError::InvalidArrayLength, x.span, msg);
        None
    }

    // =========================================================================
    // Part 3: Signatures
    // =========================================================================

    /// Checks a function type and the optional receiver of a method. The
    /// signature's scope is recorded for `ftype` but not entered.
    pub(crate) fn func_type(&mut self, recv: Option<&Receiver>, ftype: &FuncType) -> TypeKey {
        let outer = self.scope_key();
        let skey = self
            .tc_objs
            .new_scope(Some(outer), ScopeKind::Func, ftype.span.start, ftype.span.end);
        self.record_scope(ftype.id, skey);

        let recv_var = recv.map(|r| self.receiver(skey, r));
        let (params, variadic) = self.collect_params(skey, &ftype.params, ftype.variadic);
        let (results, _) = self.collect_params(skey, &ftype.results, false);

        let params = self.tc_objs.new_t_tuple(params);
        let results = self.tc_objs.new_t_tuple(results);
        self.tc_objs
            .new_t_signature(Some(skey), recv_var, params, results, variadic)
    }

    /// Declares the parameters of `list` in `skey`. With `variadic` set the
    /// last parameter has type `[]T`.
    fn collect_params(&mut self, skey: ScopeKey, list: &[Param], variadic: bool) -> (Vec<ObjKey>, bool) {
        let pkg = Some(self.pkg);
        let mut params = Vec::new();
        let mut is_variadic = false;
        for (i, param) in list.iter().enumerate() {
            let mut t = self.typ(&param.ty);
            if variadic && i == list.len() - 1 {
                if param.names.len() <= 1 {
                    t = self.tc_objs.new_t_slice(t);
                    is_variadic = true;
                } else {
                    self.soft_error(
                        TypeError::WrongArgCount,
                        param.span,
                        "can only use ... with final parameter in list",
                    );
                }
            }
            if param.names.is_empty() {
                params.push(self.tc_objs.new_param_var(param.ty.span.start, pkg, String::new(), Some(t)));
                continue;
            }
            for name in &param.names {
                let pname = self.ident_name(name).to_string();
                let okey = self.tc_objs.new_param_var(name.span.start, pkg, pname, Some(t));
                let pos = self.tc_objs.scopes[skey].pos();
                self.declare(skey, Some(name), okey, pos);
                params.push(okey);
            }
        }
        (params, is_variadic)
    }

    /// Declares a method receiver and validates its base type.
    fn receiver(&mut self, skey: ScopeKey, recv: &Receiver) -> ObjKey {
        let mut x = Operand::new();
        self.ident(&mut x, &recv.ty, true);
        let base = self.type_operand(&x, self.ident_name(&recv.ty));
        let t = if recv.is_pointer {
            self.tc_objs.new_t_pointer(base)
        } else {
            base
        };

        let (name, pos) = match &recv.name {
            Some(n) => (self.ident_name(n).to_string(), n.span.start),
            None => (String::new(), recv.span.start),
        };
        let okey = self.tc_objs.new_param_var(pos, Some(self.pkg), name, Some(t));
        if let Some(n) = &recv.name {
            let spos = self.tc_objs.scopes[skey].pos();
            self.declare(skey, Some(n), okey, spos);
        }

        if typ::is_invalid(base, self.tc_objs) {
            return okey;
        }
        let err = match &self.tc_objs.types[base] {
            Type::Named(named) => {
                let local = named
                    .obj()
                    .map_or(false, |o| self.tc_objs.lobjs[o].pkg() == Some(self.pkg));
                if !local {
                    Some("type not defined in this package")
                } else {
                    match named.try_underlying().map(|u| &self.tc_objs.types[u]) {
                        Some(Type::Pointer(_)) | Some(Type::Interface(_)) => Some("pointer or interface type"),
                        _ => None,
                    }
                }
            }
            _ => Some("basic or unnamed type"),
        };
        if let Some(err) = err {
            let msg = format!("invalid receiver {} ({})", self.type_str(t), err);
            self.error(TypeError::InvalidRecv, recv.span, msg);
        }
        okey
    }

    // =========================================================================
    // Part 4: Structs and interfaces
    // =========================================================================

    fn struct_type(&mut self, s: &StructType) -> TypeKey {
        let pkg = Some(self.pkg);
        let mut fields: Vec<ObjKey> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut tags: Option<Vec<Option<String>>> = None;

        for field in &s.fields {
            let t = self.typ(&field.ty);
            let tag = self.field_tag(field);

            let mut add = |this: &mut Self, ident: &Ident, embedded: bool, pos: u32| {
                let name = this.ident_name(ident).to_string();
                if name != "_" && names.contains(&name) {
                    this.error(TypeError::Redeclared, ident.span, format!("{} redeclared", name));
                    return;
                }
                let fkey = this.tc_objs.new_field(pos, pkg, name.clone(), Some(t), embedded);
                if tag.is_some() && tags.is_none() {
                    tags = Some(vec![None; fields.len()]);
                }
                if let Some(tags) = &mut tags {
                    tags.push(tag.clone());
                }
                this.record_def(ident, Some(fkey));
                names.push(name);
                fields.push(fkey);
            };

            if !field.is_embedded() {
                for name in &field.names {
                    add(self, name, false, name.span.start);
                }
                continue;
            }

            let Some(ident) = embedded_field_ident(&field.ty) else {
                continue;
            };
            let (base, is_ptr) = match &self.tc_objs.types[t] {
                Type::Pointer(p) => (p.base(), true),
                _ => (t, false),
            };
            let ubase = typ::underlying_type(base, self.tc_objs);
            let err = match &self.tc_objs.types[ubase] {
                _ if typ::is_invalid(ubase, self.tc_objs) => continue,
                Type::Pointer(_) => Some("embedded field type cannot be a pointer"),
                Type::Interface(_) if is_ptr => Some("embedded field type cannot be a pointer to an interface"),
                _ => None,
            };
            if let Some(err) = err {
                self.error(TypeError::InvalidLit, field.ty.span, err);
                continue;
            }
            add(self, ident, true, field.ty.span.start);
        }
        self.tc_objs.new_t_struct(fields, tags)
    }

    fn field_tag(&self, field: &Field) -> Option<String> {
        let raw = self.interner.resolve(field.tag?)?;
        match constant::string_from_literal(raw) {
            Ok(v) => v.str_as_str().map(str::to_string),
            Err(_) => Some(raw.to_string()),
        }
    }

    fn interface_type(&mut self, iface: &InterfaceType, def: Option<TypeKey>) -> TypeKey {
        let pkg = Some(self.pkg);
        let mut methods: Vec<ObjKey> = Vec::new();
        let mut embeddeds: Vec<TypeKey> = Vec::new();
        let mut recvs: Vec<ObjKey> = Vec::new();

        for elem in &iface.elems {
            match elem {
                InterfaceElem::Method(spec) => {
                    let name = self.ident_name(&spec.name).to_string();
                    let sig = self.func_type(None, &spec.sig);
                    let recv = self
                        .tc_objs
                        .new_param_var(spec.name.span.start, pkg, String::new(), def);
                    recvs.push(recv);
                    if let Some(Type::Signature(s)) = self.tc_objs.types.get_mut(sig) {
                        s.set_recv(Some(recv));
                    }
                    let m = self.tc_objs.new_func(spec.name.span.start, pkg, name.clone(), Some(sig));
                    self.record_def(&spec.name, Some(m));
                    if name == "_" {
                        self.error(TypeError::DuplicateMethod, spec.name.span, "invalid method name _");
                        continue;
                    }
                    if methods.iter().any(|&o| self.tc_objs.lobjs[o].name() == name) {
                        self.error(
                            TypeError::DuplicateMethod,
                            spec.name.span,
                            format!("duplicate method {}", name),
                        );
                        continue;
                    }
                    methods.push(m);
                }
                InterfaceElem::Embedded(texpr) => {
                    let t = self.typ(texpr);
                    let pending = matches!(&self.tc_objs.types[t], Type::Named(n) if n.try_underlying().is_none());
                    let u = typ::underlying_type(t, self.tc_objs);
                    if !pending && !typ::is_interface(u, self.tc_objs) {
                        if !typ::is_invalid(u, self.tc_objs) {
                            let msg = format!("{} is not an interface", self.type_str(t));
                            self.error(TypeError::NotAType, texpr.span, msg);
                        }
                        continue;
                    }
                    embeddeds.push(t);
                }
            }
        }

        let t = self.tc_objs.new_t_interface(methods, embeddeds);
        if def.is_none() {
            for r in recvs {
                self.tc_objs.lobjs[r].set_type(Some(t));
            }
        }
        t
    }
}

/// The identifier naming an embedded field: `T`, `*T`, `p.T` or `*p.T`.
fn embedded_field_ident(t: &TypeExpr) -> Option<&Ident> {
    match &t.kind {
        TypeExprKind::Ident(ident) => Some(ident),
        TypeExprKind::Selector(s) => Some(&s.sel),
        TypeExprKind::Pointer(base) => embedded_field_ident(base),
        _ => None,
    }
}
