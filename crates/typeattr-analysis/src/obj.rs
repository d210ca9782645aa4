//! Language objects: the named entities a program declares.
//!
//! A [`LangObj`] is a package name, constant, type name, variable (including
//! parameters, results and struct fields), function or method, built-in, or
//! the predeclared `nil`.

use std::borrow::Cow;
use std::fmt::{self, Write};

pub use crate::constant::Value as ConstValue;
use crate::objects::{ObjKey, PackageKey, ScopeKey, TCObjects, TypeKey};
use crate::package::Package;
use crate::typ;

/// Source position of an object, the start offset of its declaring identifier.
pub type Pos = u32;

/// Returns the identity of `name` declared in `pkg`: exported names are
/// global, the others are qualified by the package path.
pub fn get_id<'a>(pkg: Option<&'a Package>, name: &'a str) -> Cow<'a, str> {
    if is_exported(name) {
        Cow::Borrowed(name)
    } else {
        let path = pkg.map(|p| p.path()).unwrap_or("_");
        Cow::Owned(format!("{}.{}", path, name))
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_uppercase())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct VarProperty {
    pub embedded: bool,
    pub is_field: bool,
    pub used: bool,
}

/// Predeclared functions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Append,
    Cap,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
}

impl Builtin {
    pub const ALL: [Builtin; 15] = [
        Builtin::Append,
        Builtin::Cap,
        Builtin::Close,
        Builtin::Complex,
        Builtin::Copy,
        Builtin::Delete,
        Builtin::Imag,
        Builtin::Len,
        Builtin::Make,
        Builtin::New,
        Builtin::Panic,
        Builtin::Print,
        Builtin::Println,
        Builtin::Real,
        Builtin::Recover,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Close => "close",
            Builtin::Complex => "complex",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Imag => "imag",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::New => "new",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Real => "real",
            Builtin::Recover => "recover",
        }
    }

    /// Minimum argument count and whether more may follow.
    pub fn arity(&self) -> (usize, bool) {
        match self {
            Builtin::Append => (1, true),
            Builtin::Cap | Builtin::Close | Builtin::Imag | Builtin::Len => (1, false),
            Builtin::Real | Builtin::New | Builtin::Panic => (1, false),
            Builtin::Complex | Builtin::Copy | Builtin::Delete => (2, false),
            Builtin::Make => (1, true),
            Builtin::Print | Builtin::Println => (0, true),
            Builtin::Recover => (0, false),
        }
    }

    /// Whether a call may appear as a statement.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Builtin::Close
                | Builtin::Copy
                | Builtin::Delete
                | Builtin::Panic
                | Builtin::Print
                | Builtin::Println
                | Builtin::Recover
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EntityType {
    PkgName { imported: PackageKey, used: bool },
    Const { val: ConstValue },
    TypeName,
    Var(VarProperty),
    Func { has_ptr_recv: bool },
    Builtin(Builtin),
    Nil,
}

impl EntityType {
    pub fn is_const(&self) -> bool {
        matches!(self, EntityType::Const { .. })
    }

    pub fn is_type_name(&self) -> bool {
        matches!(self, EntityType::TypeName)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, EntityType::Var(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self, EntityType::Func { .. })
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, EntityType::Nil)
    }

    pub fn func_has_ptr_recv(&self) -> bool {
        matches!(self, EntityType::Func { has_ptr_recv: true })
    }

    pub fn func_set_has_ptr_recv(&mut self, has: bool) {
        if let EntityType::Func { has_ptr_recv } = self {
            *has_ptr_recv = has;
        }
    }
}

/// Declaration state of a package-level object while it is being checked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ObjColor {
    White,
    Black,
    /// On the object path at the given index.
    Gray(usize),
}

#[derive(Clone, Debug)]
pub struct LangObj {
    entity_type: EntityType,
    parent: Option<ScopeKey>,
    pos: Pos,
    pkg: Option<PackageKey>,
    name: String,
    typ: Option<TypeKey>,
    order: u32,
    color: ObjColor,
    scope_pos: Pos,
}

impl LangObj {
    fn new(
        entity_type: EntityType,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
    ) -> LangObj {
        let color = if typ.is_some() {
            ObjColor::Black
        } else {
            ObjColor::White
        };
        LangObj {
            entity_type,
            parent: None,
            pos,
            pkg,
            name,
            typ,
            order: 0,
            color,
            scope_pos: 0,
        }
    }

    pub(crate) fn new_pkg_name(
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        imported: PackageKey,
        invalid: TypeKey,
    ) -> LangObj {
        let et = EntityType::PkgName { imported, used: false };
        LangObj::new(et, pos, pkg, name, Some(invalid))
    }

    pub(crate) fn new_const(
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
        val: ConstValue,
    ) -> LangObj {
        LangObj::new(EntityType::Const { val }, pos, pkg, name, typ)
    }

    pub(crate) fn new_type_name(
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
    ) -> LangObj {
        LangObj::new(EntityType::TypeName, pos, pkg, name, typ)
    }

    pub(crate) fn new_var(pos: Pos, pkg: Option<PackageKey>, name: String, typ: Option<TypeKey>) -> LangObj {
        LangObj::new(EntityType::Var(VarProperty::default()), pos, pkg, name, typ)
    }

    /// Parameters count as used so that they are never reported.
    pub(crate) fn new_param(pos: Pos, pkg: Option<PackageKey>, name: String, typ: Option<TypeKey>) -> LangObj {
        let prop = VarProperty {
            used: true,
            ..VarProperty::default()
        };
        LangObj::new(EntityType::Var(prop), pos, pkg, name, typ)
    }

    pub(crate) fn new_field(
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
        embedded: bool,
    ) -> LangObj {
        let prop = VarProperty {
            embedded,
            is_field: true,
            used: false,
        };
        LangObj::new(EntityType::Var(prop), pos, pkg, name, typ)
    }

    pub(crate) fn new_func(pos: Pos, pkg: Option<PackageKey>, name: String, typ: Option<TypeKey>) -> LangObj {
        let et = EntityType::Func { has_ptr_recv: false };
        LangObj::new(et, pos, pkg, name, typ)
    }

    pub(crate) fn new_builtin(builtin: Builtin, typ: TypeKey) -> LangObj {
        let name = builtin.name().to_string();
        LangObj::new(EntityType::Builtin(builtin), 0, None, name, Some(typ))
    }

    pub(crate) fn new_nil(typ: TypeKey) -> LangObj {
        LangObj::new(EntityType::Nil, 0, None, "nil".to_string(), Some(typ))
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn entity_type_mut(&mut self) -> &mut EntityType {
        &mut self.entity_type
    }

    /// The scope the object is declared in; `None` for fields and methods.
    pub fn parent(&self) -> Option<ScopeKey> {
        self.parent
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typ(&self) -> Option<TypeKey> {
        self.typ
    }

    pub fn pkg(&self) -> Option<PackageKey> {
        self.pkg
    }

    /// Declaration order among package-level objects, starting at 1.
    pub fn order(&self) -> u32 {
        self.order
    }

    pub(crate) fn color(&self) -> ObjColor {
        self.color
    }

    /// Position from which the object is visible inside its scope.
    pub fn scope_pos(&self) -> Pos {
        self.scope_pos
    }

    pub(crate) fn set_type(&mut self, typ: Option<TypeKey>) {
        self.typ = typ;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ScopeKey>) {
        self.parent = parent;
    }

    pub(crate) fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    pub(crate) fn set_color(&mut self, color: ObjColor) {
        self.color = color;
    }

    pub(crate) fn set_scope_pos(&mut self, pos: Pos) {
        self.scope_pos = pos;
    }

    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }

    pub fn id<'a>(&'a self, objs: &'a TCObjects) -> Cow<'a, str> {
        get_id(self.pkg.map(|p| &objs.pkgs[p]), &self.name)
    }

    /// Reports whether this object is identified by `(pkg, name)`.
    pub fn same_id(&self, pkg: Option<PackageKey>, name: &str, objs: &TCObjects) -> bool {
        if name != self.name {
            return false;
        }
        if self.exported() {
            return true;
        }
        match (pkg, self.pkg) {
            (Some(a), Some(b)) => objs.pkgs[a].path() == objs.pkgs[b].path(),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn const_val(&self) -> Option<&ConstValue> {
        match &self.entity_type {
            EntityType::Const { val } => Some(val),
            _ => None,
        }
    }

    pub(crate) fn set_const_val(&mut self, v: ConstValue) {
        if let EntityType::Const { val } = &mut self.entity_type {
            *val = v;
        }
    }

    pub fn var_embedded(&self) -> bool {
        matches!(&self.entity_type, EntityType::Var(prop) if prop.embedded)
    }

    pub(crate) fn set_var_used(&mut self) {
        if let EntityType::Var(prop) = &mut self.entity_type {
            prop.used = true;
        }
    }

    pub(crate) fn set_pkg_name_used(&mut self) {
        if let EntityType::PkgName { used, .. } = &mut self.entity_type {
            *used = true;
        }
    }
}

// ----------------------------------------------------------------------------
// Formatting

/// Writes `okey` the way declarations read: `const lib.C lib.T`,
/// `var x int`, `func (T).m()`.
pub fn fmt_obj(okey: ObjKey, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
    let obj = &objs.lobjs[okey];
    match obj.entity_type() {
        EntityType::PkgName { imported, .. } => {
            write!(f, "package {}", obj.name())?;
            let path = objs.pkgs[*imported].path();
            if path != obj.name() {
                write!(f, " (\"{}\")", path)?;
            }
            return Ok(());
        }
        EntityType::Const { .. } => f.write_str("const")?,
        EntityType::TypeName => f.write_str("type")?,
        EntityType::Var(prop) => f.write_str(if prop.is_field { "field" } else { "var" })?,
        EntityType::Func { .. } => {
            f.write_str("func ")?;
            fmt_func_name(obj, f, objs)?;
            if let Some(t) = obj.typ() {
                typ::fmt_signature(t, f, objs)?;
            }
            return Ok(());
        }
        EntityType::Builtin(_) => {
            f.write_str("builtin")?;
            return fmt_obj_name(okey, f, objs);
        }
        EntityType::Nil => return f.write_str("nil"),
    }
    fmt_obj_name(okey, f, objs)?;
    fmt_obj_type(okey, f, objs)
}

pub fn obj_string(okey: ObjKey, objs: &TCObjects) -> String {
    let mut s = String::new();
    let _ = fmt_obj(okey, &mut s, objs);
    s
}

fn fmt_obj_name(okey: ObjKey, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
    f.write_char(' ')?;
    let obj = &objs.lobjs[okey];
    if let Some(p) = obj.pkg {
        let pkg = &objs.pkgs[p];
        // only package-level objects are qualified
        if objs.scopes[*pkg.scope()].lookup(obj.name()) == Some(okey) {
            pkg.fmt_with_qualifier(f, &*objs.fmt_qualifier)?;
        }
    }
    f.write_str(obj.name())
}

fn fmt_obj_type(okey: ObjKey, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
    let obj = &objs.lobjs[okey];
    let Some(mut t) = obj.typ() else {
        return Ok(());
    };
    if obj.entity_type().is_type_name() {
        if objs.types[t].try_as_basic().is_some() {
            return Ok(());
        }
        if type_name_is_alias(okey, objs) {
            f.write_str(" =")?;
        } else {
            t = typ::underlying_type(t, objs);
        }
    }
    f.write_char(' ')?;
    typ::fmt_type(Some(t), f, objs)
}

fn fmt_func_name(func: &LangObj, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
    if let Some(sig) = func.typ().and_then(|t| objs.types[t].try_as_signature()) {
        if let Some(r) = sig.recv() {
            f.write_char('(')?;
            typ::fmt_type(objs.lobjs[*r].typ(), f, objs)?;
            f.write_str(").")?;
        } else if let Some(p) = func.pkg() {
            objs.pkgs[p].fmt_with_qualifier(f, &*objs.fmt_qualifier)?;
        }
    }
    f.write_str(func.name())
}

/// Reports whether the type name `okey` denotes an alias rather than
/// defining a new type.
pub fn type_name_is_alias(okey: ObjKey, objs: &TCObjects) -> bool {
    let obj = &objs.lobjs[okey];
    let Some(t) = obj.typ() else {
        return false;
    };
    match &objs.types[t] {
        typ::Type::Basic(detail) => {
            // byte and rune share their names with the kinds they stand for
            let univ = objs.universe();
            obj.pkg().is_some() || detail.name() != obj.name() || t == univ.byte() || t == univ.rune()
        }
        typ::Type::Named(detail) => detail.obj() != Some(okey),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_qualify_unexported_names() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("a/b".to_string());
        let x = objs.new_var(0, Some(p), "x".to_string(), None);
        let y = objs.new_var(0, Some(p), "Y".to_string(), None);
        assert_eq!(objs.lobjs[x].id(&objs), "a/b.x");
        assert_eq!(objs.lobjs[y].id(&objs), "Y");

        let q = objs.new_package("c".to_string());
        assert!(!objs.lobjs[x].same_id(Some(q), "x", &objs));
        assert!(objs.lobjs[y].same_id(Some(q), "Y", &objs));
    }

    #[test]
    fn test_universe_aliases() {
        let objs = TCObjects::new();
        let univ = objs.universe();
        let scope = &objs.scopes[univ.scope()];
        let byte = scope.lookup("byte").unwrap();
        let int = scope.lookup("int").unwrap();
        assert!(type_name_is_alias(byte, &objs));
        assert!(!type_name_is_alias(int, &objs));
        assert_eq!(obj_string(int, &objs), "type int");
    }

    #[test]
    fn test_builtin_arity_table() {
        assert_eq!(Builtin::Copy.arity(), (2, false));
        assert_eq!(Builtin::Append.arity(), (1, true));
        assert!(Builtin::Println.is_statement());
        assert!(!Builtin::Len.is_statement());
        assert_eq!(Builtin::ALL.len(), 15);
    }
}
