//! The arenas shared by every package of one program.
//!
//! Objects, types, scopes, packages and package-level declarations are
//! allocated here and referred to by typed keys. Several packages may be
//! checked into the same `TCObjects`; imports then resolve to packages that
//! already live in it.

use std::borrow::Cow;

use crate::arena::Arena;
use crate::check::resolver::DeclInfo;
use crate::constant::Value;
use crate::obj::{Builtin, LangObj, Pos};
use crate::package::Package;
use crate::scope::{Scope, ScopeKind};
use crate::typ::{
    ArrayDetail, BasicDetail, ChanDetail, ChanDir, InterfaceDetail, MapDetail, NamedDetail,
    PointerDetail, SignatureDetail, SliceDetail, StructDetail, TupleDetail, Type,
};
use crate::universe::Universe;

crate::define_key! {
    /// Key of a [`LangObj`].
    pub struct ObjKey;
    /// Key of a [`Type`].
    pub struct TypeKey;
    /// Key of a [`Scope`].
    pub struct ScopeKey;
    /// Key of a [`Package`].
    pub struct PackageKey;
    /// Key of a package-level [`DeclInfo`].
    pub struct DeclInfoKey;
}

pub type LangObjs = Arena<ObjKey, LangObj>;
pub type Types = Arena<TypeKey, Type>;
pub type Scopes = Arena<ScopeKey, Scope>;
pub type Packages = Arena<PackageKey, Package>;
pub type Decls = Arena<DeclInfoKey, DeclInfo>;

/// Decides how a package is written in front of qualified names.
pub type FmtQualifier = Box<dyn Fn(&Package) -> Cow<'_, str>>;

fn default_fmt_qualifier(p: &Package) -> Cow<'_, str> {
    Cow::Borrowed(p.path())
}

pub struct TCObjects {
    pub lobjs: LangObjs,
    pub types: Types,
    pub scopes: Scopes,
    pub pkgs: Packages,
    pub decls: Decls,
    universe: Universe,
    pub fmt_qualifier: FmtQualifier,
}

impl Default for TCObjects {
    fn default() -> Self {
        Self::new()
    }
}

impl TCObjects {
    /// Creates the arenas and populates the universe scope.
    pub fn new() -> TCObjects {
        let mut objs = TCObjects {
            lobjs: Arena::new(),
            types: Arena::new(),
            scopes: Arena::new(),
            pkgs: Arena::new(),
            decls: Arena::new(),
            universe: Universe::default(),
            fmt_qualifier: Box::new(default_fmt_qualifier),
        };
        objs.universe = Universe::new(&mut objs);
        objs
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Finds a package previously created with `path`.
    pub fn find_package_by_path(&self, path: &str) -> Option<PackageKey> {
        self.pkgs
            .iter()
            .find(|(_, p)| p.path() == path)
            .map(|(k, _)| k)
    }

    // ------------------------------------------------------------------------
    // Scopes and packages

    pub fn new_scope(
        &mut self,
        parent: Option<ScopeKey>,
        kind: ScopeKind,
        pos: Pos,
        end: Pos,
    ) -> ScopeKey {
        let skey = self.scopes.insert(Scope::new(parent, kind, pos, end));
        if let Some(p) = parent {
            // package scopes are not listed as children of the universe
            if p != self.universe.scope() {
                self.scopes[p].add_child(skey);
            }
        }
        skey
    }

    pub fn new_package(&mut self, path: String) -> PackageKey {
        let univ = self.universe.scope();
        let skey = self.new_scope(Some(univ), ScopeKind::Package, 0, 0);
        self.pkgs.insert(Package::new(path, None, skey))
    }

    // ------------------------------------------------------------------------
    // Objects

    pub fn new_pkg_name(
        &mut self,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        imported: PackageKey,
    ) -> ObjKey {
        let invalid = self.universe.invalid_type();
        self.lobjs
            .insert(LangObj::new_pkg_name(pos, pkg, name, imported, invalid))
    }

    pub fn new_const(
        &mut self,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
        val: Value,
    ) -> ObjKey {
        self.lobjs.insert(LangObj::new_const(pos, pkg, name, typ, val))
    }

    pub fn new_type_name(
        &mut self,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
    ) -> ObjKey {
        self.lobjs.insert(LangObj::new_type_name(pos, pkg, name, typ))
    }

    pub fn new_var(
        &mut self,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
    ) -> ObjKey {
        self.lobjs.insert(LangObj::new_var(pos, pkg, name, typ))
    }

    pub fn new_param_var(
        &mut self,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
    ) -> ObjKey {
        self.lobjs.insert(LangObj::new_param(pos, pkg, name, typ))
    }

    pub fn new_field(
        &mut self,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
        embedded: bool,
    ) -> ObjKey {
        self.lobjs
            .insert(LangObj::new_field(pos, pkg, name, typ, embedded))
    }

    pub fn new_func(
        &mut self,
        pos: Pos,
        pkg: Option<PackageKey>,
        name: String,
        typ: Option<TypeKey>,
    ) -> ObjKey {
        self.lobjs.insert(LangObj::new_func(pos, pkg, name, typ))
    }

    pub(crate) fn new_builtin(&mut self, builtin: Builtin, typ: TypeKey) -> ObjKey {
        self.lobjs.insert(LangObj::new_builtin(builtin, typ))
    }

    pub(crate) fn new_nil(&mut self, typ: TypeKey) -> ObjKey {
        self.lobjs.insert(LangObj::new_nil(typ))
    }

    // ------------------------------------------------------------------------
    // Types

    pub(crate) fn new_t_basic(&mut self, detail: BasicDetail) -> TypeKey {
        self.types.insert(Type::Basic(detail))
    }

    pub fn new_t_array(&mut self, elem: TypeKey, len: Option<u64>) -> TypeKey {
        self.types.insert(Type::Array(ArrayDetail::new(elem, len)))
    }

    pub fn new_t_slice(&mut self, elem: TypeKey) -> TypeKey {
        self.types.insert(Type::Slice(SliceDetail::new(elem)))
    }

    pub fn new_t_struct(&mut self, fields: Vec<ObjKey>, tags: Option<Vec<Option<String>>>) -> TypeKey {
        self.types.insert(Type::Struct(StructDetail::new(fields, tags)))
    }

    pub fn new_t_pointer(&mut self, base: TypeKey) -> TypeKey {
        self.types.insert(Type::Pointer(PointerDetail::new(base)))
    }

    pub fn new_t_tuple(&mut self, vars: Vec<ObjKey>) -> TypeKey {
        self.types.insert(Type::Tuple(TupleDetail::new(vars)))
    }

    pub fn new_t_signature(
        &mut self,
        scope: Option<ScopeKey>,
        recv: Option<ObjKey>,
        params: TypeKey,
        results: TypeKey,
        variadic: bool,
    ) -> TypeKey {
        let sig = SignatureDetail::new(scope, recv, params, results, variadic);
        self.types.insert(Type::Signature(sig))
    }

    pub fn new_t_interface(&mut self, methods: Vec<ObjKey>, embeddeds: Vec<TypeKey>) -> TypeKey {
        self.types
            .insert(Type::Interface(InterfaceDetail::new(methods, embeddeds)))
    }

    pub fn new_t_empty_interface(&mut self) -> TypeKey {
        self.types.insert(Type::Interface(InterfaceDetail::new_empty()))
    }

    pub fn new_t_map(&mut self, key: TypeKey, elem: TypeKey) -> TypeKey {
        self.types.insert(Type::Map(MapDetail::new(key, elem)))
    }

    pub fn new_t_chan(&mut self, dir: ChanDir, elem: TypeKey) -> TypeKey {
        self.types.insert(Type::Chan(ChanDetail::new(dir, elem)))
    }

    /// Creates a named type and binds it to its type name, if any.
    pub fn new_t_named(
        &mut self,
        obj: Option<ObjKey>,
        underlying: Option<TypeKey>,
        methods: Vec<ObjKey>,
    ) -> TypeKey {
        let t = self
            .types
            .insert(Type::Named(NamedDetail::new(obj, underlying, methods)));
        if let Some(o) = obj {
            if self.lobjs[o].typ().is_none() {
                self.lobjs[o].set_type(Some(t));
            }
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typ;

    #[test]
    fn test_package_scope_hangs_off_universe_without_being_listed() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("p".to_string());
        let pscope = *objs.pkgs[p].scope();
        let univ = objs.universe().scope();
        assert_eq!(objs.scopes[pscope].parent(), Some(univ));
        assert!(!objs.scopes[univ].children().contains(&pscope));
        assert_eq!(objs.find_package_by_path("p"), Some(p));
        assert_eq!(objs.find_package_by_path("q"), None);
    }

    #[test]
    fn test_named_type_binds_type_name() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("p".to_string());
        let tname = objs.new_type_name(0, Some(p), "T".to_string(), None);
        let int = objs.universe().types()[&typ::BasicType::Int];
        let named = objs.new_t_named(Some(tname), Some(int), vec![]);
        assert_eq!(objs.lobjs[tname].typ(), Some(named));
        assert_eq!(typ::type_string(named, &objs), "p.T");
        assert_eq!(typ::underlying_type(named, &objs), int);
    }
}
