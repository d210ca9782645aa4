//! Type representations.
//!
//! Types are allocated in [`TCObjects::types`] and shared by key; structural
//! types are not canonicalized, so equality is decided by [`identical`].

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt::{self, Write};

use crate::objects::{ObjKey, ScopeKey, TCObjects, TypeKey};

#[derive(Debug)]
pub enum Type {
    Basic(BasicDetail),
    Array(ArrayDetail),
    Slice(SliceDetail),
    Struct(StructDetail),
    Pointer(PointerDetail),
    Tuple(TupleDetail),
    Signature(SignatureDetail),
    Interface(InterfaceDetail),
    Map(MapDetail),
    Chan(ChanDetail),
    Named(NamedDetail),
}

impl Type {
    pub fn try_as_basic(&self) -> Option<&BasicDetail> {
        match self {
            Type::Basic(b) => Some(b),
            _ => None,
        }
    }

    pub fn try_as_array(&self) -> Option<&ArrayDetail> {
        match self {
            Type::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn try_as_slice(&self) -> Option<&SliceDetail> {
        match self {
            Type::Slice(s) => Some(s),
            _ => None,
        }
    }

    pub fn try_as_struct(&self) -> Option<&StructDetail> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn try_as_pointer(&self) -> Option<&PointerDetail> {
        match self {
            Type::Pointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn try_as_tuple(&self) -> Option<&TupleDetail> {
        match self {
            Type::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn try_as_signature(&self) -> Option<&SignatureDetail> {
        match self {
            Type::Signature(s) => Some(s),
            _ => None,
        }
    }

    pub fn try_as_interface(&self) -> Option<&InterfaceDetail> {
        match self {
            Type::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn try_as_map(&self) -> Option<&MapDetail> {
        match self {
            Type::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn try_as_chan(&self) -> Option<&ChanDetail> {
        match self {
            Type::Chan(c) => Some(c),
            _ => None,
        }
    }

    pub fn try_as_named(&self) -> Option<&NamedDetail> {
        match self {
            Type::Named(n) => Some(n),
            _ => None,
        }
    }

    pub fn try_as_named_mut(&mut self) -> Option<&mut NamedDetail> {
        match self {
            Type::Named(n) => Some(n),
            _ => None,
        }
    }

    pub fn underlying(&self) -> Option<TypeKey> {
        match self {
            Type::Named(detail) => detail.underlying,
            _ => None,
        }
    }

    pub fn underlying_val<'a>(&'a self, objs: &'a TCObjects) -> &'a Type {
        match self.underlying() {
            Some(k) => &objs.types[k],
            None => self,
        }
    }

    /// Basic and named types have names; all others are type literals.
    pub fn is_named(&self) -> bool {
        matches!(self, Type::Basic(_) | Type::Named(_))
    }

    fn basic_info(&self, objs: &TCObjects) -> Option<BasicInfo> {
        self.underlying_val(objs).try_as_basic().map(|b| b.info())
    }

    pub fn is_invalid(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs) == Some(BasicInfo::IsInvalid)
    }

    pub fn is_boolean(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs) == Some(BasicInfo::IsBoolean)
    }

    pub fn is_integer(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs) == Some(BasicInfo::IsInteger)
    }

    pub fn is_unsigned(&self, objs: &TCObjects) -> bool {
        match self.underlying_val(objs) {
            Type::Basic(b) => b.typ().is_unsigned(),
            _ => false,
        }
    }

    pub fn is_float(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs) == Some(BasicInfo::IsFloat)
    }

    pub fn is_complex(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs) == Some(BasicInfo::IsComplex)
    }

    pub fn is_numeric(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs).map_or(false, |i| i.is_numeric())
    }

    pub fn is_string(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs) == Some(BasicInfo::IsString)
    }

    pub fn is_typed(&self, objs: &TCObjects) -> bool {
        match self.underlying_val(objs) {
            Type::Basic(b) => !b.typ().is_untyped(),
            _ => true,
        }
    }

    pub fn is_untyped(&self, objs: &TCObjects) -> bool {
        match self.underlying_val(objs) {
            Type::Basic(b) => b.typ().is_untyped(),
            _ => false,
        }
    }

    pub fn is_ordered(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs).map_or(false, |i| i.is_ordered())
    }

    pub fn is_const_type(&self, objs: &TCObjects) -> bool {
        self.basic_info(objs).map_or(false, |i| i.is_const_type())
    }

    pub fn is_interface(&self, objs: &TCObjects) -> bool {
        matches!(self.underlying_val(objs), Type::Interface(_))
    }

    /// Reports whether `nil` is a value of this type.
    pub fn has_nil(&self, objs: &TCObjects) -> bool {
        match self.underlying_val(objs) {
            Type::Basic(b) => b.typ() == BasicType::UntypedNil,
            Type::Slice(_)
            | Type::Pointer(_)
            | Type::Signature(_)
            | Type::Interface(_)
            | Type::Map(_)
            | Type::Chan(_) => true,
            _ => false,
        }
    }

    pub fn comparable(&self, objs: &TCObjects) -> bool {
        match self.underlying_val(objs) {
            Type::Basic(b) => b.typ() != BasicType::UntypedNil,
            Type::Pointer(_) | Type::Interface(_) | Type::Chan(_) => true,
            Type::Struct(s) => s
                .fields()
                .iter()
                .all(|f| objs.lobjs[*f].typ().map_or(false, |t| comparable(t, objs))),
            Type::Array(a) => comparable(a.elem(), objs),
            _ => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BasicType {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Str,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
    // aliases
    Byte,
    Rune,
}

impl BasicType {
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            BasicType::Uint
                | BasicType::Uint8
                | BasicType::Uint16
                | BasicType::Uint32
                | BasicType::Uint64
                | BasicType::Uintptr
                | BasicType::Byte
        )
    }

    pub fn is_untyped(&self) -> bool {
        matches!(
            self,
            BasicType::UntypedBool
                | BasicType::UntypedInt
                | BasicType::UntypedRune
                | BasicType::UntypedFloat
                | BasicType::UntypedComplex
                | BasicType::UntypedString
                | BasicType::UntypedNil
        )
    }

    /// Resolves the `byte` and `rune` aliases.
    pub fn real_type(&self) -> BasicType {
        match self {
            BasicType::Byte => BasicType::Uint8,
            BasicType::Rune => BasicType::Int32,
            _ => *self,
        }
    }

    /// Size in bytes; `word_size` applies to `int`, `uint` and `uintptr`.
    pub fn size_of(&self, word_size: u8) -> usize {
        match self.real_type() {
            BasicType::Bool | BasicType::Int8 | BasicType::Uint8 => 1,
            BasicType::Int16 | BasicType::Uint16 => 2,
            BasicType::Int32 | BasicType::Uint32 | BasicType::Float32 => 4,
            BasicType::Int64 | BasicType::Uint64 | BasicType::Float64 | BasicType::Complex64 => 8,
            BasicType::Complex128 => 16,
            BasicType::Int | BasicType::Uint | BasicType::Uintptr => word_size as usize,
            BasicType::Str => 2 * word_size as usize,
            _ => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BasicInfo {
    IsInvalid,
    IsBoolean,
    IsInteger,
    IsFloat,
    IsComplex,
    IsString,
    IsNil,
}

impl BasicInfo {
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            BasicInfo::IsInteger | BasicInfo::IsFloat | BasicInfo::IsString
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            BasicInfo::IsInteger | BasicInfo::IsFloat | BasicInfo::IsComplex
        )
    }

    pub fn is_const_type(&self) -> bool {
        matches!(
            self,
            BasicInfo::IsBoolean
                | BasicInfo::IsInteger
                | BasicInfo::IsFloat
                | BasicInfo::IsComplex
                | BasicInfo::IsString
        )
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BasicDetail {
    typ: BasicType,
    info: BasicInfo,
    name: &'static str,
}

impl BasicDetail {
    pub fn new(typ: BasicType, info: BasicInfo, name: &'static str) -> BasicDetail {
        BasicDetail { typ, info, name }
    }

    pub fn typ(&self) -> BasicType {
        self.typ
    }

    pub fn info(&self) -> BasicInfo {
        self.info
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

#[derive(Debug)]
pub struct ArrayDetail {
    len: Option<u64>,
    elem: TypeKey,
}

impl ArrayDetail {
    pub fn new(elem: TypeKey, len: Option<u64>) -> ArrayDetail {
        ArrayDetail { len, elem }
    }

    /// `None` when the length expression was invalid.
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

#[derive(Debug)]
pub struct SliceDetail {
    elem: TypeKey,
}

impl SliceDetail {
    pub fn new(elem: TypeKey) -> SliceDetail {
        SliceDetail { elem }
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

#[derive(Debug)]
pub struct StructDetail {
    fields: Vec<ObjKey>,
    tags: Option<Vec<Option<String>>>,
}

impl StructDetail {
    pub fn new(fields: Vec<ObjKey>, tags: Option<Vec<Option<String>>>) -> StructDetail {
        StructDetail { fields, tags }
    }

    pub fn fields(&self) -> &Vec<ObjKey> {
        &self.fields
    }

    pub fn tag(&self, i: usize) -> Option<&String> {
        self.tags.as_ref().and_then(|t| t.get(i)).and_then(|t| t.as_ref())
    }
}

#[derive(Debug)]
pub struct PointerDetail {
    base: TypeKey,
}

impl PointerDetail {
    pub fn new(base: TypeKey) -> PointerDetail {
        PointerDetail { base }
    }

    pub fn base(&self) -> TypeKey {
        self.base
    }
}

/// An ordered list of variables: parameter lists, result lists and the
/// types of multi-valued expressions.
#[derive(Debug)]
pub struct TupleDetail {
    vars: Vec<ObjKey>,
}

impl TupleDetail {
    pub fn new(vars: Vec<ObjKey>) -> TupleDetail {
        TupleDetail { vars }
    }

    pub fn vars(&self) -> &Vec<ObjKey> {
        &self.vars
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SignatureDetail {
    scope: Option<ScopeKey>,
    recv: Option<ObjKey>,
    params: TypeKey,
    results: TypeKey,
    variadic: bool,
}

impl SignatureDetail {
    pub fn new(
        scope: Option<ScopeKey>,
        recv: Option<ObjKey>,
        params: TypeKey,
        results: TypeKey,
        variadic: bool,
    ) -> SignatureDetail {
        SignatureDetail {
            scope,
            recv,
            params,
            results,
            variadic,
        }
    }

    /// The function scope; `None` for signatures synthesized by the checker.
    pub fn scope(&self) -> Option<ScopeKey> {
        self.scope
    }

    pub fn recv(&self) -> &Option<ObjKey> {
        &self.recv
    }

    pub fn set_recv(&mut self, recv: Option<ObjKey>) {
        self.recv = recv;
    }

    pub fn params(&self) -> TypeKey {
        self.params
    }

    pub fn results(&self) -> TypeKey {
        self.results
    }

    pub fn variadic(&self) -> bool {
        self.variadic
    }

    pub fn param_vars<'a>(&self, objs: &'a TCObjects) -> &'a [ObjKey] {
        tuple_vars(self.params, objs)
    }

    pub fn result_vars<'a>(&self, objs: &'a TCObjects) -> &'a [ObjKey] {
        tuple_vars(self.results, objs)
    }
}

/// The variables of tuple `t`, empty if `t` is not a tuple.
pub fn tuple_vars(t: TypeKey, objs: &TCObjects) -> &[ObjKey] {
    objs.types[t]
        .try_as_tuple()
        .map_or(&[][..], |tuple| tuple.vars().as_slice())
}

#[derive(Debug)]
pub struct InterfaceDetail {
    methods: Vec<ObjKey>,
    embeddeds: Vec<TypeKey>,
    all_methods: RefCell<Option<Vec<ObjKey>>>,
}

impl InterfaceDetail {
    pub fn new(methods: Vec<ObjKey>, embeddeds: Vec<TypeKey>) -> InterfaceDetail {
        InterfaceDetail {
            methods,
            embeddeds,
            all_methods: RefCell::new(None),
        }
    }

    pub fn new_empty() -> InterfaceDetail {
        InterfaceDetail {
            methods: Vec::new(),
            embeddeds: Vec::new(),
            all_methods: RefCell::new(Some(Vec::new())),
        }
    }

    /// Explicitly declared methods, in source order.
    pub fn methods(&self) -> &Vec<ObjKey> {
        &self.methods
    }

    pub fn embeddeds(&self) -> &Vec<TypeKey> {
        &self.embeddeds
    }

    /// The complete method set, sorted by id; `None` until [`complete`](Self::complete).
    pub fn all_methods(&self) -> Ref<'_, Option<Vec<ObjKey>>> {
        self.all_methods.borrow()
    }

    pub fn is_empty(&self, objs: &TCObjects) -> bool {
        self.complete(objs);
        self.all_methods().as_ref().map_or(true, |m| m.is_empty())
    }

    /// Flattens embedded interfaces into the complete method set.
    pub fn complete(&self, objs: &TCObjects) {
        if self.all_methods.borrow().is_some() {
            return;
        }
        let mut all = self.methods.clone();
        for &tkey in &self.embeddeds {
            let ut = underlying_type(tkey, objs);
            if let Some(embedded) = objs.types[ut].try_as_interface() {
                embedded.complete(objs);
                if let Some(methods) = embedded.all_methods().as_ref() {
                    for &m in methods {
                        let id = objs.lobjs[m].id(objs);
                        if !all.iter().any(|&a| objs.lobjs[a].id(objs) == id) {
                            all.push(m);
                        }
                    }
                }
            }
        }
        all.sort_by(|a, b| objs.lobjs[*a].id(objs).cmp(&objs.lobjs[*b].id(objs)));
        *self.all_methods.borrow_mut() = Some(all);
    }
}

#[derive(Debug)]
pub struct MapDetail {
    key: TypeKey,
    elem: TypeKey,
}

impl MapDetail {
    pub fn new(key: TypeKey, elem: TypeKey) -> MapDetail {
        MapDetail { key, elem }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChanDir {
    SendRecv,
    SendOnly,
    RecvOnly,
}

#[derive(Debug)]
pub struct ChanDetail {
    dir: ChanDir,
    elem: TypeKey,
}

impl ChanDetail {
    pub fn new(dir: ChanDir, elem: TypeKey) -> ChanDetail {
        ChanDetail { dir, elem }
    }

    pub fn dir(&self) -> ChanDir {
        self.dir
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

#[derive(Debug)]
pub struct NamedDetail {
    obj: Option<ObjKey>,
    underlying: Option<TypeKey>,
    methods: Vec<ObjKey>,
}

impl NamedDetail {
    pub fn new(obj: Option<ObjKey>, underlying: Option<TypeKey>, methods: Vec<ObjKey>) -> NamedDetail {
        NamedDetail {
            obj,
            underlying,
            methods,
        }
    }

    pub fn obj(&self) -> Option<ObjKey> {
        self.obj
    }

    /// Methods declared with this type as receiver base, in declaration order.
    pub fn methods(&self) -> &Vec<ObjKey> {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut Vec<ObjKey> {
        &mut self.methods
    }

    /// `None` while the type declaration is still being checked.
    pub fn try_underlying(&self) -> Option<TypeKey> {
        self.underlying
    }

    pub fn set_underlying(&mut self, t: TypeKey) {
        self.underlying = Some(t);
    }
}

// ----------------------------------------------------------------------------
// Predicates

pub fn underlying_type(t: TypeKey, objs: &TCObjects) -> TypeKey {
    objs.types[t].underlying().unwrap_or(t)
}

pub fn is_named(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_named()
}

pub fn is_invalid(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_invalid(objs)
}

pub fn is_boolean(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_boolean(objs)
}

pub fn is_integer(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_integer(objs)
}

pub fn is_unsigned(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_unsigned(objs)
}

pub fn is_float(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_float(objs)
}

pub fn is_complex(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_complex(objs)
}

pub fn is_numeric(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_numeric(objs)
}

pub fn is_string(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_string(objs)
}

pub fn is_typed(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_typed(objs)
}

pub fn is_untyped(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_untyped(objs)
}

pub fn is_ordered(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_ordered(objs)
}

pub fn is_const_type(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_const_type(objs)
}

pub fn is_interface(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].is_interface(objs)
}

pub fn has_nil(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].has_nil(objs)
}

pub fn comparable(t: TypeKey, objs: &TCObjects) -> bool {
    objs.types[t].comparable(objs)
}

/// The basic kind of `t`'s underlying type, if it is basic.
pub fn basic_kind(t: TypeKey, objs: &TCObjects) -> Option<BasicType> {
    objs.types[t].underlying_val(objs).try_as_basic().map(|b| b.typ())
}

/// The type an untyped constant gets when nothing else decides;
/// other types are returned unchanged.
pub fn untyped_default_type(t: TypeKey, objs: &TCObjects) -> TypeKey {
    let univ = objs.universe();
    match objs.types[t].try_as_basic().map(|b| b.typ()) {
        Some(BasicType::UntypedBool) => univ.types()[&BasicType::Bool],
        Some(BasicType::UntypedInt) => univ.types()[&BasicType::Int],
        Some(BasicType::UntypedRune) => univ.rune(),
        Some(BasicType::UntypedFloat) => univ.types()[&BasicType::Float64],
        Some(BasicType::UntypedComplex) => univ.types()[&BasicType::Complex128],
        Some(BasicType::UntypedString) => univ.types()[&BasicType::Str],
        _ => t,
    }
}

pub fn identical(x: TypeKey, y: TypeKey, objs: &TCObjects) -> bool {
    identical_impl(x, y, &mut HashSet::new(), objs)
}

pub fn identical_o(x: Option<TypeKey>, y: Option<TypeKey>, objs: &TCObjects) -> bool {
    match (x, y) {
        (Some(a), Some(b)) => identical(a, b, objs),
        (None, None) => true,
        _ => false,
    }
}

fn identical_impl(
    x: TypeKey,
    y: TypeKey,
    dup: &mut HashSet<(TypeKey, TypeKey)>,
    objs: &TCObjects,
) -> bool {
    if x == y {
        return true;
    }
    let vars_identical = |a: &[ObjKey], b: &[ObjKey], dup: &mut HashSet<(TypeKey, TypeKey)>| {
        a.len() == b.len()
            && a.iter().zip(b.iter()).all(|(v, w)| {
                identical_impl_o(objs.lobjs[*v].typ(), objs.lobjs[*w].typ(), dup, objs)
            })
    };
    match (&objs.types[x], &objs.types[y]) {
        (Type::Basic(bx), Type::Basic(by)) => bx.typ().real_type() == by.typ().real_type(),
        (Type::Array(ax), Type::Array(ay)) => {
            ax.len() == ay.len() && identical_impl(ax.elem(), ay.elem(), dup, objs)
        }
        (Type::Slice(sx), Type::Slice(sy)) => identical_impl(sx.elem(), sy.elem(), dup, objs),
        (Type::Struct(sx), Type::Struct(sy)) => {
            sx.fields().len() == sy.fields().len()
                && sx.fields().iter().zip(sy.fields()).enumerate().all(|(i, (f, g))| {
                    let of = &objs.lobjs[*f];
                    let og = &objs.lobjs[*g];
                    of.var_embedded() == og.var_embedded()
                        && sx.tag(i) == sy.tag(i)
                        && of.same_id(og.pkg(), og.name(), objs)
                        && identical_impl_o(of.typ(), og.typ(), dup, objs)
                })
        }
        (Type::Pointer(px), Type::Pointer(py)) => identical_impl(px.base(), py.base(), dup, objs),
        (Type::Tuple(tx), Type::Tuple(ty)) => vars_identical(tx.vars(), ty.vars(), dup),
        (Type::Signature(sx), Type::Signature(sy)) => {
            sx.variadic() == sy.variadic()
                && vars_identical(sx.param_vars(objs), sy.param_vars(objs), dup)
                && vars_identical(sx.result_vars(objs), sy.result_vars(objs), dup)
        }
        (Type::Interface(ix), Type::Interface(iy)) => {
            ix.complete(objs);
            iy.complete(objs);
            let ax = ix.all_methods();
            let ay = iy.all_methods();
            match (ax.as_ref(), ay.as_ref()) {
                (Some(a), Some(b)) if a.len() == b.len() => {
                    // interfaces may refer to themselves through method signatures
                    if !dup.insert((x, y)) {
                        return true;
                    }
                    a.iter().zip(b.iter()).all(|(m, n)| {
                        let om = &objs.lobjs[*m];
                        let on = &objs.lobjs[*n];
                        om.id(objs) == on.id(objs) && identical_impl_o(om.typ(), on.typ(), dup, objs)
                    })
                }
                _ => false,
            }
        }
        (Type::Map(mx), Type::Map(my)) => {
            identical_impl(mx.key(), my.key(), dup, objs) && identical_impl(mx.elem(), my.elem(), dup, objs)
        }
        (Type::Chan(cx), Type::Chan(cy)) => {
            cx.dir() == cy.dir() && identical_impl(cx.elem(), cy.elem(), dup, objs)
        }
        (Type::Named(nx), Type::Named(ny)) => nx.obj().is_some() && nx.obj() == ny.obj(),
        _ => false,
    }
}

fn identical_impl_o(
    x: Option<TypeKey>,
    y: Option<TypeKey>,
    dup: &mut HashSet<(TypeKey, TypeKey)>,
    objs: &TCObjects,
) -> bool {
    match (x, y) {
        (Some(a), Some(b)) => identical_impl(a, b, dup, objs),
        (None, None) => true,
        _ => false,
    }
}

// ----------------------------------------------------------------------------
// Formatting

/// Writes `t` in source form, qualifying named types by package path.
pub fn fmt_type(t: Option<TypeKey>, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
    let Some(tkey) = t else {
        return f.write_str("<nil>");
    };
    match &objs.types[tkey] {
        Type::Basic(detail) => f.write_str(detail.name()),
        Type::Array(detail) => {
            match detail.len() {
                Some(n) => write!(f, "[{}]", n)?,
                None => f.write_str("[unknown]")?,
            }
            fmt_type(Some(detail.elem()), f, objs)
        }
        Type::Slice(detail) => {
            f.write_str("[]")?;
            fmt_type(Some(detail.elem()), f, objs)
        }
        Type::Struct(detail) => {
            f.write_str("struct{")?;
            for (i, key) in detail.fields().iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                let field = &objs.lobjs[*key];
                if !field.var_embedded() {
                    write!(f, "{} ", field.name())?;
                }
                fmt_type(field.typ(), f, objs)?;
                if let Some(tag) = detail.tag(i) {
                    write!(f, " {:?}", tag)?;
                }
            }
            f.write_char('}')
        }
        Type::Pointer(detail) => {
            f.write_char('*')?;
            fmt_type(Some(detail.base()), f, objs)
        }
        Type::Tuple(_) => fmt_tuple(tkey, false, f, objs),
        Type::Signature(_) => {
            f.write_str("func")?;
            fmt_signature(tkey, f, objs)
        }
        Type::Interface(detail) => {
            f.write_str("interface{")?;
            let mut first = true;
            for k in detail.methods() {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                let m = &objs.lobjs[*k];
                f.write_str(m.name())?;
                if let Some(sig) = m.typ() {
                    fmt_signature(sig, f, objs)?;
                }
            }
            for k in detail.embeddeds() {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                fmt_type(Some(*k), f, objs)?;
            }
            f.write_char('}')
        }
        Type::Map(detail) => {
            f.write_str("map[")?;
            fmt_type(Some(detail.key()), f, objs)?;
            f.write_char(']')?;
            fmt_type(Some(detail.elem()), f, objs)
        }
        Type::Chan(detail) => {
            let (prefix, paren) = match detail.dir() {
                // chan (<-chan T) needs parentheses to stay unambiguous
                ChanDir::SendRecv => (
                    "chan ",
                    objs.types[detail.elem()]
                        .try_as_chan()
                        .map_or(false, |c| c.dir() == ChanDir::RecvOnly),
                ),
                ChanDir::SendOnly => ("chan<- ", false),
                ChanDir::RecvOnly => ("<-chan ", false),
            };
            f.write_str(prefix)?;
            if paren {
                f.write_char('(')?;
            }
            fmt_type(Some(detail.elem()), f, objs)?;
            if paren {
                f.write_char(')')?;
            }
            Ok(())
        }
        Type::Named(detail) => match detail.obj() {
            Some(okey) => {
                let o = &objs.lobjs[okey];
                if let Some(pkg) = o.pkg() {
                    objs.pkgs[pkg].fmt_with_qualifier(f, &*objs.fmt_qualifier)?;
                }
                f.write_str(o.name())
            }
            None => f.write_str("<Named w/o object>"),
        },
    }
}

/// Writes a signature without the `func` keyword: `(x int) (string, bool)`.
pub fn fmt_signature(t: TypeKey, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
    let Some(sig) = objs.types[t].try_as_signature() else {
        return fmt_type(Some(t), f, objs);
    };
    fmt_tuple(sig.params(), sig.variadic(), f, objs)?;
    let results = sig.result_vars(objs);
    match results {
        [] => Ok(()),
        [only] if objs.lobjs[*only].name().is_empty() => {
            f.write_char(' ')?;
            fmt_type(objs.lobjs[*only].typ(), f, objs)
        }
        _ => {
            f.write_char(' ')?;
            fmt_tuple(sig.results(), false, f, objs)
        }
    }
}

fn fmt_tuple(tkey: TypeKey, variadic: bool, f: &mut impl Write, objs: &TCObjects) -> fmt::Result {
    f.write_char('(')?;
    let vars = tuple_vars(tkey, objs);
    for (i, v) in vars.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        let obj = &objs.lobjs[*v];
        if !obj.name().is_empty() {
            write!(f, "{} ", obj.name())?;
        }
        let var_typ = obj.typ();
        let slice_elem = var_typ
            .and_then(|t| objs.types[underlying_type(t, objs)].try_as_slice())
            .map(|s| s.elem());
        match slice_elem {
            Some(elem) if variadic && i + 1 == vars.len() => {
                f.write_str("...")?;
                fmt_type(Some(elem), f, objs)?;
            }
            _ => fmt_type(var_typ, f, objs)?,
        }
    }
    f.write_char(')')
}

pub fn type_string(t: TypeKey, objs: &TCObjects) -> String {
    let mut s = String::new();
    let _ = fmt_type(Some(t), &mut s, objs);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(objs: &TCObjects, b: BasicType) -> TypeKey {
        objs.universe().types()[&b]
    }

    #[test]
    fn test_composite_type_strings() {
        let mut objs = TCObjects::new();
        let int = basic(&objs, BasicType::Int);
        let string = basic(&objs, BasicType::Str);
        let byte = objs.universe().byte();

        let slice = objs.new_t_slice(byte);
        assert_eq!(type_string(slice, &objs), "[]byte");
        let map = objs.new_t_map(int, string);
        assert_eq!(type_string(map, &objs), "map[int]string");
        let recv_only = objs.new_t_chan(ChanDir::RecvOnly, string);
        let chan = objs.new_t_chan(ChanDir::SendRecv, recv_only);
        assert_eq!(type_string(chan, &objs), "chan (<-chan string)");
        let arr = objs.new_t_array(int, Some(3));
        assert_eq!(type_string(arr, &objs), "[3]int");
    }

    #[test]
    fn test_signature_strings() {
        let mut objs = TCObjects::new();
        let int = basic(&objs, BasicType::Int);
        let boolean = basic(&objs, BasicType::Bool);
        let x = objs.new_param_var(0, None, "x".to_string(), Some(int));
        let params = objs.new_t_tuple(vec![x]);
        let empty = objs.new_t_tuple(vec![]);
        let sig = objs.new_t_signature(None, None, params, empty, false);
        assert_eq!(type_string(sig, &objs), "func(x int)");

        let r = objs.new_param_var(0, None, String::new(), Some(boolean));
        let results = objs.new_t_tuple(vec![r]);
        let sig = objs.new_t_signature(None, None, params, results, false);
        assert_eq!(type_string(sig, &objs), "func(x int) bool");

        let s = objs.new_t_slice(int);
        let rest = objs.new_param_var(0, None, String::new(), Some(s));
        let vparams = objs.new_t_tuple(vec![rest]);
        let sig = objs.new_t_signature(None, None, vparams, results, true);
        assert_eq!(type_string(sig, &objs), "func(...int) bool");
    }

    #[test]
    fn test_identical_structural_and_aliases() {
        let mut objs = TCObjects::new();
        let uint8 = basic(&objs, BasicType::Uint8);
        let byte = objs.universe().byte();
        assert!(identical(uint8, byte, &objs));

        let a = objs.new_t_slice(byte);
        let b = objs.new_t_slice(uint8);
        assert!(identical(a, b, &objs));

        let int = basic(&objs, BasicType::Int);
        let c = objs.new_t_slice(int);
        assert!(!identical(a, c, &objs));
    }

    #[test]
    fn test_untyped_defaults() {
        let objs = TCObjects::new();
        let cases = [
            (BasicType::UntypedBool, "bool"),
            (BasicType::UntypedInt, "int"),
            (BasicType::UntypedRune, "rune"),
            (BasicType::UntypedFloat, "float64"),
            (BasicType::UntypedComplex, "complex128"),
            (BasicType::UntypedString, "string"),
            (BasicType::UntypedNil, "untyped nil"),
        ];
        for (b, want) in cases {
            let t = untyped_default_type(basic(&objs, b), &objs);
            assert_eq!(type_string(t, &objs), want);
        }
    }

    #[test]
    fn test_word_size_applies_to_int() {
        assert_eq!(BasicType::Int.size_of(4), 4);
        assert_eq!(BasicType::Rune.size_of(4), 4);
        assert_eq!(BasicType::Complex128.size_of(8), 16);
    }
}
