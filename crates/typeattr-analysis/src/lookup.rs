//! Field and method lookup through embedded fields.
//!
//! The search is breadth-first by embedding depth: a name found at a
//! shallower depth shadows deeper ones, and two matches at the same depth
//! make the selector ambiguous.

use std::collections::HashSet;

use crate::objects::{ObjKey, PackageKey, TCObjects, TypeKey};
use crate::typ::{self, Type};

/// Outcome of [`lookup_field_or_method`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupResult {
    /// A field or method with its index path and whether a pointer was
    /// dereferenced (or the receiver's address implicitly taken) on the way.
    Entry(ObjKey, Vec<usize>, bool),
    /// Two or more matches at the same depth; the path of the last one seen.
    Ambiguous(Vec<usize>),
    /// A pointer-receiver method on a value that cannot be addressed.
    BadMethodReceiver,
    NotFound,
}

/// A type reached through a chain of embedded fields.
#[derive(Debug)]
struct EmbeddedType {
    typ: TypeKey,
    indices: Vec<usize>,
    indirect: bool,
    multiples: bool,
}

/// Splits off one level of (unnamed) pointer.
pub fn try_deref(t: TypeKey, objs: &TCObjects) -> (TypeKey, bool) {
    match objs.types[t].try_as_pointer() {
        Some(p) => (p.base(), true),
        None => (t, false),
    }
}

/// Looks up `name` in the fields and methods of `t`. `addressable` tells
/// whether the receiver is an addressable value, which makes pointer-receiver
/// methods of `T` reachable from `T`.
pub fn lookup_field_or_method(
    t: TypeKey,
    addressable: bool,
    pkg: Option<PackageKey>,
    name: &str,
    objs: &TCObjects,
) -> LookupResult {
    if name == "_" {
        return LookupResult::NotFound;
    }
    let (base, is_ptr) = try_deref(t, objs);
    // *I where I is an interface has no methods
    if is_ptr && typ::is_interface(base, objs) {
        return LookupResult::NotFound;
    }

    let mut current = vec![EmbeddedType {
        typ: base,
        indices: vec![],
        indirect: is_ptr,
        multiples: false,
    }];
    let mut seen: HashSet<TypeKey> = HashSet::new();

    while !current.is_empty() {
        let mut next = vec![];
        let mut found: Option<(ObjKey, Vec<usize>, bool)> = None;

        for e in current.iter() {
            let mut tkey = e.typ;
            if let Some(named) = objs.types[tkey].try_as_named() {
                if !seen.insert(tkey) {
                    continue;
                }
                if let Some((i, m)) = lookup_method(named.methods(), pkg, name, objs) {
                    let indices = concat(&e.indices, i);
                    if found.is_some() || e.multiples {
                        return LookupResult::Ambiguous(indices);
                    }
                    found = Some((m, indices, e.indirect));
                    // a matching method hides fields of the same name
                    continue;
                }
                match named.try_underlying() {
                    Some(u) => tkey = u,
                    None => continue,
                }
            }

            match &objs.types[tkey] {
                Type::Struct(detail) => {
                    for (i, &f) in detail.fields().iter().enumerate() {
                        let field = &objs.lobjs[f];
                        if field.same_id(pkg, name, objs) {
                            let indices = concat(&e.indices, i);
                            if found.is_some() || e.multiples {
                                return LookupResult::Ambiguous(indices);
                            }
                            found = Some((f, indices, e.indirect));
                            continue;
                        }
                        if found.is_none() && field.var_embedded() {
                            if let Some(ft) = field.typ() {
                                let (ft, is_ptr) = try_deref(ft, objs);
                                next.push(EmbeddedType {
                                    typ: ft,
                                    indices: concat(&e.indices, i),
                                    indirect: e.indirect || is_ptr,
                                    multiples: e.multiples,
                                });
                            }
                        }
                    }
                }
                Type::Interface(detail) => {
                    detail.complete(objs);
                    let all = detail.all_methods();
                    let methods = all.as_deref().unwrap_or(&[]);
                    if let Some((i, m)) = lookup_method(methods, pkg, name, objs) {
                        let indices = concat(&e.indices, i);
                        if found.is_some() || e.multiples {
                            return LookupResult::Ambiguous(indices);
                        }
                        found = Some((m, indices, e.indirect));
                    }
                }
                _ => {}
            }
        }

        if let Some((okey, indices, indirect)) = found {
            let ptr_recv = objs.lobjs[okey].entity_type().func_has_ptr_recv();
            if ptr_recv && !indirect {
                if !addressable {
                    return LookupResult::BadMethodReceiver;
                }
                // the receiver's address is taken implicitly
                return LookupResult::Entry(okey, indices, true);
            }
            return LookupResult::Entry(okey, indices, indirect);
        }
        current = consolidate_multiples(next, objs);
    }
    LookupResult::NotFound
}

fn concat(list: &[usize], i: usize) -> Vec<usize> {
    let mut v = Vec::with_capacity(list.len() + 1);
    v.extend_from_slice(list);
    v.push(i);
    v
}

fn lookup_method(
    methods: &[ObjKey],
    pkg: Option<PackageKey>,
    name: &str,
    objs: &TCObjects,
) -> Option<(usize, ObjKey)> {
    methods
        .iter()
        .enumerate()
        .find(|(_, &m)| objs.lobjs[m].same_id(pkg, name, objs))
        .map(|(i, &m)| (i, m))
}

/// Merges entries for identical types, marking them as reachable along
/// several paths.
fn consolidate_multiples(list: Vec<EmbeddedType>, objs: &TCObjects) -> Vec<EmbeddedType> {
    let mut result: Vec<EmbeddedType> = Vec::with_capacity(list.len());
    for e in list {
        match result.iter_mut().find(|r| typ::identical(r.typ, e.typ, objs)) {
            Some(prev) => prev.multiples = true,
            None => result.push(e),
        }
    }
    result
}

/// Returns a method of interface `iface` that `t` does not implement, and
/// whether `t` has a method of that name with the wrong signature. With
/// `is_static` unset, interface-to-interface checks only compare methods
/// both sides have.
pub fn missing_method(
    t: TypeKey,
    iface: TypeKey,
    is_static: bool,
    objs: &TCObjects,
) -> Option<(ObjKey, bool)> {
    let idetail = objs.types[typ::underlying_type(iface, objs)].try_as_interface()?;
    idetail.complete(objs);
    let required = idetail.all_methods();
    let required = required.as_deref().unwrap_or(&[]);
    if required.is_empty() {
        return None;
    }

    if let Some(tdetail) = objs.types[typ::underlying_type(t, objs)].try_as_interface() {
        tdetail.complete(objs);
        let have = tdetail.all_methods();
        let have = have.as_deref().unwrap_or(&[]);
        for &m in required {
            let mobj = &objs.lobjs[m];
            match lookup_method(have, mobj.pkg(), mobj.name(), objs) {
                None if is_static => return Some((m, false)),
                None => {}
                Some((_, h)) => {
                    if !typ::identical_o(objs.lobjs[h].typ(), mobj.typ(), objs) {
                        return Some((m, true));
                    }
                }
            }
        }
        return None;
    }

    for &m in required {
        let mobj = &objs.lobjs[m];
        match lookup_field_or_method(t, false, mobj.pkg(), mobj.name(), objs) {
            LookupResult::Entry(f, _, _) if objs.lobjs[f].entity_type().is_func() => {
                if !typ::identical_o(objs.lobjs[f].typ(), mobj.typ(), objs) {
                    return Some((m, true));
                }
            }
            _ => return Some((m, false)),
        }
    }
    None
}

/// Checks the static part of a type assertion `x.(t)` where `x` has
/// interface type `iface`.
pub fn assertable_to(iface: TypeKey, t: TypeKey, objs: &TCObjects) -> Option<(ObjKey, bool)> {
    if typ::is_interface(t, objs) {
        return None;
    }
    missing_method(t, iface, false, objs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typ::BasicType;

    struct Fixture {
        objs: TCObjects,
        pkg: PackageKey,
        int: TypeKey,
    }

    impl Fixture {
        fn new() -> Fixture {
            let mut objs = TCObjects::new();
            let pkg = objs.new_package("main".to_string());
            let int = objs.universe().types()[&BasicType::Int];
            Fixture { objs, pkg, int }
        }

        fn named(&mut self, name: &str, underlying: TypeKey) -> TypeKey {
            let tname = self
                .objs
                .new_type_name(0, Some(self.pkg), name.to_string(), None);
            self.objs.new_t_named(Some(tname), Some(underlying), vec![])
        }

        fn field(&mut self, name: &str, t: TypeKey, embedded: bool) -> ObjKey {
            self.objs
                .new_field(0, Some(self.pkg), name.to_string(), Some(t), embedded)
        }

        fn method(&mut self, named: TypeKey, name: &str, ptr_recv: bool) -> ObjKey {
            let empty = self.objs.new_t_tuple(vec![]);
            let sig = self.objs.new_t_signature(None, None, empty, empty, false);
            let m = self
                .objs
                .new_func(0, Some(self.pkg), name.to_string(), Some(sig));
            self.objs.lobjs[m]
                .entity_type_mut()
                .func_set_has_ptr_recv(ptr_recv);
            if let Some(n) = self.objs.types[named].try_as_named_mut() {
                n.methods_mut().push(m);
            }
            m
        }
    }

    #[test]
    fn test_embedded_field_paths() {
        let mut fx = Fixture::new();
        let int = fx.int;
        let b_field = fx.field("b", int, false);
        let b_struct = fx.objs.new_t_struct(vec![b_field], None);
        let b = fx.named("B", b_struct);
        let pb = fx.objs.new_t_pointer(b);
        let emb = fx.field("B", pb, true);
        let a_struct = fx.objs.new_t_struct(vec![emb], None);
        let a = fx.named("A", a_struct);

        let got = lookup_field_or_method(a, false, Some(fx.pkg), "b", &fx.objs);
        assert_eq!(got, LookupResult::Entry(b_field, vec![0, 0], true));
        let got = lookup_field_or_method(a, false, Some(fx.pkg), "B", &fx.objs);
        assert_eq!(got, LookupResult::Entry(emb, vec![0], false));
        let got = lookup_field_or_method(a, false, Some(fx.pkg), "zz", &fx.objs);
        assert_eq!(got, LookupResult::NotFound);
    }

    #[test]
    fn test_same_depth_collision_is_ambiguous() {
        let mut fx = Fixture::new();
        let int = fx.int;
        let x1 = fx.field("x", int, false);
        let s1 = fx.objs.new_t_struct(vec![x1], None);
        let t1 = fx.named("T1", s1);
        let x2 = fx.field("x", int, false);
        let s2 = fx.objs.new_t_struct(vec![x2], None);
        let t2 = fx.named("T2", s2);
        let e1 = fx.field("T1", t1, true);
        let e2 = fx.field("T2", t2, true);
        let outer = fx.objs.new_t_struct(vec![e1, e2], None);

        let got = lookup_field_or_method(outer, false, Some(fx.pkg), "x", &fx.objs);
        assert_eq!(got, LookupResult::Ambiguous(vec![1, 0]));
    }

    #[test]
    fn test_pointer_receiver_needs_address() {
        let mut fx = Fixture::new();
        let empty = fx.objs.new_t_struct(vec![], None);
        let c = fx.named("C", empty);
        let h = fx.method(c, "h", true);
        let g = fx.method(c, "g", false);

        assert_eq!(
            lookup_field_or_method(c, false, Some(fx.pkg), "h", &fx.objs),
            LookupResult::BadMethodReceiver
        );
        assert_eq!(
            lookup_field_or_method(c, true, Some(fx.pkg), "h", &fx.objs),
            LookupResult::Entry(h, vec![0], true)
        );
        let pc = fx.objs.new_t_pointer(c);
        assert_eq!(
            lookup_field_or_method(pc, false, Some(fx.pkg), "g", &fx.objs),
            LookupResult::Entry(g, vec![1], true)
        );
    }

    #[test]
    fn test_missing_method() {
        let mut fx = Fixture::new();
        let empty = fx.objs.new_t_struct(vec![], None);
        let t = fx.named("T", empty);
        fx.method(t, "m", true);

        let no_params = fx.objs.new_t_tuple(vec![]);
        let sig = fx.objs.new_t_signature(None, None, no_params, no_params, false);
        let im = fx.objs.new_func(0, Some(fx.pkg), "m".to_string(), Some(sig));
        let iface = fx.objs.new_t_interface(vec![im], vec![]);

        assert_eq!(missing_method(t, iface, true, &fx.objs), Some((im, false)));
        let pt = fx.objs.new_t_pointer(t);
        assert_eq!(missing_method(pt, iface, true, &fx.objs), None);
    }
}
