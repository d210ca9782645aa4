//! Lexical scopes.
//!
//! Scopes form a tree through parent keys. Each scope maps names to
//! objects and remembers the order names were declared in.

use std::fmt::{self, Write};

use indexmap::IndexMap;

use crate::obj::Pos;
use crate::objects::{ObjKey, ScopeKey, TCObjects};

/// The construct that opened a scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Universe,
    Package,
    File,
    Func,
    Block,
    If,
    Switch,
    TypeSwitch,
    Case,
    Comm,
    For,
    Range,
}

impl ScopeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScopeKind::Universe => "universe",
            ScopeKind::Package => "package",
            ScopeKind::File => "file",
            ScopeKind::Func => "func",
            ScopeKind::Block => "block",
            ScopeKind::If => "if",
            ScopeKind::Switch => "switch",
            ScopeKind::TypeSwitch => "type switch",
            ScopeKind::Case => "case",
            ScopeKind::Comm => "comm",
            ScopeKind::For => "for",
            ScopeKind::Range => "range",
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeKey>,
    children: Vec<ScopeKey>,
    elems: IndexMap<String, ObjKey>,
    kind: ScopeKind,
    pos: Pos,
    end: Pos,
}

impl Scope {
    pub(crate) fn new(parent: Option<ScopeKey>, kind: ScopeKind, pos: Pos, end: Pos) -> Scope {
        Scope {
            parent,
            children: Vec::new(),
            elems: IndexMap::new(),
            kind,
            pos,
            end,
        }
    }

    pub fn parent(&self) -> Option<ScopeKey> {
        self.parent
    }

    pub fn children(&self) -> &Vec<ScopeKey> {
        &self.children
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn end(&self) -> Pos {
        self.end
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn elems(&self) -> &IndexMap<String, ObjKey> {
        &self.elems
    }

    /// Declared names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.elems.keys().map(String::as_str).collect()
    }

    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names = self.names();
        names.sort_unstable();
        names
    }

    /// Looks `name` up in this scope only.
    pub fn lookup(&self, name: &str) -> Option<ObjKey> {
        self.elems.get(name).copied()
    }

    /// Reports whether `pos` lies within the scope's extent.
    pub fn contains(&self, pos: Pos) -> bool {
        self.pos <= pos && pos < self.end
    }

    pub(crate) fn add_child(&mut self, child: ScopeKey) {
        self.children.push(child);
    }

    /// Inserts `okey` into scope `skey` unless its name is taken, in which
    /// case the existing object is returned. The object's parent scope is
    /// set if it had none.
    pub fn insert(skey: ScopeKey, okey: ObjKey, objs: &mut TCObjects) -> Option<ObjKey> {
        let name = objs.lobjs[okey].name().to_string();
        if let Some(alt) = objs.scopes[skey].lookup(&name) {
            return Some(alt);
        }
        objs.scopes[skey].elems.insert(name, okey);
        if objs.lobjs[okey].parent().is_none() {
            objs.lobjs[okey].set_parent(Some(skey));
        }
        None
    }
}

/// Follows the parent chain from `start` and returns the first scope
/// declaring `name` with the object found there.
pub fn lookup_parent(start: ScopeKey, name: &str, objs: &TCObjects) -> Option<(ScopeKey, ObjKey)> {
    let mut cur = Some(start);
    while let Some(skey) = cur {
        let scope = &objs.scopes[skey];
        if let Some(okey) = scope.lookup(name) {
            return Some((skey, okey));
        }
        cur = scope.parent();
    }
    None
}

/// Writes `skey` and, if `recurse`, its children, one name per line.
pub fn fmt_scope(
    skey: ScopeKey,
    f: &mut impl Write,
    objs: &TCObjects,
    indent: usize,
    recurse: bool,
) -> fmt::Result {
    const IND: &str = ".  ";
    let scope = &objs.scopes[skey];
    let prefix = IND.repeat(indent);
    writeln!(f, "{}{} scope {:?} {{", prefix, scope.kind().name(), skey)?;
    for (name, okey) in scope.elems() {
        write!(f, "{}{}{}: ", prefix, IND, name)?;
        crate::obj::fmt_obj(*okey, f, objs)?;
        f.write_char('\n')?;
    }
    if recurse {
        for &child in scope.children() {
            fmt_scope(child, f, objs, indent + 1, recurse)?;
        }
    }
    writeln!(f, "{}}}", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_declaration_order() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("p".to_string());
        let s = objs.new_scope(Some(*objs.pkgs[p].scope()), ScopeKind::Func, 0, 10);
        for name in ["y", "x", "z"] {
            let v = objs.new_var(0, Some(p), name.to_string(), None);
            assert_eq!(Scope::insert(s, v, &mut objs), None);
        }
        assert_eq!(objs.scopes[s].names(), vec!["y", "x", "z"]);
        assert_eq!(objs.scopes[s].sorted_names(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_insert_reports_existing_object() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("p".to_string());
        let s = *objs.pkgs[p].scope();
        let a = objs.new_var(0, Some(p), "a".to_string(), None);
        let b = objs.new_var(0, Some(p), "a".to_string(), None);
        assert_eq!(Scope::insert(s, a, &mut objs), None);
        assert_eq!(Scope::insert(s, b, &mut objs), Some(a));
        assert_eq!(objs.lobjs[a].parent(), Some(s));
        assert_eq!(objs.lobjs[b].parent(), None);
    }

    #[test]
    fn test_lookup_parent_walks_to_universe() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("p".to_string());
        let pscope = *objs.pkgs[p].scope();
        let inner = objs.new_scope(Some(pscope), ScopeKind::Block, 5, 9);
        let (found_in, okey) = lookup_parent(inner, "len", &objs).unwrap();
        assert_eq!(found_in, objs.universe().scope());
        assert_eq!(objs.lobjs[okey].name(), "len");
        assert!(lookup_parent(inner, "nope", &objs).is_none());
        assert!(objs.scopes[inner].contains(5));
        assert!(!objs.scopes[inner].contains(9));
    }
}
