//! The attribute store filled by the checker.

use std::collections::HashMap;
use std::fmt::{self, Write};

use typeattr_common::SymbolInterner;
use typeattr_syntax::ast::{Expr, NodeId};
use typeattr_syntax::display::expr_string;

use crate::obj::ConstValue;
use crate::objects::{ObjKey, ScopeKey, TCObjects, TypeKey};
use crate::operand::OperandMode;
use crate::selection::Selection;
use crate::typ::{self, BasicType};

/// Mode and type of an expression; constants carry their value in the mode.
#[derive(Debug, Clone)]
pub struct TypeAndValue {
    pub mode: OperandMode,
    pub typ: TypeKey,
}

impl TypeAndValue {
    pub fn value(&self) -> Option<&ConstValue> {
        self.mode.constant_val()
    }

    /// A call of a function without results.
    pub fn is_void(&self) -> bool {
        self.mode == OperandMode::NoValue
    }

    pub fn is_type(&self) -> bool {
        self.mode == OperandMode::TypeExpr
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.mode, OperandMode::Builtin(_))
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self.mode,
            OperandMode::Constant(_)
                | OperandMode::Variable
                | OperandMode::MapIndex
                | OperandMode::Value
                | OperandMode::CommaOk
        )
    }

    pub fn is_nil(&self, objs: &TCObjects) -> bool {
        self.mode == OperandMode::Value
            && typ::basic_kind(self.typ, objs) == Some(BasicType::UntypedNil)
    }

    pub fn addressable(&self) -> bool {
        self.mode == OperandMode::Variable
    }

    pub fn assignable(&self) -> bool {
        matches!(self.mode, OperandMode::Variable | OperandMode::MapIndex)
    }

    /// Whether the expression may be used in a comma-ok assignment.
    pub fn has_ok(&self) -> bool {
        matches!(self.mode, OperandMode::CommaOk | OperandMode::MapIndex)
    }
}

/// One package-level initialization: `lhs = rhs`.
#[derive(Debug, Clone)]
pub struct Initializer {
    pub lhs: Vec<ObjKey>,
    pub rhs: Expr,
}

impl Initializer {
    /// Writes `a, b = f()`.
    pub fn fmt(&self, f: &mut impl Write, objs: &TCObjects, interner: &SymbolInterner) -> fmt::Result {
        for (i, &v) in self.lhs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(objs.lobjs[v].name())?;
        }
        write!(f, " = {}", expr_string(&self.rhs, interner))
    }

    pub fn display(&self, objs: &TCObjects, interner: &SymbolInterner) -> String {
        let mut s = String::new();
        let _ = self.fmt(&mut s, objs, interner);
        s
    }
}

/// Attributes of a checked package, keyed by syntax node.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Expressions to their mode, type and constant value.
    pub types: HashMap<NodeId, TypeAndValue>,
    /// Type expressions to the types they denote.
    pub type_exprs: HashMap<NodeId, TypeKey>,
    /// Declaring identifiers to their objects. Package clause names map
    /// to `None`.
    pub defs: HashMap<NodeId, Option<ObjKey>>,
    /// Identifiers to the objects they refer to.
    pub uses: HashMap<NodeId, ObjKey>,
    /// Objects declared without an identifier: import package names and
    /// type switch bindings, keyed by the import or case clause.
    pub implicits: HashMap<NodeId, ObjKey>,
    /// Selector expressions other than qualified identifiers.
    pub selections: HashMap<NodeId, Selection>,
    /// Nodes that open a scope: files, function types, statements, blocks
    /// and clauses.
    pub scopes: HashMap<NodeId, ScopeKey>,
    /// Expressions and statements to the scope they were checked in.
    pub enclosing: HashMap<NodeId, ScopeKey>,
    /// Package-level variable initializers in execution order.
    pub init_order: Vec<Initializer>,
}

impl TypeInfo {
    pub(crate) fn new() -> TypeInfo {
        TypeInfo::default()
    }

    pub fn type_and_value(&self, id: NodeId) -> Option<&TypeAndValue> {
        self.types.get(&id)
    }

    /// The type of an expression or type expression.
    pub fn type_of(&self, id: NodeId) -> Option<TypeKey> {
        self.types
            .get(&id)
            .map(|tv| tv.typ)
            .or_else(|| self.type_exprs.get(&id).copied())
    }

    /// The object an identifier defines or refers to.
    pub fn object_of(&self, id: NodeId) -> Option<ObjKey> {
        match self.defs.get(&id) {
            Some(def) => *def,
            None => self.uses.get(&id).copied(),
        }
    }

    pub fn selection(&self, id: NodeId) -> Option<&Selection> {
        self.selections.get(&id)
    }

    /// The scope a node opens, or else the innermost scope it was
    /// checked in.
    pub fn innermost_scope(&self, id: NodeId) -> Option<ScopeKey> {
        self.scopes
            .get(&id)
            .or_else(|| self.enclosing.get(&id))
            .copied()
    }

    pub fn init_order(&self) -> &[Initializer] {
        &self.init_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeattr_syntax::AstBuilder;

    #[test]
    fn test_initializer_display() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("p".to_string());
        let a = objs.new_var(0, Some(p), "a".to_string(), None);
        let b = objs.new_var(0, Some(p), "b".to_string(), None);
        let builder = AstBuilder::new();
        let rhs = builder.call(builder.name("f"), vec![]);
        let interner = builder.finish();
        let init = Initializer { lhs: vec![a, b], rhs };
        assert_eq!(init.display(&objs, &interner), "a, b = f()");
    }

    #[test]
    fn test_scope_queries_prefer_opened_scopes() {
        let mut objs = TCObjects::new();
        let p = objs.new_package("p".to_string());
        let pscope = *objs.pkgs[p].scope();
        let inner = objs.new_scope(Some(pscope), crate::scope::ScopeKind::Block, 0, 0);
        let mut info = TypeInfo::new();
        info.scopes.insert(NodeId(3), inner);
        info.enclosing.insert(NodeId(3), pscope);
        info.enclosing.insert(NodeId(4), inner);
        assert_eq!(info.innermost_scope(NodeId(3)), Some(inner));
        assert_eq!(info.innermost_scope(NodeId(4)), Some(inner));
        assert_eq!(info.innermost_scope(NodeId(5)), None);
    }
}
