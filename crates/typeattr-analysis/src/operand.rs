//! Operands: the intermediate result of checking one expression.

use std::fmt::{self, Write};

use typeattr_common::Span;
use typeattr_syntax::ast::NodeId;

use crate::constant;
use crate::lookup;
use crate::obj::{Builtin, ConstValue};
use crate::objects::{TCObjects, TypeKey};
use crate::typ::{self, BasicType, ChanDir, Type};

/// How an operand may be used.
#[derive(Clone, Debug, PartialEq)]
pub enum OperandMode {
    /// The check failed; an error was reported.
    Invalid,
    /// A call of a function without results.
    NoValue,
    /// A built-in function, which must be called.
    Builtin(Builtin),
    /// A type.
    TypeExpr,
    /// A constant; the type is basic.
    Constant(ConstValue),
    /// An addressable variable.
    Variable,
    /// A map index expression, usable in a comma-ok assignment.
    MapIndex,
    /// A computed value.
    Value,
    /// A receive or type assertion, usable in a comma-ok assignment.
    CommaOk,
}

impl OperandMode {
    pub fn constant_val(&self) -> Option<&ConstValue> {
        match self {
            OperandMode::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, OperandMode::Constant(_))
    }
}

impl fmt::Display for OperandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperandMode::Invalid => "invalid operand",
            OperandMode::NoValue => "no value",
            OperandMode::Builtin(_) => "built-in",
            OperandMode::TypeExpr => "type",
            OperandMode::Constant(_) => "constant",
            OperandMode::Variable => "variable",
            OperandMode::MapIndex => "map index expression",
            OperandMode::Value => "value",
            OperandMode::CommaOk => "comma, ok expression",
        })
    }
}

/// The mode and type of a checked expression, with the node that produced it.
#[derive(Clone, Debug)]
pub struct Operand {
    pub mode: OperandMode,
    pub expr: Option<NodeId>,
    pub span: Span,
    pub typ: Option<TypeKey>,
}

impl Default for Operand {
    fn default() -> Self {
        Self::new()
    }
}

impl Operand {
    pub fn new() -> Operand {
        Operand {
            mode: OperandMode::Invalid,
            expr: None,
            span: Span::dummy(),
            typ: None,
        }
    }

    pub fn with_type(mode: OperandMode, typ: TypeKey, span: Span) -> Operand {
        Operand {
            mode,
            expr: None,
            span,
            typ: Some(typ),
        }
    }

    pub fn invalid(&self) -> bool {
        self.mode == OperandMode::Invalid
    }

    pub fn is_nil(&self, objs: &TCObjects) -> bool {
        self.mode == OperandMode::Value
            && self.typ.and_then(|t| typ::basic_kind(t, objs)) == Some(BasicType::UntypedNil)
    }

    /// Writes the operand the way diagnostics describe it, e.g.
    /// `constant 300 of type untyped int` or `x (variable of type int)`.
    pub fn fmt(&self, f: &mut impl Write, expr: Option<&str>, objs: &TCObjects) -> fmt::Result {
        let mut wrapped = false;
        match expr {
            Some(s) => {
                f.write_str(s)?;
                f.write_str(" (")?;
                wrapped = true;
            }
            None => match &self.mode {
                OperandMode::Builtin(b) => {
                    f.write_str(b.name())?;
                    f.write_str(" (")?;
                    wrapped = true;
                }
                OperandMode::TypeExpr => {
                    typ::fmt_type(self.typ, f, objs)?;
                    f.write_str(" (")?;
                    wrapped = true;
                }
                _ => {}
            },
        }

        let mut has_type = false;
        if !matches!(
            self.mode,
            OperandMode::Invalid | OperandMode::NoValue | OperandMode::Builtin(_) | OperandMode::TypeExpr
        ) {
            if let Some(t) = self.typ {
                match objs.types[t].try_as_basic() {
                    Some(b) if b.typ().is_untyped() => {
                        f.write_str(b.name())?;
                        f.write_char(' ')?;
                    }
                    _ => has_type = true,
                }
            }
        }

        write!(f, "{}", self.mode)?;
        if let OperandMode::Constant(val) = &self.mode {
            f.write_char(' ')?;
            constant::fmt_value(val, f)?;
        }
        if has_type {
            f.write_str(" of type ")?;
            typ::fmt_type(self.typ, f, objs)?;
        }
        if wrapped {
            f.write_char(')')?;
        }
        Ok(())
    }

    pub fn display(&self, expr: Option<&str>, objs: &TCObjects) -> String {
        let mut s = String::new();
        let _ = self.fmt(&mut s, expr, objs);
        s
    }

    /// Reports whether the operand can be assigned to a variable of type `t`.
    /// On failure involving an interface, `reason` names the missing method.
    pub fn assignable_to(
        &self,
        t: TypeKey,
        reason: Option<&mut String>,
        objs: &TCObjects,
        word_size: u8,
    ) -> bool {
        let invalid = objs.universe().invalid_type();
        if self.invalid() || t == invalid {
            return true;
        }
        let Some(v) = self.typ else {
            return false;
        };
        if typ::identical(v, t, objs) {
            return true;
        }

        let (vu, tu) = (typ::underlying_type(v, objs), typ::underlying_type(t, objs));
        let (v_named, t_named) = (objs.types[v].is_named(), objs.types[t].is_named());

        if typ::is_untyped(vu, objs) {
            match &objs.types[tu] {
                Type::Basic(detail) => {
                    if self.is_nil(objs) {
                        return false;
                    }
                    if let OperandMode::Constant(val) = &self.mode {
                        return val.representable(detail.typ(), word_size, None);
                    }
                    // non-constant untyped bool from a comparison
                    if detail.typ() == BasicType::Bool {
                        return typ::basic_kind(vu, objs) == Some(BasicType::UntypedBool);
                    }
                }
                Type::Interface(detail) => return self.is_nil(objs) || detail.is_empty(objs),
                Type::Pointer(_) | Type::Signature(_) | Type::Slice(_) | Type::Map(_) | Type::Chan(_) => {
                    return self.is_nil(objs)
                }
                _ => {}
            }
        }

        // identical underlying types and at least one side unnamed
        if typ::identical(vu, tu, objs) && (!v_named || !t_named) {
            return true;
        }

        if objs.types[tu].try_as_interface().is_some() {
            return match lookup::missing_method(v, tu, true, objs) {
                Some((m, wrong_type)) => {
                    if let Some(r) = reason {
                        let what = if wrong_type { "wrong type for method" } else { "missing method" };
                        *r = format!("{} {}", what, objs.lobjs[m].name());
                    }
                    false
                }
                None => true,
            };
        }

        // a bidirectional channel converts to a directional one
        if let (Some(vc), Some(tc)) = (objs.types[vu].try_as_chan(), objs.types[tu].try_as_chan()) {
            if vc.dir() == ChanDir::SendRecv && typ::identical(vc.elem(), tc.elem(), objs) {
                return !v_named || !t_named;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(objs: &TCObjects, b: BasicType) -> TypeKey {
        objs.universe().types()[&b]
    }

    #[test]
    fn test_constant_assignability_depends_on_value() {
        let objs = TCObjects::new();
        let int8 = basic(&objs, BasicType::Int8);
        let uint = basic(&objs, BasicType::UntypedInt);
        let small = Operand::with_type(OperandMode::Constant(ConstValue::with_i64(100)), uint, Span::dummy());
        let big = Operand::with_type(OperandMode::Constant(ConstValue::with_i64(300)), uint, Span::dummy());
        assert!(small.assignable_to(int8, None, &objs, 8));
        assert!(!big.assignable_to(int8, None, &objs, 8));
    }

    #[test]
    fn test_nil_assignability() {
        let mut objs = TCObjects::new();
        let int = basic(&objs, BasicType::Int);
        let nil = Operand::with_type(OperandMode::Value, basic(&objs, BasicType::UntypedNil), Span::dummy());
        let ptr = objs.new_t_pointer(int);
        let slice = objs.new_t_slice(int);
        assert!(nil.is_nil(&objs));
        assert!(nil.assignable_to(ptr, None, &objs, 8));
        assert!(nil.assignable_to(slice, None, &objs, 8));
        assert!(!nil.assignable_to(int, None, &objs, 8));
    }

    #[test]
    fn test_named_and_unnamed_with_same_underlying() {
        let mut objs = TCObjects::new();
        let int = basic(&objs, BasicType::Int);
        let p = objs.new_package("p".to_string());
        let slice = objs.new_t_slice(int);
        let tname = objs.new_type_name(0, Some(p), "S".to_string(), None);
        let named = objs.new_t_named(Some(tname), Some(slice), vec![]);
        let other = objs.new_t_slice(int);
        let x = Operand::with_type(OperandMode::Variable, other, Span::dummy());
        assert!(x.assignable_to(named, None, &objs, 8));

        let tname2 = objs.new_type_name(0, Some(p), "T".to_string(), None);
        let named2 = objs.new_t_named(Some(tname2), Some(slice), vec![]);
        let y = Operand::with_type(OperandMode::Variable, named2, Span::dummy());
        assert!(!y.assignable_to(named, None, &objs, 8));
    }

    #[test]
    fn test_operand_display() {
        let objs = TCObjects::new();
        let uint = basic(&objs, BasicType::UntypedInt);
        let int = basic(&objs, BasicType::Int);
        let c = Operand::with_type(OperandMode::Constant(ConstValue::with_i64(300)), uint, Span::dummy());
        assert_eq!(c.display(None, &objs), "untyped int constant 300");
        let v = Operand::with_type(OperandMode::Variable, int, Span::dummy());
        assert_eq!(v.display(Some("x"), &objs), "x (variable of type int)");
    }
}
