//! Explicit conversions `T(x)`.

use typeattr_syntax::ast::Expr;

use crate::errors::TypeError;
use crate::obj::ConstValue;
use crate::objects::TypeKey;
use crate::operand::{Operand, OperandMode};
use crate::typ::{self, BasicType};

use super::checker::Checker;

impl<'a> Checker<'a> {
    /// Converts `x` to `t`. `arg` is the converted expression.
    pub(crate) fn conversion(&mut self, x: &mut Operand, t: TypeKey, arg: &Expr) {
        let const_arg = x.mode.is_constant();
        let const_target = typ::is_const_type(t, self.tc_objs);

        let ok = if const_arg && const_target {
            self.constant_conversion(x, t)
        } else if self.convertible_to(x, t) {
            x.mode = OperandMode::Value;
            true
        } else {
            false
        };

        if !ok {
            // a constant that merely does not fit gets its own code
            let numeric = x.typ.map_or(false, |xt| typ::is_numeric(xt, self.tc_objs));
            let code = if const_arg && const_target && numeric && typ::is_numeric(t, self.tc_objs) {
                TypeError::ConversionRange
            } else {
                TypeError::InvalidConversion
            };
            let msg = format!("cannot convert {} to {}", self.op_str(x, arg), self.type_str(t));
            self.error(code, x.span, msg);
            x.mode = OperandMode::Invalid;
            return;
        }

        // the conversion fixes the type of an untyped argument
        let xt = x.typ.unwrap_or(t);
        if typ::is_untyped(xt, self.tc_objs) {
            let final_type = if typ::is_interface(t, self.tc_objs) || (const_arg && !const_target) {
                typ::untyped_default_type(xt, self.tc_objs)
            } else if typ::is_integer(xt, self.tc_objs) && typ::is_string(t, self.tc_objs) {
                xt
            } else {
                t
            };
            self.update_expr_type(x.expr.unwrap_or(arg.id), final_type, true);
        }
        x.typ = Some(t);
    }

    /// Folds a constant conversion to the basic type under `t`.
    fn constant_conversion(&mut self, x: &mut Operand, t: TypeKey) -> bool {
        let Some(kind) = typ::basic_kind(t, self.tc_objs) else {
            return false;
        };
        let OperandMode::Constant(val) = &x.mode else {
            return false;
        };
        let mut rounded = val.clone();
        if val.representable(kind, self.config.word_size, Some(&mut rounded)) {
            x.mode = OperandMode::Constant(rounded);
            return true;
        }
        let xt = x.typ.unwrap_or(t);
        if typ::is_integer(xt, self.tc_objs) && typ::is_string(t, self.tc_objs) {
            // out-of-range code points become the replacement character
            let c = val
                .to_i64()
                .and_then(|i| u32::try_from(i).ok())
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            x.mode = OperandMode::Constant(ConstValue::Str(c.to_string()));
            return true;
        }
        false
    }

    /// Non-constant convertibility of `x` to `t`.
    fn convertible_to(&mut self, x: &Operand, t: TypeKey) -> bool {
        if self.assignable(x, t, None) {
            return true;
        }
        let Some(v) = x.typ else { return false };
        let objs = &*self.tc_objs;
        let vu = typ::underlying_type(v, objs);
        let tu = typ::underlying_type(t, objs);
        if typ::identical(vu, tu, objs) {
            return true;
        }
        // unnamed pointers to types with identical underlying types
        if let (Some(vp), Some(tp)) = (objs.types[v].try_as_pointer(), objs.types[t].try_as_pointer()) {
            let vb = typ::underlying_type(vp.base(), objs);
            let tb = typ::underlying_type(tp.base(), objs);
            if typ::identical(vb, tb, objs) {
                return true;
            }
        }
        let int_or_float = |k: TypeKey| typ::is_integer(k, objs) || typ::is_float(k, objs);
        if int_or_float(v) && int_or_float(t) {
            return true;
        }
        if typ::is_complex(v, objs) && typ::is_complex(t, objs) {
            return true;
        }
        if (typ::is_integer(v, objs) || self.is_bytes_or_runes(vu)) && typ::is_string(t, objs) {
            return true;
        }
        typ::is_string(v, objs) && self.is_bytes_or_runes(tu)
    }

    fn is_bytes_or_runes(&self, t: TypeKey) -> bool {
        let objs = &*self.tc_objs;
        let Some(s) = objs.types[t].try_as_slice() else {
            return false;
        };
        matches!(
            typ::basic_kind(typ::underlying_type(s.elem(), objs), objs).map(|k| k.real_type()),
            Some(BasicType::Uint8 | BasicType::Int32)
        )
    }
}

