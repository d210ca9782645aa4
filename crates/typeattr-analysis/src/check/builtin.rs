//! Built-in function checking.
//!
//! A built-in call is checked against the rules of the individual built-in
//! rather than a signature. For calls that do not fold to a constant, the
//! signature the call was checked with is recorded for the built-in's
//! identifier (and the parentheses around it).

use typeattr_syntax::ast::{CallExpr, Expr, ExprKind};

use crate::errors::TypeError;
use crate::obj::{Builtin, ConstValue};
use crate::objects::{ObjKey, TCObjects, TypeKey};
use crate::operand::{Operand, OperandMode};
use crate::typ::{self, BasicType, ChanDir, Type};

use super::call::Unpacked;
use super::checker::Checker;

impl<'a> Checker<'a> {
    /// Checks a call of the built-in `id`. Returns false if the call is
    /// invalid, with the error reported.
    pub(crate) fn builtin(&mut self, x: &mut Operand, call: &CallExpr, id: Builtin) -> bool {
        let name = id.name();

        // only append takes a spread final argument
        if call.spread && id != Builtin::Append {
            let msg = format!("invalid operation: invalid use of ... with built-in {}", name);
            self.error(TypeError::InvalidBuiltinCall, call.func.span, msg);
            self.use_exprs(call.args.iter());
            return false;
        }

        // len and cap fold to constants only for argument expressions
        // without calls or receives
        let saved_call_or_recv = self.octx.has_call_or_recv;
        self.octx.has_call_or_recv = false;
        let ok = self.builtin_call(x, call, id);
        let arg_has_call_or_recv = self.octx.has_call_or_recv;
        self.octx.has_call_or_recv = saved_call_or_recv || arg_has_call_or_recv;
        ok
    }

    fn builtin_call(&mut self, x: &mut Operand, call: &CallExpr, id: Builtin) -> bool {
        let name = id.name();
        let (min_args, variadic) = id.arity();

        // make and new take a type first, which is checked separately
        let (args, nargs) = match id {
            Builtin::Make | Builtin::New => (None, call.args.len()),
            _ => {
                let Some(args) = self.unpack(&call.args, false) else {
                    return false;
                };
                let n = args.len();
                if n > 0 {
                    args.get(self, x, 0);
                    if x.invalid() {
                        return false;
                    }
                }
                (Some(args), n)
            }
        };

        let problem = if nargs < min_args {
            Some("not enough")
        } else if !variadic && nargs > min_args {
            Some("too many")
        } else {
            None
        };
        if let Some(problem) = problem {
            let msg = format!(
                "{} arguments for {}(...) (expected {}, found {})",
                problem, name, min_args, nargs
            );
            let span = call.args.last().map_or(call.func.span, |a| a.span);
            self.error(TypeError::WrongArgCount, span, msg);
            // the first argument has been checked already
            if let Some(Unpacked::Exprs(es)) = &args {
                if nargs > 1 {
                    self.use_exprs(es[1..].iter());
                }
            }
            return false;
        }

        let invalid = self.invalid_type();
        match (id, args) {
            (Builtin::Append, Some(args)) => self.builtin_append(x, call, &args),
            (Builtin::Cap | Builtin::Len, _) => self.builtin_len_cap(x, call, id),
            (Builtin::Close, _) => {
                let xt = x.typ.unwrap_or(invalid);
                let ut = typ::underlying_type(xt, self.tc_objs);
                let dir = self.tc_objs.types[ut].try_as_chan().map(|c| c.dir());
                match dir {
                    None => {
                        let msg = format!("invalid argument: {} is not a channel", self.op_desc(x, call.args.first()));
                        self.error(TypeError::InvalidBuiltinCall, x.span, msg);
                        false
                    }
                    Some(ChanDir::RecvOnly) => {
                        let msg = format!(
                            "invalid argument: {} must not be a receive-only channel",
                            self.op_desc(x, call.args.first())
                        );
                        self.error(TypeError::InvalidBuiltinCall, x.span, msg);
                        false
                    }
                    Some(_) => {
                        x.mode = OperandMode::NoValue;
                        self.record_builtin_type(&call.func, id, None, &[ut], false);
                        true
                    }
                }
            }
            (Builtin::Complex, Some(args)) => self.builtin_complex(x, call, &args),
            (Builtin::Copy, Some(args)) => self.builtin_copy(x, call, &args),
            (Builtin::Delete, Some(args)) => {
                let mt = x.typ.unwrap_or(invalid);
                let ut = typ::underlying_type(mt, self.tc_objs);
                let Some(key) = self.tc_objs.types[ut].try_as_map().map(|m| m.key()) else {
                    let msg = format!("invalid argument: {} is not a map", self.op_desc(x, call.args.first()));
                    self.error(TypeError::InvalidBuiltinCall, x.span, msg);
                    return false;
                };
                args.get(self, x, 1);
                if x.invalid() {
                    return false;
                }
                if !self.assignable(x, key, None) {
                    let msg = format!(
                        "invalid argument: {} is not assignable to {}",
                        self.op_desc(x, call.args.get(1)),
                        self.type_str(key)
                    );
                    self.error(TypeError::InvalidBuiltinCall, x.span, msg);
                    return false;
                }
                x.mode = OperandMode::NoValue;
                self.record_builtin_type(&call.func, id, None, &[mt, key], false);
                true
            }
            (Builtin::Imag | Builtin::Real, _) => self.builtin_real_imag(x, call, id),
            (Builtin::Make, _) => self.builtin_make(x, call),
            (Builtin::New, _) => {
                let Some(t) = self.type_argument(&call.args[0]) else {
                    return false;
                };
                x.mode = OperandMode::Value;
                let ptr = self.tc_objs.new_t_pointer(t);
                x.typ = Some(ptr);
                self.record_builtin_type(&call.func, id, Some(ptr), &[t], false);
                true
            }
            (Builtin::Panic, _) => {
                let iface = self.tc_objs.new_t_empty_interface();
                self.assignment(x, Some(iface), call.args.first(), "argument to panic");
                if x.invalid() {
                    return false;
                }
                x.mode = OperandMode::NoValue;
                self.record_builtin_type(&call.func, id, None, &[iface], false);
                true
            }
            (Builtin::Print | Builtin::Println, Some(args)) => {
                let context = format!("argument to {}", name);
                let mut params = Vec::with_capacity(nargs);
                for i in 0..nargs {
                    // the first argument has been checked already
                    if i > 0 {
                        args.get(self, x, i);
                    }
                    let arg = match &args {
                        Unpacked::Exprs(es) => es.get(i),
                        _ => None,
                    };
                    self.assignment(x, None, arg, &context);
                    if x.invalid() {
                        return false;
                    }
                    params.push(x.typ.unwrap_or(invalid));
                }
                x.mode = OperandMode::NoValue;
                self.record_builtin_type(&call.func, id, None, &params, false);
                true
            }
            (Builtin::Recover, _) => {
                x.mode = OperandMode::Value;
                let iface = self.tc_objs.new_t_empty_interface();
                x.typ = Some(iface);
                self.record_builtin_type(&call.func, id, Some(iface), &[], false);
                true
            }
            _ => false,
        }
    }

    /// append(s S, x ...T) S
    fn builtin_append(&mut self, x: &mut Operand, call: &CallExpr, args: &Unpacked<'_>) -> bool {
        let invalid = self.invalid_type();
        let s = x.typ.unwrap_or(invalid);
        let us = typ::underlying_type(s, self.tc_objs);
        let Some(elem) = self.tc_objs.types[us].try_as_slice().map(|d| d.elem()) else {
            let msg = format!("invalid argument: {} is not a slice", self.op_desc(x, call.args.first()));
            self.error(TypeError::InvalidBuiltinCall, x.span, msg);
            return false;
        };
        let nargs = args.len();

        // append([]byte, string...) appends the bytes of the string
        let mut second: Option<Operand> = None;
        let bytes = self.tc_objs.universe().slice_of_bytes();
        if nargs == 2 && call.spread && self.assignable(x, bytes, None) {
            let mut y = Operand::new();
            args.get(self, &mut y, 1);
            if y.invalid() {
                return false;
            }
            if y.typ.map_or(false, |t| typ::is_string(t, self.tc_objs)) {
                let yt = y.typ.unwrap_or(invalid);
                self.record_builtin_type(&call.func, Builtin::Append, Some(s), &[s, yt], true);
                x.mode = OperandMode::Value;
                x.typ = Some(s);
                return true;
            }
            second = Some(y);
        }

        // the general case passes the rest to a variadic []T parameter
        let tail = self.tc_objs.new_t_slice(elem);
        let sig = make_sig(self.tc_objs, Some(s), &[s, tail], true);
        let context = format!("argument to {}", self.expr_str(&call.func));
        for i in 1..nargs {
            let mut y = Operand::new();
            match (&second, i) {
                (Some(evaluated), 1) => y = evaluated.clone(),
                _ => args.get(self, &mut y, i),
            }
            if y.invalid() {
                continue;
            }
            let arg = match args {
                Unpacked::Exprs(es) => es.get(i),
                _ => None,
            };
            self.argument(sig, i, &mut y, arg, call.spread && i + 1 == nargs, &context);
        }

        x.mode = OperandMode::Value;
        x.typ = Some(s);
        self.record_builtin_sig(&call.func, Builtin::Append, sig);
        true
    }

    /// len(x) int, cap(x) int
    fn builtin_len_cap(&mut self, x: &mut Operand, call: &CallExpr, id: Builtin) -> bool {
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        let t = implicit_array_deref(typ::underlying_type(xt, self.tc_objs), self.tc_objs);

        let mode = match &self.tc_objs.types[t] {
            Type::Basic(_) if typ::is_string(t, self.tc_objs) && id == Builtin::Len => match &x.mode {
                OperandMode::Constant(v) => {
                    let n = v.str_as_str().map_or(0, str::len);
                    OperandMode::Constant(ConstValue::with_i64(n as i64))
                }
                _ => OperandMode::Value,
            },
            // arrays have a constant length unless evaluating them has effects
            Type::Array(a) if !self.octx.has_call_or_recv => OperandMode::Constant(
                a.len()
                    .map_or(ConstValue::Unknown, |n| ConstValue::with_u64(n)),
            ),
            Type::Array(_) | Type::Slice(_) | Type::Chan(_) => OperandMode::Value,
            Type::Map(_) if id == Builtin::Len => OperandMode::Value,
            _ => OperandMode::Invalid,
        };

        if mode == OperandMode::Invalid {
            if !typ::is_invalid(t, self.tc_objs) {
                let msg = format!(
                    "invalid argument: {} for {}",
                    self.op_desc(x, call.args.first()),
                    id.name()
                );
                self.error(TypeError::InvalidBuiltinCall, x.span, msg);
            }
            return false;
        }

        let int = self.basic_type(BasicType::Int);
        if !mode.is_constant() {
            self.record_builtin_type(&call.func, id, Some(int), &[t], false);
        }
        x.mode = mode;
        x.typ = Some(int);
        true
    }

    /// complex(x, y floatT) complexT
    fn builtin_complex(&mut self, x: &mut Operand, call: &CallExpr, args: &Unpacked<'_>) -> bool {
        let mut y = Operand::new();
        args.get(self, &mut y, 1);
        if y.invalid() {
            return false;
        }
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        let yt = y.typ.unwrap_or(invalid);

        match (typ::is_untyped(xt, self.tc_objs), typ::is_untyped(yt, self.tc_objs)) {
            (false, false) => {}
            (true, false) => self.convert_untyped(x, yt),
            (false, true) => self.convert_untyped(&mut y, xt),
            (true, true) => {
                if x.mode.is_constant() && y.mode.is_constant() {
                    // untyped numeric constants without imaginary part are floats
                    let float = self.basic_type(BasicType::UntypedFloat);
                    for op in [&mut *x, &mut y] {
                        let real = op.mode.constant_val().map_or(false, |v| v.to_rat().is_some());
                        if real && op.typ.map_or(false, |t| typ::is_numeric(t, self.tc_objs)) {
                            op.typ = Some(float);
                        }
                    }
                } else {
                    // untyped non-constants stem from shifts, which fail here
                    let f64t = self.basic_type(BasicType::Float64);
                    self.convert_untyped(x, f64t);
                    self.convert_untyped(&mut y, f64t);
                }
            }
        }
        if x.invalid() || y.invalid() {
            return false;
        }

        let xt = x.typ.unwrap_or(invalid);
        let yt = y.typ.unwrap_or(invalid);
        if !typ::identical(xt, yt, self.tc_objs) {
            let msg = format!(
                "invalid argument: mismatched types {} and {}",
                self.type_str(xt),
                self.type_str(yt)
            );
            self.error(TypeError::InvalidBuiltinCall, x.span, msg);
            return false;
        }
        if !typ::is_float(xt, self.tc_objs) {
            let msg = format!(
                "invalid argument: arguments have type {}, expected floating-point",
                self.type_str(xt)
            );
            self.error(TypeError::InvalidBuiltinCall, x.span, msg);
            return false;
        }

        let folded = match (&x.mode, &y.mode) {
            (OperandMode::Constant(re), OperandMode::Constant(im)) => match (re.to_rat(), im.to_rat()) {
                (Some(re), Some(im)) => Some(ConstValue::Complex(re, im)),
                _ => Some(ConstValue::Unknown),
            },
            _ => None,
        };
        let res = match typ::basic_kind(xt, self.tc_objs) {
            Some(BasicType::Float32) => BasicType::Complex64,
            Some(BasicType::UntypedFloat) => BasicType::UntypedComplex,
            _ => BasicType::Complex128,
        };
        let res = self.basic_type(res);
        match folded {
            Some(v) => x.mode = OperandMode::Constant(v),
            None => {
                x.mode = OperandMode::Value;
                self.record_builtin_type(&call.func, Builtin::Complex, Some(res), &[xt, xt], false);
            }
        }
        x.typ = Some(res);
        true
    }

    /// copy(dst, src []T) int
    fn builtin_copy(&mut self, x: &mut Operand, call: &CallExpr, args: &Unpacked<'_>) -> bool {
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        let dst = self.tc_objs.types[typ::underlying_type(xt, self.tc_objs)]
            .try_as_slice()
            .map(|s| s.elem());

        let mut y = Operand::new();
        args.get(self, &mut y, 1);
        if y.invalid() {
            return false;
        }
        let yt = y.typ.unwrap_or(invalid);
        let src = match &self.tc_objs.types[typ::underlying_type(yt, self.tc_objs)] {
            Type::Basic(_) if typ::is_string(yt, self.tc_objs) => Some(self.tc_objs.universe().byte()),
            Type::Slice(s) => Some(s.elem()),
            _ => None,
        };

        let (Some(dst), Some(src)) = (dst, src) else {
            let msg = format!(
                "invalid argument: copy expects slice arguments; found {} and {}",
                self.op_desc(x, call.args.first()),
                self.op_desc(&y, call.args.get(1))
            );
            self.error(TypeError::InvalidBuiltinCall, x.span, msg);
            return false;
        };
        if !typ::identical(dst, src, self.tc_objs) {
            let msg = format!(
                "invalid argument: arguments to copy {} and {} have different element types {} and {}",
                self.op_desc(x, call.args.first()),
                self.op_desc(&y, call.args.get(1)),
                self.type_str(dst),
                self.type_str(src)
            );
            self.error(TypeError::InvalidBuiltinCall, x.span, msg);
            return false;
        }

        let int = self.basic_type(BasicType::Int);
        self.record_builtin_type(&call.func, Builtin::Copy, Some(int), &[xt, yt], false);
        x.mode = OperandMode::Value;
        x.typ = Some(int);
        true
    }

    /// real(complexT) floatT, imag(complexT) floatT
    fn builtin_real_imag(&mut self, x: &mut Operand, call: &CallExpr, id: Builtin) -> bool {
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        if typ::is_untyped(xt, self.tc_objs) {
            if x.mode.is_constant() {
                // any untyped numeric constant is a complex constant
                if typ::is_numeric(xt, self.tc_objs) {
                    x.typ = Some(self.basic_type(BasicType::UntypedComplex));
                }
            } else {
                let c128 = self.basic_type(BasicType::Complex128);
                self.convert_untyped(x, c128);
                if x.invalid() {
                    return false;
                }
            }
        }

        let xt = x.typ.unwrap_or(invalid);
        if !typ::is_complex(xt, self.tc_objs) {
            let msg = format!(
                "invalid argument: argument has type {}, expected complex type",
                self.type_str(xt)
            );
            self.error(TypeError::InvalidBuiltinCall, x.span, msg);
            return false;
        }

        let res = match typ::basic_kind(xt, self.tc_objs) {
            Some(BasicType::Complex64) => BasicType::Float32,
            Some(BasicType::UntypedComplex) => BasicType::UntypedFloat,
            _ => BasicType::Float64,
        };
        let res = self.basic_type(res);
        let folded = x.mode.constant_val().map(|v| match v.to_complex() {
            Some((re, _)) if id == Builtin::Real => ConstValue::Float(re),
            Some((_, im)) => ConstValue::Float(im),
            None => ConstValue::Unknown,
        });
        match folded {
            Some(v) => x.mode = OperandMode::Constant(v),
            None => {
                x.mode = OperandMode::Value;
                self.record_builtin_type(&call.func, id, Some(res), &[xt], false);
            }
        }
        x.typ = Some(res);
        true
    }

    /// make(T, n), make(T, n, m)
    fn builtin_make(&mut self, x: &mut Operand, call: &CallExpr) -> bool {
        let arg0 = &call.args[0];
        let Some(t) = self.type_argument(arg0) else {
            return false;
        };
        let min = match &self.tc_objs.types[typ::underlying_type(t, self.tc_objs)] {
            Type::Slice(_) => 2,
            Type::Map(_) | Type::Chan(_) => 1,
            _ => {
                let msg = format!(
                    "invalid argument: cannot make {}; type must be slice, map, or channel",
                    self.expr_str(arg0)
                );
                self.error(TypeError::InvalidBuiltinCall, arg0.span, msg);
                self.use_exprs(call.args[1..].iter());
                return false;
            }
        };
        let nargs = call.args.len();
        if nargs < min || min + 1 < nargs {
            let msg = format!("make({}) expects {} or {} arguments; found {}", self.expr_str(arg0), min, min + 1, nargs);
            self.error(TypeError::WrongArgCount, arg0.span, msg);
            self.use_exprs(call.args[1..].iter());
            return false;
        }

        let mut sizes = Vec::new();
        for arg in &call.args[1..] {
            if let (Some(s), true) = self.index(arg, None) {
                sizes.push(s);
            }
        }
        if let [len, cap] = sizes[..] {
            if len > cap {
                self.error(
                    TypeError::InvalidBuiltinCall,
                    call.args[1].span,
                    "invalid argument: length and capacity swapped",
                );
            }
        }

        x.mode = OperandMode::Value;
        x.typ = Some(t);
        let int = self.basic_type(BasicType::Int);
        let params = [t, int, int];
        self.record_builtin_type(&call.func, Builtin::Make, Some(t), &params[..1 + sizes.len()], false);
        true
    }

    /// Checks the type argument of make and new.
    fn type_argument(&mut self, e: &Expr) -> Option<TypeKey> {
        let mut x = Operand::new();
        self.expr_or_type(&mut x, e);
        match x.mode {
            OperandMode::Invalid => None,
            OperandMode::TypeExpr => x.typ.filter(|&t| !typ::is_invalid(t, self.tc_objs)),
            _ => {
                let msg = format!("{} is not a type", self.op_str(&x, e));
                self.error(TypeError::NotAType, e.span, msg);
                None
            }
        }
    }

    fn record_builtin_type(
        &mut self,
        func: &Expr,
        id: Builtin,
        res: Option<TypeKey>,
        args: &[TypeKey],
        variadic: bool,
    ) {
        let sig = make_sig(self.tc_objs, res, args, variadic);
        self.record_builtin_sig(func, id, sig);
    }

    /// Records `sig` for the identifier denoting a built-in and for the
    /// parentheses around it.
    fn record_builtin_sig(&mut self, func: &Expr, id: Builtin, sig: TypeKey) {
        let mut f = func;
        loop {
            self.record_type_and_value(f.id, OperandMode::Builtin(id), sig);
            match &f.kind {
                ExprKind::Paren(inner) => f = &**inner,
                _ => break,
            }
        }
    }
}

/// The signature of one built-in call. Untyped arguments are recorded with
/// their default types.
fn make_sig(objs: &mut TCObjects, res: Option<TypeKey>, args: &[TypeKey], variadic: bool) -> TypeKey {
    let params: Vec<ObjKey> = args
        .iter()
        .map(|&t| {
            let t = typ::untyped_default_type(t, objs);
            objs.new_param_var(0, None, String::new(), Some(t))
        })
        .collect();
    let params = objs.new_t_tuple(params);
    let results = res.map_or_else(Vec::new, |r| vec![objs.new_param_var(0, None, String::new(), Some(r))]);
    let results = objs.new_t_tuple(results);
    objs.new_t_signature(None, None, params, results, variadic)
}

/// `A` if `t` is a pointer to the array type `A`, else `t`.
fn implicit_array_deref(t: TypeKey, objs: &TCObjects) -> TypeKey {
    if let Some(p) = objs.types[t].try_as_pointer() {
        let base = typ::underlying_type(p.base(), objs);
        if objs.types[base].try_as_array().is_some() {
            return base;
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_sig_defaults_untyped_arguments() {
        let mut objs = TCObjects::new();
        let untyped_int = objs.universe().types()[&BasicType::UntypedInt];
        let int = objs.universe().types()[&BasicType::Int];
        let sig = make_sig(&mut objs, None, &[untyped_int], false);
        let detail = objs.types[sig].try_as_signature().copied().expect("signature");
        let params = detail.param_vars(&objs);
        assert_eq!(params.len(), 1);
        assert_eq!(objs.lobjs[params[0]].typ(), Some(int));
        assert!(detail.result_vars(&objs).is_empty());
    }

    #[test]
    fn test_implicit_array_deref() {
        let mut objs = TCObjects::new();
        let int = objs.universe().types()[&BasicType::Int];
        let arr = objs.new_t_array(int, Some(4));
        let ptr = objs.new_t_pointer(arr);
        let slice = objs.new_t_slice(int);
        let ptr_slice = objs.new_t_pointer(slice);
        assert_eq!(implicit_array_deref(ptr, &objs), arr);
        assert_eq!(implicit_array_deref(ptr_slice, &objs), ptr_slice);
        assert_eq!(implicit_array_deref(arr, &objs), arr);
    }
}
