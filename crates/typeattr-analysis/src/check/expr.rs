//! Expression checking.
//!
//! Basic algorithm:
//!
//! Expressions are checked recursively, top down. Expression checker functions
//! are generally of the form:
//!   fn f(x: &mut Operand, e: &Expr, ...)
//! where e is the expression to be checked, and x is the result of the check.
//! The check performed by f may fail in which case x.mode == OperandMode::Invalid,
//! and related error messages will have been issued by f.
//!
//! If a hint argument is present, it is the composite literal element type
//! of an outer composite literal; it is used to type-check composite literal
//! elements that have no explicit type specification in the source.
//!
//! All expressions are checked via raw_expr, which dispatches according
//! to expression kind. Upon returning, raw_expr is recording the types and
//! constant values for all expressions that have a typed type; untyped ones
//! wait in `Checker::untyped`.
//!
//! Untyped expressions may eventually become fully typed (i.e., not untyped),
//! typically when the value is assigned to a variable, or is used otherwise.
//! The update_expr_type method is used to record this final type and update
//! the recorded types.

use std::collections::HashSet;
use std::rc::Rc;

use typeattr_common::Span;
use typeattr_syntax::ast::{
    BasicLit, BinaryOp, CompositeLit, CompositeLitElem, Expr, ExprKind, IndexExpr, NodeId, SliceExpr,
    TypeAssertExpr, UnaryExpr, UnaryOp,
};

use crate::constant::{self, ConstError};
use crate::errors::TypeError;
use crate::lookup;
use crate::obj::ConstValue;
use crate::objects::{ObjKey, TypeKey};
use crate::operand::{Operand, OperandMode};
use crate::typ::{self, BasicType, ChanDir, Type};

use super::checker::{Checker, Delayed, ExprInfo, ExprShape};

/// Shift counts beyond this are rejected for constant shifts.
const SHIFT_BOUND: u64 = 1023 - 1 + 52;

/// How a checked expression may be used in statement context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExprClass {
    Conversion,
    Expression,
    Statement,
}

/// What an index or slice expression operates on.
enum Indexable {
    Str { untyped: bool },
    Array { len: Option<u64>, elem: TypeKey, via_pointer: bool },
    Slice(TypeKey),
    Map { key: TypeKey, elem: TypeKey },
    Other,
}

/// The underlying shape of a composite literal type.
enum LitShape {
    Struct(Vec<ObjKey>),
    Array { elem: TypeKey, len: Option<u64> },
    Slice(TypeKey),
    Map { key: TypeKey, elem: TypeKey },
    Other,
}

/// The underlying shape of an untyped value's conversion target.
enum Target {
    Basic,
    Interface { empty: bool },
    Nilable,
    Other,
}

impl<'a> Checker<'a> {
    // =========================================================================
    // Part 1: Entry points
    // =========================================================================

    /// Checks `e` as a single value.
    pub(crate) fn expr(&mut self, x: &mut Operand, e: &Expr) {
        self.multi_expr(x, e);
        self.single_value(x, Some(e));
    }

    /// Like `expr`, but the result may be a tuple.
    pub(crate) fn multi_expr(&mut self, x: &mut Operand, e: &Expr) {
        self.raw_expr(x, e, None);
        self.exclude_non_values(x, e);
    }

    /// Checks `e` as a single value; `hint` is the element type of an
    /// enclosing composite literal.
    pub(crate) fn expr_with_hint(&mut self, x: &mut Operand, e: &Expr, hint: TypeKey) {
        self.raw_expr(x, e, Some(hint));
        self.single_value(x, Some(e));
        self.exclude_non_values(x, e);
    }

    /// Checks `e` as a single value or a type.
    pub(crate) fn expr_or_type(&mut self, x: &mut Operand, e: &Expr) {
        self.raw_expr(x, e, None);
        self.single_value(x, Some(e));
        if x.mode == OperandMode::NoValue {
            let msg = format!("{} used as value or type", self.op_str(x, e));
            self.error(TypeError::NotAnExpr, x.span, msg);
            x.mode = OperandMode::Invalid;
        }
    }

    fn exclude_non_values(&mut self, x: &mut Operand, e: &Expr) {
        let what = match x.mode {
            OperandMode::NoValue => "used as value",
            OperandMode::Builtin(_) => "must be called",
            OperandMode::TypeExpr => "is not an expression",
            _ => return,
        };
        let msg = format!("{} {}", self.op_str(x, e), what);
        self.error(TypeError::NotAnExpr, x.span, msg);
        x.mode = OperandMode::Invalid;
    }

    /// Rejects a multi-value operand where one value is expected.
    pub(crate) fn single_value(&mut self, x: &mut Operand, e: Option<&Expr>) {
        if x.mode != OperandMode::Value {
            return;
        }
        let Some(t) = x.typ else { return };
        if let Some(tuple) = self.tc_objs.types[t].try_as_tuple() {
            let n = tuple.vars().len();
            let msg = format!("{}-valued {} where single value is expected", n, self.op_desc(x, e));
            self.error(TypeError::TooManyValues, x.span, msg);
            x.mode = OperandMode::Invalid;
        }
    }

    /// Checks expressions for their recorded attributes only, after an
    /// error made their context meaningless.
    pub(crate) fn use_exprs<'e>(&mut self, es: impl IntoIterator<Item = &'e Expr>) {
        for e in es {
            let mut x = Operand::new();
            self.raw_expr(&mut x, e, None);
        }
    }

    /// Checks any expression and records its type, or remembers it as
    /// untyped.
    pub(crate) fn raw_expr(&mut self, x: &mut Operand, e: &Expr, hint: Option<TypeKey>) -> ExprClass {
        let class = self.expr_internal(x, e, hint);

        let typ = match x.mode {
            OperandMode::Invalid => self.invalid_type(),
            OperandMode::NoValue => self.tc_objs.universe().no_value_tuple(),
            _ => x.typ.unwrap_or_else(|| self.invalid_type()),
        };
        self.record_enclosing(e.id);
        if typ::is_untyped(typ, self.tc_objs) {
            self.remember_untyped(e, false, x.mode.clone(), typ);
        } else {
            self.record_type_and_value(e.id, x.mode.clone(), typ);
        }
        class
    }

    fn expr_internal(&mut self, x: &mut Operand, e: &Expr, hint: Option<TypeKey>) -> ExprClass {
        x.mode = OperandMode::Invalid;
        x.typ = Some(self.invalid_type());
        x.expr = Some(e.id);
        x.span = e.span;

        let (ok, class) = match &e.kind {
            ExprKind::Ident(ident) => {
                self.ident(x, ident, false);
                (!x.invalid(), ExprClass::Expression)
            }
            ExprKind::IntLit(lit) => (self.basic_lit(x, e, lit, BasicType::UntypedInt), ExprClass::Expression),
            ExprKind::FloatLit(lit) => (self.basic_lit(x, e, lit, BasicType::UntypedFloat), ExprClass::Expression),
            ExprKind::ImagLit(lit) => (self.basic_lit(x, e, lit, BasicType::UntypedComplex), ExprClass::Expression),
            ExprKind::RuneLit(lit) => (self.basic_lit(x, e, lit, BasicType::UntypedRune), ExprClass::Expression),
            ExprKind::StringLit(lit) => (self.basic_lit(x, e, lit, BasicType::UntypedString), ExprClass::Expression),
            ExprKind::FuncLit(lit) => {
                let sig = self.func_type(None, &lit.sig);
                // the literal belongs to the declaration that contains it
                let decl = self.octx.decl;
                if self.octx.sig.is_some() {
                    // locals declared after the literal must stay invisible
                    self.func_body(decl, "<function literal>", sig, &lit.body);
                } else {
                    self.later(Delayed::FuncLit {
                        body: Rc::new(lit.body.clone()),
                        sig,
                        decl,
                    });
                }
                x.mode = OperandMode::Value;
                x.typ = Some(sig);
                (true, ExprClass::Expression)
            }
            ExprKind::CompositeLit(lit) => (self.composite_lit(x, e, lit, hint), ExprClass::Expression),
            ExprKind::Paren(inner) => {
                let class = self.raw_expr(x, inner, None);
                x.expr = Some(e.id);
                x.span = e.span;
                return class;
            }
            ExprKind::Selector(sel) => {
                self.selector(x, e, sel);
                (!x.invalid(), ExprClass::Expression)
            }
            ExprKind::Index(ie) => (self.index_expr(x, ie), ExprClass::Expression),
            ExprKind::Slice(se) => (self.slice_expr(x, se), ExprClass::Expression),
            ExprKind::TypeAssert(ta) => (self.type_assert_expr(x, ta), ExprClass::Expression),
            ExprKind::Call(call) => {
                let class = self.call(x, e, call);
                x.expr = Some(e.id);
                x.span = e.span;
                return class;
            }
            ExprKind::Conversion(conv) => {
                let t = self.typ(&conv.ty);
                self.expr(x, &conv.expr);
                if !x.invalid() && !typ::is_invalid(t, self.tc_objs) {
                    self.conversion(x, t, &conv.expr);
                } else {
                    x.mode = OperandMode::Invalid;
                }
                (!x.invalid(), ExprClass::Conversion)
            }
            ExprKind::Receive(inner) => (self.receive(x, inner), ExprClass::Statement),
            ExprKind::Unary(u) => (self.unary(x, e, u), ExprClass::Expression),
            ExprKind::Binary(b) => (
                self.binary(x, Some(e), &b.left, &b.right, b.op),
                ExprClass::Expression,
            ),
            ExprKind::TypeAsExpr(te) => {
                let t = self.typ(te);
                x.mode = OperandMode::TypeExpr;
                x.typ = Some(t);
                (!typ::is_invalid(t, self.tc_objs), ExprClass::Expression)
            }
        };

        x.expr = Some(e.id);
        x.span = e.span;
        if !ok {
            x.mode = OperandMode::Invalid;
            // avoid follow-up errors
            return ExprClass::Statement;
        }
        class
    }

    fn basic_lit(&mut self, x: &mut Operand, e: &Expr, lit: &BasicLit, kind: BasicType) -> bool {
        let raw = self.interner.resolve(lit.raw).unwrap_or_default();
        let parsed = match kind {
            BasicType::UntypedInt => constant::int_from_literal(raw),
            BasicType::UntypedFloat => constant::float_from_literal(raw),
            BasicType::UntypedComplex => constant::imag_from_literal(raw),
            BasicType::UntypedRune => constant::rune_from_literal(raw),
            _ => constant::string_from_literal(raw),
        };
        match parsed {
            Ok(v) => {
                x.mode = OperandMode::Constant(v);
                x.typ = Some(self.basic_type(kind));
                true
            }
            Err(err) => {
                self.error(TypeError::InvalidLit, e.span, err.to_string());
                false
            }
        }
    }

    // =========================================================================
    // Part 2: Untyped expressions
    // =========================================================================

    fn remember_untyped(&mut self, e: &Expr, is_lhs: bool, mode: OperandMode, typ: TypeKey) {
        let info = ExprInfo {
            is_lhs,
            mode,
            typ,
            shape: ExprShape::of(e),
            span: e.span,
        };
        self.untyped.insert(e.id, info);
    }

    /// Sets the type of the untyped expression `id` and, where their type
    /// follows from it, of its operands. With `final_` unset the new type
    /// may itself still be untyped.
    pub(crate) fn update_expr_type(&mut self, id: NodeId, t: TypeKey, final_: bool) {
        let Some(old) = self.untyped.get(&id).cloned() else {
            return;
        };

        // constant operands are never materialized
        let is_const = old.mode.is_constant();
        match old.shape {
            ExprShape::Leaf => {}
            ExprShape::Paren(inner) => self.update_expr_type(inner, t, final_),
            ExprShape::Unary(inner) => {
                if !is_const {
                    self.update_expr_type(inner, t, final_);
                }
            }
            ExprShape::Binary { op, left, right } => {
                if !is_const && !op.is_comparison() {
                    self.update_expr_type(left, t, final_);
                    // the count of a shift was typed when the shift was checked
                    if !op.is_shift() {
                        self.update_expr_type(right, t, final_);
                    }
                }
            }
        }

        if !final_ && typ::is_untyped(t, self.tc_objs) {
            let u = typ::underlying_type(t, self.tc_objs);
            if let Some(info) = self.untyped.get_mut(&id) {
                info.typ = u;
            }
            return;
        }

        self.untyped.remove(&id);
        if old.is_lhs && !typ::is_integer(t, self.tc_objs) {
            let msg = format!(
                "invalid operation: shifted operand of type {} must be integer",
                self.type_str(t)
            );
            self.error(TypeError::InvalidShiftOperand, old.span, msg);
            return;
        }
        if is_const {
            let mut c = Operand {
                mode: old.mode.clone(),
                expr: Some(id),
                span: old.span,
                typ: Some(old.typ),
            };
            self.convert_untyped(&mut c, t);
            if c.invalid() {
                return;
            }
        }
        self.record_type_and_value(id, old.mode, t);
    }

    fn update_expr_val(&mut self, id: NodeId, val: &ConstValue) {
        if let Some(info) = self.untyped.get_mut(&id) {
            if info.mode.is_constant() {
                info.mode = OperandMode::Constant(val.clone());
            }
        }
    }

    /// Converts an untyped operand to `target`, reporting values that do
    /// not fit.
    pub(crate) fn convert_untyped(&mut self, x: &mut Operand, target: TypeKey) {
        let Some(xt) = x.typ else { return };
        if x.invalid() || typ::is_typed(xt, self.tc_objs) || typ::is_invalid(target, self.tc_objs) {
            return;
        }

        if typ::is_untyped(target, self.tc_objs) {
            let xkind = typ::basic_kind(xt, self.tc_objs);
            let tkind = typ::basic_kind(target, self.tc_objs);
            if typ::is_numeric(xt, self.tc_objs) && typ::is_numeric(target, self.tc_objs) {
                if xkind < tkind {
                    x.typ = Some(target);
                    if let Some(id) = x.expr {
                        self.update_expr_type(id, target, false);
                    }
                }
            } else if xkind != tkind {
                self.invalid_conversion(x, target);
            }
            return;
        }

        let tu = typ::underlying_type(target, self.tc_objs);
        let shape = match &self.tc_objs.types[tu] {
            Type::Basic(_) => Target::Basic,
            Type::Interface(i) => Target::Interface {
                empty: i.is_empty(self.tc_objs),
            },
            Type::Pointer(_) | Type::Signature(_) | Type::Slice(_) | Type::Map(_) | Type::Chan(_) => {
                Target::Nilable
            }
            _ => Target::Other,
        };
        let nil = self.basic_type(BasicType::UntypedNil);
        let is_nil = x.is_nil(self.tc_objs);

        let final_target = match shape {
            Target::Basic => {
                if x.mode.is_constant() {
                    self.representable(x, target, None);
                    if x.invalid() {
                        return;
                    }
                    // the value may have been rounded
                    if let (Some(id), OperandMode::Constant(v)) = (x.expr, &x.mode) {
                        let v = v.clone();
                        self.update_expr_val(id, &v);
                    }
                } else {
                    // comparisons, delayed shift operands and nil
                    let ok = match typ::basic_kind(xt, self.tc_objs) {
                        Some(BasicType::UntypedBool) => typ::is_boolean(target, self.tc_objs),
                        Some(
                            BasicType::UntypedInt
                            | BasicType::UntypedRune
                            | BasicType::UntypedFloat
                            | BasicType::UntypedComplex,
                        ) => typ::is_numeric(target, self.tc_objs),
                        Some(BasicType::UntypedNil) => typ::has_nil(target, self.tc_objs),
                        _ => false,
                    };
                    if !ok {
                        self.invalid_conversion(x, target);
                        return;
                    }
                }
                target
            }
            Target::Interface { empty } => {
                // values keep a concrete dynamic type; nil stays untyped
                if is_nil {
                    nil
                } else if !empty {
                    self.invalid_conversion(x, target);
                    return;
                } else {
                    typ::untyped_default_type(xt, self.tc_objs)
                }
            }
            Target::Nilable => {
                if !is_nil {
                    self.invalid_conversion(x, target);
                    return;
                }
                nil
            }
            Target::Other => {
                self.invalid_conversion(x, target);
                return;
            }
        };

        x.typ = Some(final_target);
        if let Some(id) = x.expr {
            self.update_expr_type(id, final_target, true);
        }
    }

    fn invalid_conversion(&mut self, x: &mut Operand, target: TypeKey) {
        let msg = format!("cannot convert {} to {}", self.op_desc(x, None), self.type_str(target));
        self.error(TypeError::TypeMismatch, x.span, msg);
        x.mode = OperandMode::Invalid;
    }

    /// Checks that the constant `x` is representable in the basic type
    /// `target` and rounds its value.
    pub(crate) fn representable(&mut self, x: &mut Operand, target: TypeKey, e: Option<&Expr>) {
        let OperandMode::Constant(val) = &x.mode else { return };
        let Some(kind) = typ::basic_kind(target, self.tc_objs) else { return };
        let mut rounded = val.clone();
        if val.representable(kind, self.config.word_size, Some(&mut rounded)) {
            x.mode = OperandMode::Constant(rounded);
            return;
        }

        let xt = x.typ.unwrap_or(target);
        let objs = &*self.tc_objs;
        let (code, what) = if typ::is_numeric(xt, objs) && typ::is_numeric(target, objs) {
            if !typ::is_integer(xt, objs) && typ::is_integer(target, objs) {
                (TypeError::NumericOverflow, "truncated to")
            } else {
                (TypeError::NumericOverflow, "overflows")
            }
        } else {
            (TypeError::TypeMismatch, "cannot convert to")
        };
        let msg = match code {
            TypeError::TypeMismatch => {
                format!("cannot convert {} to {}", self.op_desc(x, e), self.type_str(target))
            }
            _ => format!("{} {} {}", self.op_desc(x, e), what, self.type_str(target)),
        };
        self.error(code, x.span, msg);
        x.mode = OperandMode::Invalid;
    }

    // =========================================================================
    // Part 3: Operators
    // =========================================================================

    fn unary(&mut self, x: &mut Operand, e: &Expr, u: &UnaryExpr) -> bool {
        if u.op == UnaryOp::Deref {
            self.expr_or_type(x, &u.operand);
            let xt = x.typ.unwrap_or_else(|| self.invalid_type());
            match x.mode {
                OperandMode::Invalid => return false,
                OperandMode::TypeExpr => {
                    x.typ = Some(self.tc_objs.new_t_pointer(xt));
                    return true;
                }
                _ => {}
            }
            let ut = typ::underlying_type(xt, self.tc_objs);
            return match self.tc_objs.types[ut].try_as_pointer().map(|p| p.base()) {
                Some(base) => {
                    x.mode = OperandMode::Variable;
                    x.typ = Some(base);
                    true
                }
                None => {
                    let msg = format!("invalid operation: cannot indirect {}", self.op_str(x, &u.operand));
                    self.error(TypeError::InvalidOp, x.span, msg);
                    false
                }
            };
        }

        self.expr(x, &u.operand);
        if x.invalid() {
            return false;
        }
        let xt = x.typ.unwrap_or_else(|| self.invalid_type());

        if u.op == UnaryOp::Addr {
            // composite literals are addressable here
            let is_lit = matches!(u.operand.unparen().kind, ExprKind::CompositeLit(_));
            if !is_lit && x.mode != OperandMode::Variable {
                let msg = format!(
                    "invalid operation: cannot take address of {}",
                    self.op_str(x, &u.operand)
                );
                self.error(TypeError::InvalidOp, x.span, msg);
                return false;
            }
            x.mode = OperandMode::Value;
            x.typ = Some(self.tc_objs.new_t_pointer(xt));
            return true;
        }

        let objs = &*self.tc_objs;
        let defined = match u.op {
            UnaryOp::Pos | UnaryOp::Neg => typ::is_numeric(xt, objs),
            UnaryOp::BitNot => typ::is_integer(xt, objs),
            UnaryOp::Not => typ::is_boolean(xt, objs),
            UnaryOp::Addr | UnaryOp::Deref => false,
        };
        if !defined {
            let msg = format!(
                "invalid operation: operator {} not defined for {}",
                u.op.as_str(),
                self.op_str(x, &u.operand)
            );
            self.error(TypeError::InvalidOp, x.span, msg);
            return false;
        }

        if let OperandMode::Constant(v) = &x.mode {
            let kind = typ::basic_kind(xt, self.tc_objs).unwrap_or(BasicType::Invalid);
            let prec = if kind.is_unsigned() {
                (kind.size_of(self.config.word_size) * 8) as u32
            } else {
                0
            };
            let folded = constant::unary_op(u.op, v, prec);
            x.mode = OperandMode::Constant(folded);
            // typed constants must stay representable after each operation
            if typ::is_typed(xt, self.tc_objs) {
                x.expr = Some(e.id);
                self.representable(x, xt, Some(e));
            }
            return !x.invalid();
        }
        x.mode = OperandMode::Value;
        true
    }

    fn receive(&mut self, x: &mut Operand, inner: &Expr) -> bool {
        self.expr(x, inner);
        if x.invalid() {
            return false;
        }
        let xt = x.typ.unwrap_or_else(|| self.invalid_type());
        let ut = typ::underlying_type(xt, self.tc_objs);
        let chan = self.tc_objs.types[ut].try_as_chan().map(|c| (c.dir(), c.elem()));
        match chan {
            Some((ChanDir::SendOnly, _)) => {
                let msg = format!(
                    "invalid operation: cannot receive from send-only channel {}",
                    self.op_str(x, inner)
                );
                self.error(TypeError::InvalidReceive, x.span, msg);
                false
            }
            Some((_, elem)) => {
                self.octx.has_call_or_recv = true;
                x.mode = OperandMode::CommaOk;
                x.typ = Some(elem);
                true
            }
            None => {
                let msg = format!(
                    "invalid operation: cannot receive from non-channel {}",
                    self.op_str(x, inner)
                );
                self.error(TypeError::InvalidReceive, x.span, msg);
                false
            }
        }
    }

    /// Checks `lhs op rhs`. `e` is the binary expression itself; it is
    /// absent for assignment operations.
    pub(crate) fn binary(
        &mut self,
        x: &mut Operand,
        e: Option<&Expr>,
        lhs: &Expr,
        rhs: &Expr,
        op: BinaryOp,
    ) -> bool {
        let mut y = Operand::new();
        self.expr(x, lhs);
        self.expr(&mut y, rhs);
        if x.invalid() {
            return false;
        }
        if y.invalid() {
            x.mode = OperandMode::Invalid;
            x.expr = y.expr;
            return false;
        }

        if op.is_shift() {
            return self.shift(x, &mut y, e, lhs, rhs, op);
        }

        let invalid = self.invalid_type();
        self.convert_untyped(x, y.typ.unwrap_or(invalid));
        if x.invalid() {
            return false;
        }
        self.convert_untyped(&mut y, x.typ.unwrap_or(invalid));
        if y.invalid() {
            x.mode = OperandMode::Invalid;
            return false;
        }

        if op.is_comparison() {
            return self.comparison(x, &y, lhs, Some(rhs), op);
        }

        let xt = x.typ.unwrap_or(invalid);
        let yt = y.typ.unwrap_or(invalid);
        if !typ::identical(xt, yt, self.tc_objs) {
            // invalid operands were reported before
            if !typ::is_invalid(xt, self.tc_objs) && !typ::is_invalid(yt, self.tc_objs) {
                let msg = format!(
                    "invalid operation: mismatched types {} and {}",
                    self.type_str(xt),
                    self.type_str(yt)
                );
                self.error(TypeError::MismatchedTypes, x.span, msg);
            }
            x.mode = OperandMode::Invalid;
            return false;
        }

        if !self.binary_op_defined(op, xt) {
            let msg = format!(
                "invalid operation: operator {} not defined for {}",
                op.as_str(),
                self.op_str(x, lhs)
            );
            self.error(TypeError::InvalidOp, x.span, msg);
            x.mode = OperandMode::Invalid;
            return false;
        }

        if matches!(op, BinaryOp::Div | BinaryOp::Rem)
            && (x.mode.is_constant() || typ::is_integer(xt, self.tc_objs))
            && matches!(&y.mode, OperandMode::Constant(v) if v.sign() == 0)
        {
            self.error(TypeError::DivisionByZero, y.span, "invalid operation: division by zero");
            x.mode = OperandMode::Invalid;
            return false;
        }

        if let (OperandMode::Constant(a), OperandMode::Constant(b)) = (&x.mode, &y.mode) {
            // integer division only for integer operands
            let folded = if op == BinaryOp::Div && !typ::is_integer(xt, self.tc_objs) {
                constant::binary_op(&as_float(a), op, &as_float(b))
            } else {
                constant::binary_op(a, op, b)
            };
            match folded {
                Ok(v) => x.mode = OperandMode::Constant(v),
                Err(ConstError::DivisionByZero) => {
                    self.error(TypeError::DivisionByZero, y.span, "invalid operation: division by zero");
                    x.mode = OperandMode::Invalid;
                    return false;
                }
                Err(err) => {
                    self.error(TypeError::InvalidOp, x.span, format!("invalid operation: {}", err));
                    x.mode = OperandMode::Invalid;
                    return false;
                }
            }
            if typ::is_typed(xt, self.tc_objs) {
                if let Some(e) = e {
                    x.expr = Some(e.id);
                    x.span = e.span;
                }
                self.representable(x, xt, e);
            }
            return !x.invalid();
        }

        x.mode = OperandMode::Value;
        true
    }

    fn binary_op_defined(&self, op: BinaryOp, t: TypeKey) -> bool {
        let objs = &*self.tc_objs;
        match op {
            BinaryOp::Add => typ::is_numeric(t, objs) || typ::is_string(t, objs),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => typ::is_numeric(t, objs),
            BinaryOp::Rem | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::AndNot => {
                typ::is_integer(t, objs)
            }
            BinaryOp::LogAnd | BinaryOp::LogOr => typ::is_boolean(t, objs),
            _ => false,
        }
    }

    /// Checks `x op y`. A missing `rhs` stands for the implicit `true` of
    /// a switch without tag.
    pub(crate) fn comparison(
        &mut self,
        x: &mut Operand,
        y: &Operand,
        lhs: &Expr,
        rhs: Option<&Expr>,
        op: BinaryOp,
    ) -> bool {
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        let yt = y.typ.unwrap_or(invalid);

        let problem = if self.assignable(x, yt, None) || self.assignable(y, xt, None) {
            let objs = &*self.tc_objs;
            let defined = match op {
                BinaryOp::Eq | BinaryOp::NotEq => {
                    typ::comparable(xt, objs)
                        || (x.is_nil(objs) && typ::has_nil(yt, objs))
                        || (y.is_nil(objs) && typ::has_nil(xt, objs))
                }
                _ => typ::is_ordered(xt, objs),
            };
            if defined {
                None
            } else {
                let t = if x.is_nil(objs) { yt } else { xt };
                Some((
                    TypeError::InvalidOp,
                    format!("operator {} not defined for {}", op.as_str(), self.type_str(t)),
                ))
            }
        } else {
            Some((
                TypeError::MismatchedTypes,
                format!("mismatched types {} and {}", self.type_str(xt), self.type_str(yt)),
            ))
        };
        if let Some((code, why)) = problem {
            let msg = format!(
                "invalid operation: cannot compare {} {} {} ({})",
                self.expr_str(lhs),
                op.as_str(),
                rhs.map_or_else(|| "true".to_string(), |e| self.expr_str(e)),
                why
            );
            self.error(code, x.span, msg);
            x.mode = OperandMode::Invalid;
            return false;
        }

        if let (OperandMode::Constant(a), OperandMode::Constant(b)) = (&x.mode, &y.mode) {
            x.mode = OperandMode::Constant(ConstValue::Bool(constant::compare(a, op, b)));
        } else {
            x.mode = OperandMode::Value;
            // the operands are materialized with their final types
            let xd = typ::untyped_default_type(xt, self.tc_objs);
            let yd = typ::untyped_default_type(yt, self.tc_objs);
            if let Some(id) = x.expr {
                self.update_expr_type(id, xd, true);
            }
            if let Some(id) = y.expr {
                self.update_expr_type(id, yd, true);
            }
        }
        x.typ = Some(self.basic_type(BasicType::UntypedBool));
        true
    }

    fn shift(
        &mut self,
        x: &mut Operand,
        y: &mut Operand,
        e: Option<&Expr>,
        lhs: &Expr,
        rhs: &Expr,
        op: BinaryOp,
    ) -> bool {
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        let untyped_x = typ::is_untyped(xt, self.tc_objs);
        let xval = x.mode.constant_val().and_then(|v| v.to_int());

        // an untyped lhs must at least be an integral constant
        if !(typ::is_integer(xt, self.tc_objs) || (untyped_x && xval.is_some())) {
            let msg = format!(
                "invalid operation: shifted operand {} must be integer",
                self.op_str(x, lhs)
            );
            self.error(TypeError::InvalidShiftOperand, x.span, msg);
            x.mode = OperandMode::Invalid;
            return false;
        }

        let yt = y.typ.unwrap_or(invalid);
        if typ::is_unsigned(yt, self.tc_objs) {
        } else if typ::is_untyped(yt, self.tc_objs) {
            let uint = self.basic_type(BasicType::Uint);
            self.convert_untyped(y, uint);
            if y.invalid() {
                x.mode = OperandMode::Invalid;
                return false;
            }
        } else {
            let msg = format!(
                "invalid operation: shift count {} must be unsigned integer",
                self.op_str(y, rhs)
            );
            self.error(TypeError::InvalidShiftCount, y.span, msg);
            x.mode = OperandMode::Invalid;
            return false;
        }

        if let Some(xv) = xval.filter(|_| x.mode.is_constant()) {
            if let OperandMode::Constant(yv) = &y.mode {
                let count = yv.to_int().and_then(|_| yv.to_u64()).filter(|&s| s <= SHIFT_BOUND);
                let Some(s) = count else {
                    let msg = format!("invalid operation: invalid shift count {}", self.op_str(y, rhs));
                    self.error(TypeError::InvalidShiftCount, y.span, msg);
                    x.mode = OperandMode::Invalid;
                    return false;
                };
                // an untyped float lhs like 2.0 becomes an integer
                if !typ::is_integer(xt, self.tc_objs) {
                    x.typ = Some(self.basic_type(BasicType::UntypedInt));
                }
                x.mode = OperandMode::Constant(constant::shift(&ConstValue::Int(xv), op, s as u32));
                let xt = x.typ.unwrap_or(invalid);
                if typ::is_typed(xt, self.tc_objs) {
                    if let Some(e) = e {
                        x.expr = Some(e.id);
                        x.span = e.span;
                    }
                    self.representable(x, xt, e);
                }
                return !x.invalid();
            }

            if untyped_x {
                // the lhs type is decided by the context of the whole shift
                if let Some(info) = x.expr.and_then(|id| self.untyped.get_mut(&id)) {
                    info.is_lhs = true;
                }
                x.mode = OperandMode::Value;
                return true;
            }
        }

        if let OperandMode::Constant(yv) = &y.mode {
            if yv.sign() < 0 {
                let msg = format!(
                    "invalid operation: shift count {} must not be negative",
                    self.op_str(y, rhs)
                );
                self.error(TypeError::InvalidShiftCount, y.span, msg);
            }
        }

        if !typ::is_integer(xt, self.tc_objs) {
            let msg = format!(
                "invalid operation: shifted operand {} must be integer",
                self.op_str(x, lhs)
            );
            self.error(TypeError::InvalidShiftOperand, x.span, msg);
            x.mode = OperandMode::Invalid;
            return false;
        }
        x.mode = OperandMode::Value;
        true
    }

    // =========================================================================
    // Part 4: Index, slice and type assertion
    // =========================================================================

    fn indexable(&self, t: TypeKey) -> Indexable {
        let objs = &*self.tc_objs;
        match &objs.types[typ::underlying_type(t, objs)] {
            Type::Basic(b) if typ::is_string(t, objs) => Indexable::Str {
                untyped: b.typ() == BasicType::UntypedString,
            },
            Type::Array(a) => Indexable::Array {
                len: a.len(),
                elem: a.elem(),
                via_pointer: false,
            },
            Type::Pointer(p) => match objs.types[typ::underlying_type(p.base(), objs)].try_as_array() {
                Some(a) => Indexable::Array {
                    len: a.len(),
                    elem: a.elem(),
                    via_pointer: true,
                },
                None => Indexable::Other,
            },
            Type::Slice(s) => Indexable::Slice(s.elem()),
            Type::Map(m) => Indexable::Map {
                key: m.key(),
                elem: m.elem(),
            },
            _ => Indexable::Other,
        }
    }

    fn index_expr(&mut self, x: &mut Operand, ie: &IndexExpr) -> bool {
        self.expr(x, &ie.expr);
        if x.invalid() {
            self.use_exprs([&ie.index]);
            return false;
        }

        let xt = x.typ.unwrap_or_else(|| self.invalid_type());
        let mut length = None;
        match self.indexable(xt) {
            Indexable::Str { .. } => {
                if let OperandMode::Constant(v) = &x.mode {
                    length = v.str_as_str().map(|s| s.len() as u64);
                }
                // indexing a string never yields a constant
                x.mode = OperandMode::Value;
                x.typ = Some(self.tc_objs.universe().byte());
            }
            Indexable::Array { len, elem, via_pointer } => {
                length = len;
                if via_pointer {
                    x.mode = OperandMode::Variable;
                } else if x.mode != OperandMode::Variable {
                    x.mode = OperandMode::Value;
                }
                x.typ = Some(elem);
            }
            Indexable::Slice(elem) => {
                x.mode = OperandMode::Variable;
                x.typ = Some(elem);
            }
            Indexable::Map { key, elem } => {
                let mut k = Operand::new();
                self.expr(&mut k, &ie.index);
                self.assignment(&mut k, Some(key), Some(&ie.index), "map index");
                x.mode = OperandMode::MapIndex;
                x.typ = Some(elem);
                return true;
            }
            Indexable::Other => {
                let msg = format!("invalid operation: cannot index {}", self.op_str(x, &ie.expr));
                self.error(TypeError::NonIndexable, x.span, msg);
                self.use_exprs([&ie.index]);
                return false;
            }
        }

        self.index(&ie.index, length);
        true
    }

    /// Checks an index against an optional exclusive bound. Returns the
    /// value of a constant index and whether the index is valid.
    pub(crate) fn index(&mut self, e: &Expr, max: Option<u64>) -> (Option<u64>, bool) {
        let mut x = Operand::new();
        self.expr(&mut x, e);
        if x.invalid() {
            return (None, false);
        }
        let int = self.basic_type(BasicType::Int);
        self.convert_untyped(&mut x, int);
        if x.invalid() {
            return (None, false);
        }

        let xt = x.typ.unwrap_or(int);
        if !typ::is_integer(xt, self.tc_objs) {
            let msg = format!("index {} must be integer", self.op_str(&x, e));
            self.error(TypeError::InvalidIndex, x.span, msg);
            return (None, false);
        }

        if let OperandMode::Constant(v) = &x.mode {
            if v.sign() < 0 {
                let msg = format!("index {} must not be negative", self.op_str(&x, e));
                self.error(TypeError::InvalidIndex, x.span, msg);
                return (None, false);
            }
            let i = v.to_u64();
            return match i {
                Some(i) if max.map_or(true, |m| i < m) => (Some(i), true),
                _ => {
                    let msg = format!("index {} is out of bounds", self.op_str(&x, e));
                    self.error(TypeError::InvalidIndex, x.span, msg);
                    (i, false)
                }
            };
        }
        (None, true)
    }

    fn slice_expr(&mut self, x: &mut Operand, se: &SliceExpr) -> bool {
        self.expr(x, &se.expr);
        if x.invalid() {
            self.use_exprs(se.low.iter().chain(se.high.iter()));
            return false;
        }

        let xt = x.typ.unwrap_or_else(|| self.invalid_type());
        let mut length = None;
        match self.indexable(xt) {
            Indexable::Str { untyped } => {
                if let OperandMode::Constant(v) = &x.mode {
                    length = v.str_as_str().map(|s| s.len() as u64);
                }
                // slicing an untyped string yields a string value
                if untyped {
                    x.typ = Some(self.basic_type(BasicType::Str));
                }
            }
            Indexable::Array { len, elem, via_pointer } => {
                if !via_pointer && x.mode != OperandMode::Variable {
                    let msg = format!(
                        "invalid operation: cannot slice {} (value not addressable)",
                        self.op_str(x, &se.expr)
                    );
                    self.error(TypeError::NonSliceable, x.span, msg);
                    return false;
                }
                length = len;
                x.typ = Some(self.tc_objs.new_t_slice(elem));
            }
            Indexable::Slice(_) => {}
            Indexable::Map { .. } | Indexable::Other => {
                let msg = format!("invalid operation: cannot slice {}", self.op_str(x, &se.expr));
                self.error(TypeError::NonSliceable, x.span, msg);
                self.use_exprs(se.low.iter().chain(se.high.iter()));
                return false;
            }
        }
        x.mode = OperandMode::Value;

        // indices may equal the length
        let max = length.map(|l| l + 1);
        let mut bounds = [None, None];
        for (i, bound) in [&se.low, &se.high].into_iter().enumerate() {
            bounds[i] = match bound {
                Some(b) => match self.index(b, max) {
                    (v, true) => v,
                    _ => None,
                },
                None if i == 0 => Some(0),
                None => length,
            };
        }
        if let [Some(lo), Some(hi)] = bounds {
            if lo > hi {
                let msg = format!("invalid slice indices: {} > {}", lo, hi);
                self.error(TypeError::InvalidIndex, se.high.as_ref().map_or(x.span, |h| h.span), msg);
            }
        }
        true
    }

    fn type_assert_expr(&mut self, x: &mut Operand, ta: &TypeAssertExpr) -> bool {
        self.expr(x, &ta.expr);
        if x.invalid() {
            return false;
        }
        let xt = x.typ.unwrap_or_else(|| self.invalid_type());
        if !typ::is_interface(xt, self.tc_objs) {
            let msg = format!("invalid operation: {} is not an interface", self.op_str(x, &ta.expr));
            self.error(TypeError::InvalidAssertion, x.span, msg);
            return false;
        }
        let t = self.typ(&ta.ty);
        if typ::is_invalid(t, self.tc_objs) {
            return false;
        }
        self.type_assertion(x, &ta.expr, xt, t, ta.ty.span);
        x.mode = OperandMode::CommaOk;
        x.typ = Some(t);
        true
    }

    /// Reports a type assertion `x.(T)` that can never succeed.
    pub(crate) fn type_assertion(&mut self, x: &Operand, e: &Expr, xt: TypeKey, t: TypeKey, span: Span) {
        self.complete_methods(t);
        let Some((method, wrong_type)) = lookup::assertable_to(xt, t, self.tc_objs) else {
            return;
        };
        let what = if wrong_type { "wrong type for method" } else { "missing method" };
        let msg = format!(
            "impossible type assertion: {} cannot have dynamic type {} ({} {})",
            self.op_str(x, e),
            self.type_str(t),
            what,
            self.tc_objs.lobjs[method].name()
        );
        self.error(TypeError::ImpossibleAssert, span, msg);
    }

    // =========================================================================
    // Part 5: Composite literals
    // =========================================================================

    fn composite_lit(&mut self, x: &mut Operand, e: &Expr, lit: &CompositeLit, hint: Option<TypeKey>) -> bool {
        let (t, base) = match (&lit.ty, hint) {
            (Some(te), _) => {
                let t = self.typ(te);
                (t, t)
            }
            (None, Some(h)) => {
                // *T implies &T{}
                let u = typ::underlying_type(h, self.tc_objs);
                (h, lookup::try_deref(u, self.tc_objs).0)
            }
            (None, None) => {
                self.error(TypeError::InvalidLit, e.span, "invalid composite literal type");
                self.use_exprs(lit.elems.iter().map(|el| &el.value));
                return false;
            }
        };

        let ubase = typ::underlying_type(base, self.tc_objs);
        let shape = match &self.tc_objs.types[ubase] {
            Type::Struct(s) => LitShape::Struct(s.fields().clone()),
            Type::Array(a) => LitShape::Array {
                elem: a.elem(),
                len: a.len(),
            },
            Type::Slice(s) => LitShape::Slice(s.elem()),
            Type::Map(m) => LitShape::Map {
                key: m.key(),
                elem: m.elem(),
            },
            _ => LitShape::Other,
        };

        match shape {
            LitShape::Struct(fields) => self.struct_lit(lit, &fields, base, e.span),
            LitShape::Array { elem, len } => self.indexed_elems(&lit.elems, elem, len),
            LitShape::Slice(elem) => self.indexed_elems(&lit.elems, elem, None),
            LitShape::Map { key, elem } => self.map_lit(lit, key, elem),
            LitShape::Other => {
                self.use_exprs(lit.elems.iter().map(|el| &el.value));
                if !typ::is_invalid(ubase, self.tc_objs) {
                    let msg = format!("invalid composite literal type {}", self.type_str(t));
                    self.error(TypeError::InvalidLit, e.span, msg);
                }
                return false;
            }
        }

        x.mode = OperandMode::Value;
        x.typ = Some(t);
        true
    }

    fn struct_lit(&mut self, lit: &CompositeLit, fields: &[ObjKey], base: TypeKey, span: Span) {
        let Some(first) = lit.elems.first() else {
            return;
        };
        let invalid = self.invalid_type();
        let mut x = Operand::new();

        if first.key.is_some() {
            // all elements must have keys
            let mut visited = vec![false; fields.len()];
            for el in &lit.elems {
                let Some(key) = &el.key else {
                    self.mixed_struct_lit(el);
                    continue;
                };
                self.expr(&mut x, &el.value);
                let ExprKind::Ident(kid) = &key.kind else {
                    let msg = format!("invalid field name {} in struct literal", self.expr_str(key));
                    self.error(TypeError::InvalidLit, key.span, msg);
                    continue;
                };
                let name = self.ident_name(kid);
                let objs = &*self.tc_objs;
                let found = fields
                    .iter()
                    .position(|&f| objs.lobjs[f].same_id(Some(self.pkg), name, objs));
                let Some(i) = found else {
                    let msg = format!("unknown field {} in struct literal", name);
                    self.error(TypeError::UnknownField, key.span, msg);
                    continue;
                };
                let field = fields[i];
                self.record_use(kid, field);
                let ft = self.tc_objs.lobjs[field].typ().unwrap_or(invalid);
                self.assignment(&mut x, Some(ft), Some(&el.value), "struct literal");
                if visited[i] {
                    let msg = format!("duplicate field name {} in struct literal", name);
                    self.error(TypeError::DuplicateLitField, key.span, msg);
                    continue;
                }
                visited[i] = true;
            }
            return;
        }

        // no element may have a key
        for (i, el) in lit.elems.iter().enumerate() {
            if el.key.is_some() {
                self.mixed_struct_lit(el);
                continue;
            }
            self.expr(&mut x, &el.value);
            if i >= fields.len() {
                self.error(TypeError::InvalidLit, x.span, "too many values in struct literal");
                break;
            }
            let field = &self.tc_objs.lobjs[fields[i]];
            if !field.exported() && field.pkg() != Some(self.pkg) {
                let msg = format!(
                    "implicit assignment to unexported field {} in {} literal",
                    field.name(),
                    self.type_str(base)
                );
                self.error(TypeError::UnexportedName, x.span, msg);
                continue;
            }
            let ft = field.typ().unwrap_or(invalid);
            self.assignment(&mut x, Some(ft), Some(&el.value), "struct literal");
        }
        if lit.elems.len() < fields.len() {
            self.error(TypeError::InvalidLit, Span::point(span.end), "too few values in struct literal");
        }
    }

    fn mixed_struct_lit(&mut self, el: &CompositeLitElem) {
        self.error(
            TypeError::MixedStructLit,
            el.span,
            "mixture of field:value and value elements in struct literal",
        );
    }

    /// Checks the elements of an array or slice literal against `elem`;
    /// `length` bounds the indices of arrays.
    fn indexed_elems(&mut self, elems: &[CompositeLitElem], elem: TypeKey, length: Option<u64>) {
        let mut visited = HashSet::new();
        let mut index: u64 = 0;
        for el in elems {
            let mut valid_index = false;
            if let Some(key) = &el.key {
                if let (i, true) = self.index(key, length) {
                    match i {
                        Some(i) => {
                            index = i;
                            valid_index = true;
                        }
                        None => {
                            let msg = format!("index {} must be integer constant", self.expr_str(key));
                            self.error(TypeError::InvalidIndex, key.span, msg);
                        }
                    }
                }
            } else if length.map_or(false, |n| index >= n) {
                let msg = format!(
                    "index {} is out of bounds (>= {})",
                    index,
                    length.unwrap_or_default()
                );
                self.error(TypeError::InvalidIndex, el.span, msg);
            } else {
                valid_index = true;
            }

            if valid_index && !visited.insert(index) {
                let msg = format!("duplicate index {} in array or slice literal", index);
                self.error(TypeError::DuplicateLitKey, el.span, msg);
            }
            index += 1;

            let mut x = Operand::new();
            self.expr_with_hint(&mut x, &el.value, elem);
            self.assignment(&mut x, Some(elem), Some(&el.value), "array or slice literal");
        }
    }

    fn map_lit(&mut self, lit: &CompositeLit, key: TypeKey, elem: TypeKey) {
        // interface keys compare by dynamic type too
        let key_is_iface = typ::is_interface(key, self.tc_objs);
        let mut seen: Vec<(ConstValue, TypeKey)> = Vec::new();
        let mut x = Operand::new();
        for el in &lit.elems {
            let Some(k) = &el.key else {
                self.error(TypeError::InvalidLit, el.span, "missing key in map literal");
                continue;
            };
            self.expr_with_hint(&mut x, k, key);
            self.assignment(&mut x, Some(key), Some(k), "map literal");
            if let OperandMode::Constant(v) = &x.mode {
                let xt = x.typ.unwrap_or(key);
                let objs = &*self.tc_objs;
                let duplicate = seen
                    .iter()
                    .any(|(sv, st)| sv == v && (!key_is_iface || typ::identical(*st, xt, objs)));
                if duplicate {
                    let msg = format!("duplicate key {} in map literal", v);
                    self.error(TypeError::DuplicateLitKey, x.span, msg);
                    continue;
                }
                seen.push((v.clone(), xt));
            }
            self.expr_with_hint(&mut x, &el.value, elem);
            self.assignment(&mut x, Some(elem), Some(&el.value), "map literal");
        }
    }
}

/// Integer and rune values as exact rationals, for non-truncating division.
fn as_float(v: &ConstValue) -> ConstValue {
    match v {
        ConstValue::Int(_) | ConstValue::Rune(_) => v.to_rat().map_or_else(|| v.clone(), ConstValue::Float),
        _ => v.clone(),
    }
}
