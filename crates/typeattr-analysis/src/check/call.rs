//! Calls, argument passing and selector expressions.

use std::collections::HashSet;

use tracing::trace;
use typeattr_common::Span;
use typeattr_syntax::ast::{CallExpr, Expr, ExprKind, NodeId, SelectorExpr};

use crate::errors::TypeError;
use crate::lookup::{self, LookupResult};
use crate::objects::TypeKey;
use crate::operand::{Operand, OperandMode};
use crate::selection::SelectionKind;
use crate::typ::{self, BasicType, Type};

use super::checker::Checker;
use super::expr::ExprClass;

/// The values on the right of an assignment or in an argument list, after
/// a single multi-valued expression has been spread out.
pub(crate) enum Unpacked<'e> {
    /// Results of a call returning several values.
    Tuple {
        expr: Option<NodeId>,
        span: Span,
        types: Vec<TypeKey>,
    },
    /// A comma-ok expression providing a value and an untyped bool.
    CommaOk {
        expr: Option<NodeId>,
        span: Span,
        types: [TypeKey; 2],
    },
    /// One already checked value.
    Single(Operand),
    /// Zero or several expressions, checked on demand.
    Exprs(&'e [Expr]),
}

impl<'e> Unpacked<'e> {
    pub(crate) fn len(&self) -> usize {
        match self {
            Unpacked::Tuple { types, .. } => types.len(),
            Unpacked::CommaOk { .. } => 2,
            Unpacked::Single(_) => 1,
            Unpacked::Exprs(es) => es.len(),
        }
    }

    pub(crate) fn is_comma_ok(&self) -> bool {
        matches!(self, Unpacked::CommaOk { .. })
    }

    /// Loads the `i`th value into `x`.
    pub(crate) fn get(&self, checker: &mut Checker<'_>, x: &mut Operand, i: usize) {
        match self {
            Unpacked::Tuple { expr, span, types } => {
                *x = Operand::with_type(OperandMode::Value, types[i], *span);
                x.expr = *expr;
            }
            Unpacked::CommaOk { expr, span, types } => {
                *x = Operand::with_type(OperandMode::Value, types[i], *span);
                x.expr = *expr;
            }
            Unpacked::Single(x0) => *x = x0.clone(),
            Unpacked::Exprs(es) => checker.multi_expr(x, &es[i]),
        }
    }

    /// Checks whatever has not been looked at, after an error.
    pub(crate) fn use_all(&self, checker: &mut Checker<'_>) {
        if let Unpacked::Exprs(es) = self {
            checker.use_exprs(es.iter());
        }
    }
}

impl<'a> Checker<'a> {
    // =========================================================================
    // Part 1: Calls
    // =========================================================================

    /// Spreads a single tuple-valued or comma-ok expression into its values.
    /// Returns `None` if that expression is invalid.
    pub(crate) fn unpack<'e>(&mut self, es: &'e [Expr], allow_comma_ok: bool) -> Option<Unpacked<'e>> {
        let [e0] = es else {
            return Some(Unpacked::Exprs(es));
        };
        let mut x0 = Operand::new();
        self.multi_expr(&mut x0, e0);
        if x0.invalid() {
            return None;
        }
        let t = x0.typ.unwrap_or_else(|| self.invalid_type());
        if let Some(tuple) = self.tc_objs.types[t].try_as_tuple() {
            let invalid = self.invalid_type();
            let types = tuple
                .vars()
                .iter()
                .map(|&v| self.tc_objs.lobjs[v].typ().unwrap_or(invalid))
                .collect();
            return Some(Unpacked::Tuple {
                expr: x0.expr,
                span: x0.span,
                types,
            });
        }
        if matches!(x0.mode, OperandMode::MapIndex | OperandMode::CommaOk) {
            if allow_comma_ok {
                return Some(Unpacked::CommaOk {
                    expr: x0.expr,
                    span: x0.span,
                    types: [t, self.basic_type(BasicType::UntypedBool)],
                });
            }
            x0.mode = OperandMode::Value;
        }
        Some(Unpacked::Single(x0))
    }

    /// Checks a call, conversion or built-in call.
    pub(crate) fn call(&mut self, x: &mut Operand, e: &Expr, call: &CallExpr) -> ExprClass {
        self.expr_or_type(x, &call.func);

        match x.mode.clone() {
            OperandMode::Invalid => {
                self.use_exprs(call.args.iter());
                x.mode = OperandMode::Invalid;
                ExprClass::Statement
            }
            OperandMode::TypeExpr => {
                let t = x.typ.unwrap_or_else(|| self.invalid_type());
                x.mode = OperandMode::Invalid;
                match call.args.as_slice() {
                    [] => {
                        let msg = format!("missing argument in conversion to {}", self.type_str(t));
                        self.error(TypeError::WrongArgCount, Span::point(e.span.end), msg);
                    }
                    [arg] => {
                        self.expr(x, arg);
                        if !x.invalid() {
                            self.conversion(x, t, arg);
                        }
                    }
                    [.., last] => {
                        self.use_exprs(call.args.iter());
                        let msg = format!("too many arguments in conversion to {}", self.type_str(t));
                        self.error(TypeError::WrongArgCount, last.span, msg);
                        x.mode = OperandMode::Invalid;
                    }
                }
                ExprClass::Conversion
            }
            OperandMode::Builtin(id) => {
                if !self.builtin(x, call, id) {
                    x.mode = OperandMode::Invalid;
                }
                // a non-constant result implies a function call
                if !x.invalid() && !x.mode.is_constant() {
                    self.octx.has_call_or_recv = true;
                }
                if id.is_statement() {
                    ExprClass::Statement
                } else {
                    ExprClass::Expression
                }
            }
            _ => {
                let ft = x.typ.unwrap_or_else(|| self.invalid_type());
                let ut = typ::underlying_type(ft, self.tc_objs);
                let Some(sig) = self.tc_objs.types[ut].try_as_signature().copied() else {
                    let msg = format!("invalid operation: cannot call non-function {}", self.op_str(x, &call.func));
                    self.error(TypeError::NotCallable, x.span, msg);
                    self.use_exprs(call.args.iter());
                    x.mode = OperandMode::Invalid;
                    return ExprClass::Statement;
                };

                match self.unpack(&call.args, false) {
                    Some(args) => self.arguments(x, e, call, ut, &args),
                    None => x.mode = OperandMode::Invalid,
                }

                self.octx.has_call_or_recv = true;

                // the results decide the mode
                let results = sig.result_vars(self.tc_objs);
                match results {
                    [] => x.mode = OperandMode::NoValue,
                    [r] => {
                        x.mode = OperandMode::Value;
                        x.typ = self.tc_objs.lobjs[*r].typ();
                    }
                    _ => {
                        x.mode = OperandMode::Value;
                        x.typ = Some(sig.results());
                    }
                }
                ExprClass::Statement
            }
        }
    }

    /// Checks the arguments of a call of a function with signature `sig`.
    fn arguments(&mut self, x: &mut Operand, e: &Expr, call: &CallExpr, sig: TypeKey, args: &Unpacked<'_>) {
        let Some(detail) = self.tc_objs.types[sig].try_as_signature().copied() else {
            return;
        };
        let n = args.len();
        if call.spread {
            if !detail.variadic() {
                let msg = format!(
                    "cannot use ... in call to non-variadic {}",
                    self.expr_str(&call.func)
                );
                self.error(TypeError::InvalidOp, e.span, msg);
                args.use_all(self);
                return;
            }
            if call.args.len() == 1 && n > 1 {
                let msg = format!("cannot use ... with {}-valued {}", n, self.expr_str(&call.args[0]));
                self.error(TypeError::InvalidOp, call.args[0].span, msg);
                args.use_all(self);
                return;
            }
        }

        let context = format!("argument to {}", self.expr_str(&call.func));
        for i in 0..n {
            args.get(self, x, i);
            if !x.invalid() {
                let spread = call.spread && i == n - 1;
                let arg = match args {
                    Unpacked::Exprs(es) => es.get(i),
                    _ => call.args.first(),
                };
                self.argument(sig, i, x, arg, spread, &context);
            }
        }

        // a variadic function accepts an empty final argument
        let supplied = if detail.variadic() { n + 1 } else { n };
        if supplied < detail.param_vars(self.tc_objs).len() {
            let msg = format!("not enough arguments in call to {}", self.expr_str(&call.func));
            self.error(TypeError::WrongArgCount, Span::point(e.span.end), msg);
        }
    }

    /// Checks passing `x` as the `i`th argument.
    pub(crate) fn argument(
        &mut self,
        sig: TypeKey,
        i: usize,
        x: &mut Operand,
        arg: Option<&Expr>,
        spread: bool,
        context: &str,
    ) {
        self.single_value(x, arg);
        if x.invalid() {
            return;
        }
        let Some(detail) = self.tc_objs.types[sig].try_as_signature().copied() else {
            return;
        };
        let params = detail.param_vars(self.tc_objs);
        let n = params.len();
        let invalid = self.invalid_type();
        let mut t = if i < n {
            self.tc_objs.lobjs[params[i]].typ().unwrap_or(invalid)
        } else if detail.variadic() {
            self.tc_objs.lobjs[params[n - 1]].typ().unwrap_or(invalid)
        } else {
            self.error(TypeError::WrongArgCount, x.span, "too many arguments");
            return;
        };

        if spread {
            if i + 1 != n {
                self.error(TypeError::InvalidOp, x.span, "can only use ... with final parameter in list");
                return;
            }
            let xt = x.typ.unwrap_or(invalid);
            let is_slice = self.tc_objs.types[typ::underlying_type(xt, self.tc_objs)]
                .try_as_slice()
                .is_some();
            if !is_slice && typ::basic_kind(xt, self.tc_objs) != Some(BasicType::UntypedNil) {
                let msg = format!(
                    "cannot use {} as parameter of type {}",
                    self.op_desc(x, arg),
                    self.type_str(t)
                );
                self.error(TypeError::TypeMismatch, x.span, msg);
                return;
            }
        } else if detail.variadic() && i + 1 >= n {
            // the variadic parameter is a slice; arguments fill its elements
            if let Some(s) = self.tc_objs.types[t].try_as_slice() {
                t = s.elem();
            }
        }
        self.assignment(x, Some(t), arg, context);
    }

    // =========================================================================
    // Part 2: Selectors
    // =========================================================================

    /// Checks `x.f`: a qualified identifier, a field or method value, or a
    /// method expression.
    pub(crate) fn selector(&mut self, x: &mut Operand, e: &Expr, sel: &SelectorExpr) {
        if let ExprKind::Ident(pkg) = &sel.expr.kind {
            if self.qualified_ident(x, pkg, &sel.sel) {
                return;
            }
        }

        self.expr_or_type(x, &sel.expr);
        if x.invalid() {
            return;
        }
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        let name = self.ident_name(&sel.sel);
        let found = lookup::lookup_field_or_method(
            xt,
            x.mode == OperandMode::Variable,
            Some(self.pkg),
            name,
            self.tc_objs,
        );

        let (obj, indices, indirect) = match found {
            LookupResult::Entry(obj, indices, indirect) => (obj, indices, indirect),
            LookupResult::Ambiguous(_) => {
                let msg = format!("ambiguous selector {}.{}", self.expr_str(&sel.expr), name);
                self.error(TypeError::AmbiguousSelector, sel.sel.span, msg);
                x.mode = OperandMode::Invalid;
                return;
            }
            LookupResult::BadMethodReceiver => {
                let msg = if x.mode == OperandMode::TypeExpr {
                    format!(
                        "invalid method expression {}.{} (needs pointer receiver: (*{}).{})",
                        self.expr_str(&sel.expr),
                        name,
                        self.type_str(xt),
                        name
                    )
                } else {
                    format!("{} is not in method set of {}", name, self.type_str(xt))
                };
                self.error(TypeError::InvalidMethodExpr, sel.sel.span, msg);
                x.mode = OperandMode::Invalid;
                return;
            }
            LookupResult::NotFound => {
                if !typ::is_invalid(typ::underlying_type(xt, self.tc_objs), self.tc_objs) {
                    let what = if x.mode == OperandMode::TypeExpr {
                        format!("type {} has no method {}", self.type_str(xt), name)
                    } else {
                        format!("type {} has no field or method {}", self.type_str(xt), name)
                    };
                    let msg = format!("{}.{} undefined ({})", self.expr_str(&sel.expr), name, what);
                    self.error(TypeError::UnresolvedSelector, sel.sel.span, msg);
                }
                x.mode = OperandMode::Invalid;
                return;
            }
        };

        // methods may not have their signature yet
        let is_method = self.tc_objs.lobjs[obj].entity_type().is_func();
        if is_method && self.tc_objs.lobjs[obj].typ().is_none() {
            self.obj_decl(obj);
        }

        let kind = if x.mode == OperandMode::TypeExpr {
            if !is_method {
                let msg = format!(
                    "{}.{} undefined (type {} has no method {})",
                    self.expr_str(&sel.expr),
                    name,
                    self.type_str(xt),
                    name
                );
                self.error(TypeError::UnresolvedSelector, sel.sel.span, msg);
                x.mode = OperandMode::Invalid;
                return;
            }
            SelectionKind::MethodExpr
        } else if is_method {
            SelectionKind::MethodVal
        } else {
            SelectionKind::FieldVal
        };

        trace!(selector = name, kind = ?kind, "resolved selector");
        self.record_selection(e.id, kind, xt, obj, indices, indirect);
        let sel_type = self
            .result
            .selections
            .get(&e.id)
            .map_or(invalid, |s| s.typ());

        match kind {
            SelectionKind::FieldVal => {
                x.mode = if x.mode == OperandMode::Variable || indirect {
                    OperandMode::Variable
                } else {
                    OperandMode::Value
                };
            }
            SelectionKind::MethodVal | SelectionKind::MethodExpr => {
                x.mode = OperandMode::Value;
                self.add_decl_dep(obj);
            }
        }
        x.typ = Some(sel_type);
    }

    /// Gives every method reachable from `t` its signature, so method sets
    /// can be compared.
    pub(crate) fn complete_methods(&mut self, t: TypeKey) {
        let mut seen = HashSet::new();
        self.complete_methods_of(t, &mut seen);
    }

    fn complete_methods_of(&mut self, t: TypeKey, seen: &mut HashSet<TypeKey>) {
        let t = lookup::try_deref(t, self.tc_objs).0;
        if !seen.insert(t) {
            return;
        }
        let (methods, under) = match &self.tc_objs.types[t] {
            Type::Named(n) => (n.methods().clone(), n.try_underlying()),
            _ => (Vec::new(), Some(t)),
        };
        for m in methods {
            if self.tc_objs.lobjs[m].typ().is_none() {
                self.obj_decl(m);
            }
        }
        let Some(under) = under else { return };
        let embedded: Vec<TypeKey> = match self.tc_objs.types[under].try_as_struct() {
            Some(s) => s
                .fields()
                .iter()
                .map(|&f| &self.tc_objs.lobjs[f])
                .filter(|f| f.var_embedded())
                .filter_map(|f| f.typ())
                .collect(),
            None => return,
        };
        for et in embedded {
            self.complete_methods_of(et, seen);
        }
    }

    /// Reports whether `x` can be assigned to `t`, completing the method
    /// sets that decide interface satisfaction first.
    pub(crate) fn assignable(&mut self, x: &Operand, t: TypeKey, reason: Option<&mut String>) -> bool {
        if typ::is_interface(t, self.tc_objs) {
            if let Some(xt) = x.typ {
                self.complete_methods(xt);
            }
        }
        x.assignable_to(t, reason, self.tc_objs, self.config.word_size)
    }
}
