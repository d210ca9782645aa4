//! Assignments, variable initialization and short variable declarations.

use typeattr_common::Span;
use typeattr_syntax::ast::{Expr, ExprKind, Ident};

use crate::errors::TypeError;
use crate::objects::{ObjKey, TypeKey};
use crate::operand::{Operand, OperandMode};
use crate::typ::{self, BasicType};

use super::call::Unpacked;
use super::checker::Checker;

impl<'a> Checker<'a> {
    // =========================================================================
    // Part 1: Single values
    // =========================================================================

    /// Checks that `x` can be assigned to a variable of type `t`, converting
    /// an untyped `x` first. `None` stands for the blank identifier. `x` is
    /// invalidated if the assignment fails.
    pub(crate) fn assignment(&mut self, x: &mut Operand, t: Option<TypeKey>, e: Option<&Expr>, context: &str) {
        self.single_value(x, e);
        match x.mode {
            OperandMode::Constant(_)
            | OperandMode::Variable
            | OperandMode::MapIndex
            | OperandMode::Value
            | OperandMode::CommaOk => {}
            // reported when the operand was checked
            _ => {
                x.mode = OperandMode::Invalid;
                return;
            }
        }

        let Some(xt) = x.typ else { return };
        if typ::is_untyped(xt, self.tc_objs) {
            let target = match t {
                Some(t) if !typ::is_interface(t, self.tc_objs) => t,
                _ => {
                    if t.is_none() && typ::basic_kind(xt, self.tc_objs) == Some(BasicType::UntypedNil) {
                        let msg = format!("use of untyped nil in {}", context);
                        self.error(TypeError::TypeMismatch, x.span, msg);
                        x.mode = OperandMode::Invalid;
                        return;
                    }
                    typ::untyped_default_type(xt, self.tc_objs)
                }
            };
            self.convert_untyped(x, target);
            if x.invalid() {
                return;
            }
        }

        // any typed value may be assigned to _
        let Some(t) = t else { return };

        let mut reason = String::new();
        if !self.assignable(x, t, Some(&mut reason)) {
            let mut msg = format!(
                "cannot use {} as {} value in {}",
                self.op_desc(x, e),
                self.type_str(t),
                context
            );
            if !reason.is_empty() {
                msg.push_str(": ");
                msg.push_str(&reason);
            }
            self.error(TypeError::TypeMismatch, x.span, msg);
            x.mode = OperandMode::Invalid;
        }
    }

    /// Initializes the constant `lhs` with `x`, the value of `e`.
    pub(crate) fn init_const(&mut self, lhs: ObjKey, x: &mut Operand, e: Option<&Expr>) {
        let invalid = self.invalid_type();
        let lhs_typ = self.tc_objs.lobjs[lhs].typ();
        if x.invalid() || x.typ == Some(invalid) || lhs_typ == Some(invalid) {
            if lhs_typ.is_none() {
                self.tc_objs.lobjs[lhs].set_type(Some(invalid));
            }
            return;
        }

        if !x.mode.is_constant() {
            let msg = format!("{} is not constant", self.op_desc(x, e));
            self.error(TypeError::NotConstant, x.span, msg);
            if lhs_typ.is_none() {
                self.tc_objs.lobjs[lhs].set_type(Some(invalid));
            }
            return;
        }

        if lhs_typ.is_none() {
            self.tc_objs.lobjs[lhs].set_type(x.typ);
        }
        let t = self.tc_objs.lobjs[lhs].typ();
        self.assignment(x, t, e, "constant declaration");
        if let OperandMode::Constant(v) = &x.mode {
            self.tc_objs.lobjs[lhs].set_const_val(v.clone());
        }
    }

    /// Initializes the variable `lhs` with `x`. A variable without a type
    /// takes the (default) type of `x`. Returns the type `x` was assigned
    /// with, or `None` on failure.
    pub(crate) fn init_var(
        &mut self,
        lhs: ObjKey,
        x: &mut Operand,
        e: Option<&Expr>,
        context: &str,
    ) -> Option<TypeKey> {
        let invalid = self.invalid_type();
        let lhs_typ = self.tc_objs.lobjs[lhs].typ();
        if x.invalid() || x.typ == Some(invalid) || lhs_typ == Some(invalid) {
            if lhs_typ.is_none() {
                self.tc_objs.lobjs[lhs].set_type(Some(invalid));
            }
            return None;
        }

        if lhs_typ.is_none() {
            let mut t = x.typ.unwrap_or(invalid);
            if typ::is_untyped(t, self.tc_objs) {
                if typ::basic_kind(t, self.tc_objs) == Some(BasicType::UntypedNil) {
                    let msg = format!("use of untyped nil in {}", context);
                    self.error(TypeError::TypeMismatch, x.span, msg);
                    self.tc_objs.lobjs[lhs].set_type(Some(invalid));
                    return None;
                }
                t = typ::untyped_default_type(t, self.tc_objs);
            }
            self.tc_objs.lobjs[lhs].set_type(Some(t));
        }

        let t = self.tc_objs.lobjs[lhs].typ();
        self.assignment(x, t, e, context);
        if x.invalid() {
            None
        } else {
            x.typ
        }
    }

    // =========================================================================
    // Part 2: Multiple values
    // =========================================================================

    /// Initializes `lhs` from `rhs`, either 1:1 or from a single
    /// multi-valued expression. `return_span` is set for the implicit
    /// assignment to the results of a function.
    pub(crate) fn init_vars(&mut self, lhs: &[ObjKey], rhs: &[Expr], return_span: Option<Span>) {
        let l = lhs.len();
        let unpacked = self.unpack(rhs, l == 2 && return_span.is_none());
        let r = unpacked.as_ref().map_or(0, Unpacked::len);

        let values = match unpacked {
            Some(values) if l == r => values,
            other => {
                let invalid = self.invalid_type();
                for &v in lhs {
                    if self.tc_objs.lobjs[v].typ().is_none() {
                        self.tc_objs.lobjs[v].set_type(Some(invalid));
                    }
                }
                // an invalid single value was reported by unpack
                let Some(values) = other else { return };
                values.use_all(self);
                match return_span {
                    Some(span) => {
                        let msg = format!("wrong number of return values (want {}, got {})", l, r);
                        self.error(TypeError::WrongResultCount, span, msg);
                    }
                    None => {
                        let msg = format!("cannot initialize {} variables with {} values", l, r);
                        let span = rhs.first().map_or_else(Span::dummy, |e| e.span);
                        self.error(TypeError::AssignCountMismatch, span, msg);
                    }
                }
                return;
            }
        };

        let context = if return_span.is_some() {
            "return statement"
        } else {
            "assignment"
        };
        let mut x = Operand::new();
        if values.is_comma_ok() {
            let mut a = [None; 2];
            for (i, slot) in a.iter_mut().enumerate() {
                values.get(self, &mut x, i);
                *slot = self.init_var(lhs[i], &mut x, None, context);
            }
            if let [Some(t0), Some(t1)] = a {
                self.record_comma_ok_types(&rhs[0], [t0, t1]);
            }
            return;
        }
        for (i, &v) in lhs.iter().enumerate() {
            values.get(self, &mut x, i);
            let e = match &values {
                Unpacked::Exprs(es) => es.get(i),
                _ => None,
            };
            self.init_var(v, &mut x, e, context);
        }
    }

    /// Assigns `x` to the variable, field, element or blank identifier
    /// denoted by `lhs`.
    pub(crate) fn assign_var(&mut self, lhs: &Expr, x: &mut Operand) -> Option<TypeKey> {
        let invalid = self.invalid_type();
        if x.invalid() || x.typ == Some(invalid) {
            return None;
        }

        if let Some(ident) = blank_ident(lhs, self) {
            self.record_def(ident, None);
            self.assignment(x, None, None, "assignment to _ identifier");
            return if x.invalid() { None } else { x.typ };
        }

        let mut z = Operand::new();
        self.expr(&mut z, lhs);
        if z.invalid() || z.typ == Some(invalid) {
            return None;
        }

        match z.mode {
            OperandMode::Variable | OperandMode::MapIndex => {}
            _ => {
                let in_map = match &lhs.unparen().kind {
                    ExprKind::Selector(sel) => self
                        .result
                        .types
                        .get(&sel.expr.id)
                        .map_or(false, |tv| tv.mode == OperandMode::MapIndex),
                    _ => false,
                };
                let msg = if in_map {
                    format!("cannot assign to struct field {} in map", self.expr_str(lhs))
                } else {
                    format!("cannot assign to {}", self.op_str(&z, lhs))
                };
                self.error(TypeError::UnassignableOperand, z.span, msg);
                return None;
            }
        }

        let zt = z.typ;
        self.assignment(x, zt, None, "assignment");
        if x.invalid() {
            None
        } else {
            x.typ
        }
    }

    /// Checks `lhs = rhs` with `=`.
    pub(crate) fn assign_vars(&mut self, lhs: &[Expr], rhs: &[Expr]) {
        let l = lhs.len();
        let Some(values) = self.unpack(rhs, l == 2) else {
            self.use_lhs(lhs);
            return;
        };
        let r = values.len();
        if l != r {
            values.use_all(self);
            self.use_lhs(lhs);
            let msg = format!("cannot assign {} values to {} variables", r, l);
            let span = rhs.first().map_or_else(Span::dummy, |e| e.span);
            self.error(TypeError::AssignCountMismatch, span, msg);
            return;
        }

        let mut x = Operand::new();
        if values.is_comma_ok() {
            let mut a = [None; 2];
            for (i, slot) in a.iter_mut().enumerate() {
                values.get(self, &mut x, i);
                *slot = self.assign_var(&lhs[i], &mut x);
            }
            if let [Some(t0), Some(t1)] = a {
                self.record_comma_ok_types(&rhs[0], [t0, t1]);
            }
            return;
        }
        for (i, e) in lhs.iter().enumerate() {
            values.get(self, &mut x, i);
            self.assign_var(e, &mut x);
        }
    }

    /// Checks the left-hand sides of a failed assignment, skipping blank
    /// identifiers.
    fn use_lhs(&mut self, lhs: &[Expr]) {
        for e in lhs {
            if let Some(ident) = blank_ident(e, self) {
                self.record_def(ident, None);
                continue;
            }
            let mut x = Operand::new();
            self.raw_expr(&mut x, e, None);
        }
    }

    // =========================================================================
    // Part 3: Short variable declarations
    // =========================================================================

    /// Checks `names := values`. Names already declared in the current scope
    /// are assigned to; at least one name must be new. The new names are
    /// visible from the end of the statement.
    pub(crate) fn short_var_decl(&mut self, span: Span, names: &[Ident], values: &[Expr]) {
        let scope = self.scope_key();
        let pkg = Some(self.pkg);
        let top = self.delayed.len();

        let mut seen: Vec<&str> = Vec::with_capacity(names.len());
        let mut new_vars = Vec::new();
        let mut lhs = Vec::with_capacity(names.len());
        for ident in names {
            let name = self.ident_name(ident);
            if name != "_" {
                if seen.contains(&name) {
                    let msg = format!("{} repeated on left side of :=", name);
                    self.error(TypeError::Redeclared, ident.span, msg);
                    lhs.push(self.tc_objs.new_var(ident.span.start, pkg, "_".to_string(), None));
                    continue;
                }
                seen.push(name);
            }

            // redeclared names reuse their variable
            if let Some(alt) = self.tc_objs.scopes[scope].lookup(name) {
                self.record_use(ident, alt);
                if self.tc_objs.lobjs[alt].entity_type().is_var() {
                    lhs.push(alt);
                } else {
                    let msg = format!("cannot assign to {}", name);
                    self.error(TypeError::UnassignableOperand, ident.span, msg);
                    lhs.push(self.tc_objs.new_var(ident.span.start, pkg, "_".to_string(), None));
                }
                continue;
            }

            let okey = self.tc_objs.new_var(ident.span.start, pkg, name.to_string(), None);
            if name != "_" {
                new_vars.push(okey);
            }
            self.record_def(ident, Some(okey));
            lhs.push(okey);
        }

        self.init_vars(&lhs, values, None);

        // function literals on the right see the scope without the new names
        self.process_delayed(top);

        if new_vars.is_empty() {
            self.soft_error(TypeError::NoNewVariables, span, "no new variables on left side of :=");
            return;
        }
        let scope_pos = values.last().map_or(span.end, |e| e.span.end);
        for okey in new_vars {
            self.declare(scope, None, okey, scope_pos);
        }
    }
}

/// The blank identifier `lhs` denotes, looking through parentheses.
fn blank_ident<'e>(lhs: &'e Expr, checker: &Checker<'_>) -> Option<&'e Ident> {
    match &lhs.unparen().kind {
        ExprKind::Ident(ident) if checker.ident_name(ident) == "_" => Some(ident),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::objects::TCObjects;
    use crate::scope::{Scope, ScopeKind};

    use super::*;

    #[test]
    fn test_scope_lookup_is_local() {
        let mut objs = TCObjects::new();
        let outer = objs.new_scope(None, ScopeKind::Block, 0, 100);
        let inner = objs.new_scope(Some(outer), ScopeKind::Block, 10, 20);
        let v = objs.new_var(1, None, "v".to_string(), None);
        assert!(Scope::insert(outer, v, &mut objs).is_none());
        assert_eq!(objs.scopes[inner].lookup("v"), None);
        assert_eq!(objs.scopes[outer].lookup("v"), Some(v));
    }
}
