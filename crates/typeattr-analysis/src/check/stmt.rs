//! Statements and function bodies.
//!
//! Statements are checked in order, so a local name is visible only to the
//! statements after its declaration. Every construct that may declare names
//! opens a scope, recorded under the construct's node, whether or not
//! anything is declared in it.

use tracing::trace;
use typeattr_common::Span;
use typeattr_syntax::ast::{
    AssignStmt, BinaryOp, Block, CommStmt, Expr, ExprKind, ForClause, ForStmt, Ident, IfStmt, IncDecStmt,
    RecvStmt, ReturnStmt, SelectStmt, SendStmt, Stmt, StmtKind, SwitchStmt, TypeSwitchStmt,
};

use crate::errors::TypeError;
use crate::obj::ConstValue;
use crate::objects::{DeclInfoKey, ObjKey, TypeKey};
use crate::operand::{Operand, OperandMode};
use crate::scope::ScopeKind;
use crate::typ::{self, BasicType, ChanDir, Type};

use super::checker::{Checker, ObjContext};
use super::expr::ExprClass;

impl<'a> Checker<'a> {
    // =========================================================================
    // Part 1: Function bodies
    // =========================================================================

    /// Checks the body of a function with signature `sig`. The top-level
    /// statements of the body share the signature's scope. `decl` is the
    /// package-level declaration collecting the body's dependencies.
    pub(crate) fn func_body(&mut self, decl: Option<DeclInfoKey>, name: &str, sig: TypeKey, body: &Block) {
        trace!(func = name, "checking body");
        let Some(detail) = self.tc_objs.types[sig].try_as_signature().copied() else {
            return;
        };
        let saved = std::mem::replace(
            &mut self.octx,
            ObjContext {
                decl,
                scope: detail.scope(),
                sig: Some(sig),
                ..ObjContext::default()
            },
        );

        self.stmt_list(&body.stmts);
        self.octx = saved;
    }

    fn stmt_list(&mut self, list: &[Stmt]) {
        for s in list {
            self.stmt(s);
        }
    }

    fn simple_stmt(&mut self, s: Option<&Stmt>) {
        if let Some(s) = s {
            self.stmt(s);
        }
    }

    fn block(&mut self, b: &Block) {
        self.open_scope(b.id, ScopeKind::Block, b.span);
        self.stmt_list(&b.stmts);
        self.close_scope();
    }

    // =========================================================================
    // Part 2: Simple statements
    // =========================================================================

    fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::Empty => {}
            StmtKind::Block(b) => self.block(b),
            StmtKind::Var(d) => self.local_var_decl(d),
            StmtKind::Const(d) => self.local_const_decl(d),
            StmtKind::Type(d) => self.local_type_decl(d),
            StmtKind::ShortVar(d) => self.short_var_decl(s.span, &d.names, &d.values),
            StmtKind::Expr(e) => self.expr_stmt(e),
            StmtKind::Assign(a) => self.assign_stmt(s, a),
            StmtKind::IncDec(d) => self.inc_dec_stmt(d),
            StmtKind::Return(r) => self.return_stmt(s, r),
            StmtKind::Send(ss) => self.send_stmt(ss),
            StmtKind::Go(call) => self.suspended_call("go", call),
            StmtKind::Defer(call) => self.suspended_call("defer", call),
            StmtKind::If(ifs) => self.if_stmt(s, ifs),
            StmtKind::For(fs) => self.for_stmt(s, fs),
            StmtKind::Switch(sw) => self.switch_stmt(s, sw),
            StmtKind::TypeSwitch(ts) => self.type_switch_stmt(s, ts),
            StmtKind::Select(sel) => self.select_stmt(sel),
            StmtKind::Labeled(l) => self.stmt(&l.stmt),
            // branches carry no attributes
            StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Goto(_) | StmtKind::Fallthrough => {}
        }
    }

    fn expr_stmt(&mut self, e: &Expr) {
        let mut x = Operand::new();
        let class = self.raw_expr(&mut x, e, None);
        let (code, what) = match x.mode {
            OperandMode::Invalid => return,
            OperandMode::Builtin(_) => (TypeError::NotCallable, "must be called"),
            OperandMode::TypeExpr => (TypeError::NotAnExpr, "is not an expression"),
            _ if class == ExprClass::Statement => return,
            _ => (TypeError::UnusedExpr, "is not used"),
        };
        let msg = format!("{} {}", self.op_str(&x, e), what);
        self.error(code, x.span, msg);
    }

    fn assign_stmt(&mut self, s: &Stmt, a: &AssignStmt) {
        let Some(op) = a.op.binary_op() else {
            if a.lhs.is_empty() {
                self.error(TypeError::AssignCountMismatch, s.span, "missing lhs in assignment");
                return;
            }
            self.assign_vars(&a.lhs, &a.rhs);
            return;
        };

        let ([lhs], [rhs]) = (a.lhs.as_slice(), a.rhs.as_slice()) else {
            let msg = format!(
                "assignment operation {}= requires single-valued expressions",
                op.as_str()
            );
            self.error(TypeError::AssignCountMismatch, s.span, msg);
            return;
        };
        let mut x = Operand::new();
        if self.binary(&mut x, None, lhs, rhs, op) {
            self.assign_var(lhs, &mut x);
        }
    }

    fn inc_dec_stmt(&mut self, d: &IncDecStmt) {
        let mut x = Operand::new();
        self.expr(&mut x, &d.expr);
        if x.invalid() {
            return;
        }
        let invalid = self.invalid_type();
        let xt = x.typ.unwrap_or(invalid);
        if !typ::is_numeric(xt, self.tc_objs) {
            let msg = format!(
                "invalid operation: {}{} (non-numeric type {})",
                self.expr_str(&d.expr),
                if d.is_inc { "++" } else { "--" },
                self.type_str(xt)
            );
            self.error(TypeError::InvalidOp, x.span, msg);
            return;
        }
        // x++ assigns a value of x's own type
        x.mode = OperandMode::Value;
        self.assign_var(&d.expr, &mut x);
    }

    fn return_stmt(&mut self, s: &Stmt, r: &ReturnStmt) {
        let Some(sig) = self.octx.sig else {
            self.use_exprs(r.values.iter());
            return;
        };
        let results: Vec<ObjKey> = match self.tc_objs.types[sig].try_as_signature() {
            Some(detail) => detail.result_vars(self.tc_objs).to_vec(),
            None => Vec::new(),
        };

        if results.is_empty() {
            if let Some(first) = r.values.first() {
                self.error(TypeError::WrongResultCount, first.span, "no result values expected");
                self.use_exprs(r.values.iter());
            }
            return;
        }

        let named = !self.tc_objs.lobjs[results[0]].name().is_empty();
        if r.values.is_empty() && named {
            // a bare return needs the result parameters in scope
            for &v in &results {
                let name = self.tc_objs.lobjs[v].name().to_string();
                match self.lookup(&name) {
                    Some(alt) if alt != v => {
                        let msg = format!("result parameter {} not in scope at return", name);
                        self.error(TypeError::WrongResultCount, s.span, msg);
                    }
                    _ => {}
                }
            }
            return;
        }
        self.init_vars(&results, &r.values, Some(s.span));
    }

    fn send_stmt(&mut self, ss: &SendStmt) {
        let mut ch = Operand::new();
        let mut x = Operand::new();
        self.expr(&mut ch, &ss.chan);
        self.expr(&mut x, &ss.value);
        if ch.invalid() || x.invalid() {
            return;
        }
        let invalid = self.invalid_type();
        let cht = ch.typ.unwrap_or(invalid);
        let chan = self.tc_objs.types[typ::underlying_type(cht, self.tc_objs)]
            .try_as_chan()
            .map(|c| (c.dir(), c.elem()));
        match chan {
            None => {
                let msg = format!("invalid operation: cannot send to non-chan type {}", self.type_str(cht));
                self.error(TypeError::InvalidSend, ch.span, msg);
            }
            Some((ChanDir::RecvOnly, _)) => {
                let msg = format!(
                    "invalid operation: cannot send to non-send channel {}",
                    self.op_str(&ch, &ss.chan)
                );
                self.error(TypeError::InvalidSend, ch.span, msg);
            }
            Some((_, elem)) => self.assignment(&mut x, Some(elem), Some(&ss.value), "send"),
        }
    }

    /// Checks the call of a `go` or `defer` statement.
    fn suspended_call(&mut self, keyword: &str, call: &Expr) {
        let mut x = Operand::new();
        let what = match self.raw_expr(&mut x, call, None) {
            ExprClass::Conversion => "requires function call, not conversion",
            ExprClass::Expression => "discards result of",
            ExprClass::Statement => return,
        };
        let msg = format!("{} {} {}", keyword, what, self.op_str(&x, call));
        self.error(TypeError::UnusedExpr, x.span, msg);
    }

    // =========================================================================
    // Part 3: Conditionals and loops
    // =========================================================================

    fn condition(&mut self, cond: &Expr, stmt: &str) {
        let mut x = Operand::new();
        self.expr(&mut x, cond);
        if x.invalid() {
            return;
        }
        if !x.typ.map_or(false, |t| typ::is_boolean(t, self.tc_objs)) {
            let msg = format!("non-boolean condition in {} statement", stmt);
            self.error(TypeError::InvalidCond, cond.span, msg);
        }
    }

    fn if_stmt(&mut self, s: &Stmt, ifs: &IfStmt) {
        self.open_scope(s.id, ScopeKind::If, s.span);
        self.simple_stmt(ifs.init.as_deref());
        self.condition(&ifs.cond, "if");
        self.block(&ifs.then);
        if let Some(else_) = &ifs.else_ {
            self.stmt(else_);
        }
        self.close_scope();
    }

    fn for_stmt(&mut self, s: &Stmt, fs: &ForStmt) {
        match &fs.clause {
            ForClause::Three { init, cond, post } => {
                self.open_scope(s.id, ScopeKind::For, s.span);
                self.simple_stmt(init.as_deref());
                if let Some(cond) = cond {
                    self.condition(cond, "for");
                }
                self.simple_stmt(post.as_deref());
                if let Some(post) = post {
                    if matches!(post.kind, StmtKind::ShortVar(_)) {
                        self.soft_error(TypeError::NoNewVariables, post.span, "cannot declare in post statement");
                    }
                }
            }
            ForClause::Range {
                key,
                value,
                define,
                expr,
            } => {
                self.open_scope(s.id, ScopeKind::Range, s.span);
                self.range_clause(key.as_ref(), value.as_ref(), *define, expr);
            }
        }
        self.block(&fs.body);
        self.close_scope();
    }

    fn range_clause(&mut self, key: Option<&Expr>, value: Option<&Expr>, define: bool, expr: &Expr) {
        let mut x = Operand::new();
        self.expr(&mut x, expr);

        let mut types: (Option<TypeKey>, Option<TypeKey>) = (None, None);
        if !x.invalid() {
            let invalid = self.invalid_type();
            let xt = x.typ.unwrap_or(invalid);
            let ut = typ::underlying_type(xt, self.tc_objs);
            match self.tc_objs.types[ut].try_as_chan().map(|c| (c.dir(), c.elem())) {
                Some((dir, elem)) => {
                    types = (Some(elem), None);
                    if dir == ChanDir::SendOnly {
                        let msg = format!("cannot range over send-only channel {}", self.op_str(&x, expr));
                        self.error(TypeError::InvalidRangeExpr, x.span, msg);
                    }
                    if let Some(v) = value {
                        let msg = format!(
                            "range over {} permits only one iteration variable",
                            self.op_str(&x, expr)
                        );
                        self.soft_error(TypeError::InvalidRangeExpr, v.span, msg);
                    }
                }
                None => {
                    let (k, v) = self.range_key_val(ut);
                    types = (k, v);
                }
            }
        }
        if types.0.is_none() && !x.invalid() {
            let msg = format!("cannot range over {}", self.op_str(&x, expr));
            self.error(TypeError::InvalidRangeExpr, x.span, msg);
        }

        let lhs = [key, value];
        let rhs = [types.0, types.1];
        if !define {
            for (e, t) in lhs.into_iter().zip(rhs) {
                if let (Some(e), Some(t)) = (e, t) {
                    let mut y = Operand::with_type(OperandMode::Value, t, e.span);
                    self.assign_var(e, &mut y);
                }
            }
            return;
        }

        let pkg = Some(self.pkg);
        let invalid = self.invalid_type();
        let mut new_vars = Vec::new();
        for (e, t) in lhs.into_iter().zip(rhs) {
            let Some(e) = e else { continue };
            let okey = match &e.kind {
                ExprKind::Ident(ident) => {
                    let name = self.ident_name(ident);
                    let okey = self.tc_objs.new_var(ident.span.start, pkg, name.to_string(), None);
                    self.record_def(ident, Some(okey));
                    if name != "_" {
                        new_vars.push(okey);
                    }
                    okey
                }
                _ => {
                    let msg = format!("cannot declare {}", self.expr_str(e));
                    self.error(TypeError::UnassignableOperand, e.span, msg);
                    self.tc_objs.new_var(e.span.start, pkg, "_".to_string(), None)
                }
            };
            match t {
                Some(t) => {
                    let mut y = Operand::with_type(OperandMode::Value, t, e.span);
                    self.init_var(okey, &mut y, None, "range clause");
                }
                None => self.tc_objs.lobjs[okey].set_type(Some(invalid)),
            }
        }

        if new_vars.is_empty() {
            self.error(TypeError::NoNewVariables, expr.span, "no new variables on left side of :=");
            return;
        }
        let scope = self.scope_key();
        for okey in new_vars {
            self.declare(scope, None, okey, expr.span.end);
        }
    }

    /// Iteration variable types for ranging over the underlying type `ut`.
    fn range_key_val(&self, ut: TypeKey) -> (Option<TypeKey>, Option<TypeKey>) {
        let objs = &*self.tc_objs;
        let int = self.basic_type(BasicType::Int);
        match &objs.types[ut] {
            Type::Basic(_) if typ::is_string(ut, objs) => (Some(int), Some(objs.universe().rune())),
            Type::Array(a) => (Some(int), Some(a.elem())),
            Type::Slice(s) => (Some(int), Some(s.elem())),
            Type::Map(m) => (Some(m.key()), Some(m.elem())),
            Type::Pointer(p) => {
                let base = typ::underlying_type(p.base(), objs);
                match objs.types[base].try_as_array() {
                    Some(a) => (Some(int), Some(a.elem())),
                    None => (None, None),
                }
            }
            _ => (None, None),
        }
    }

    // =========================================================================
    // Part 4: Switch and select
    // =========================================================================

    /// Reports every default clause after the first.
    fn multiple_defaults(&mut self, defaults: impl IntoIterator<Item = Span>) {
        let mut first: Option<Span> = None;
        for span in defaults {
            match first {
                None => first = Some(span),
                Some(f) => {
                    let msg = format!("multiple defaults (first at {})", f.start);
                    self.error(TypeError::DuplicateDefault, span, msg);
                }
            }
        }
    }

    fn switch_stmt(&mut self, s: &Stmt, sw: &SwitchStmt) {
        self.open_scope(s.id, ScopeKind::Switch, s.span);
        self.simple_stmt(sw.init.as_deref());

        let mut x = Operand::new();
        match &sw.tag {
            Some(tag) => {
                self.expr(&mut x, tag);
                // as if assigned to a hidden temporary
                self.assignment(&mut x, None, Some(tag), "switch expression");
            }
            None => {
                let t = self.basic_type(BasicType::Bool);
                x = Operand::with_type(OperandMode::Constant(ConstValue::Bool(true)), t, Span::point(s.span.start));
            }
        }

        self.multiple_defaults(sw.cases.iter().filter(|c| c.exprs.is_empty()).map(|c| c.span));
        let mut seen: Vec<(ConstValue, TypeKey, Span)> = Vec::new();
        for clause in &sw.cases {
            self.case_values(&x, sw.tag.as_ref(), &clause.exprs, &mut seen);
            self.open_scope(clause.id, ScopeKind::Case, clause.span);
            self.stmt_list(&clause.body);
            self.close_scope();
        }
        self.close_scope();
    }

    /// Checks the values of one case clause against the switch tag `x`.
    fn case_values(
        &mut self,
        x: &Operand,
        tag: Option<&Expr>,
        values: &[Expr],
        seen: &mut Vec<(ConstValue, TypeKey, Span)>,
    ) {
        for e in values {
            let mut v = Operand::new();
            self.expr(&mut v, e);
            if x.invalid() || v.invalid() {
                continue;
            }
            let invalid = self.invalid_type();
            self.convert_untyped(&mut v, x.typ.unwrap_or(invalid));
            if v.invalid() {
                continue;
            }
            // comparing v against x puts errors at the case values
            let mut res = v.clone();
            if !self.comparison(&mut res, x, e, tag, BinaryOp::Eq) {
                continue;
            }

            let (OperandMode::Constant(val), Some(vt)) = (&v.mode, v.typ) else {
                continue;
            };
            if matches!(val, ConstValue::Bool(_) | ConstValue::Unknown) {
                continue;
            }
            let dup = seen
                .iter()
                .find(|(w, wt, _)| w == val && typ::identical(vt, *wt, self.tc_objs))
                .map(|(_, _, span)| *span);
            match dup {
                Some(prev) => {
                    let msg = format!(
                        "duplicate case {} in expression switch (previous case at {})",
                        self.op_str(&v, e),
                        prev.start
                    );
                    self.error(TypeError::DuplicateCase, v.span, msg);
                }
                None => seen.push((val.clone(), vt, v.span)),
            }
        }
    }

    fn type_switch_stmt(&mut self, s: &Stmt, ts: &TypeSwitchStmt) {
        self.open_scope(s.id, ScopeKind::TypeSwitch, s.span);
        self.simple_stmt(ts.init.as_deref());

        // the binding is declared anew in every clause
        let mut bind: Option<&Ident> = None;
        if let Some(ident) = &ts.bind {
            if self.ident_name(ident) == "_" {
                self.soft_error(TypeError::NoNewVariables, ident.span, "no new variable on left side of :=");
            } else {
                self.record_def(ident, None);
                bind = Some(ident);
            }
        }

        let mut x = Operand::new();
        self.expr(&mut x, &ts.expr);
        let xt = match x.typ {
            Some(t) if !x.invalid() => {
                if typ::is_interface(t, self.tc_objs) {
                    Some(t)
                } else {
                    let msg = format!("{} is not an interface", self.op_str(&x, &ts.expr));
                    self.error(TypeError::InvalidTypeSwitch, x.span, msg);
                    None
                }
            }
            _ => None,
        };

        self.multiple_defaults(ts.cases.iter().filter(|c| c.types.is_empty()).map(|c| c.span));
        let mut seen: Vec<(Option<TypeKey>, Span)> = Vec::new();
        let invalid = self.invalid_type();
        for clause in &ts.cases {
            let mut single: Option<TypeKey> = None;
            for texpr in &clause.types {
                let t = texpr.as_ref().map(|te| self.typ(te));
                if t == Some(invalid) {
                    continue;
                }
                let span = texpr.as_ref().map_or(clause.span, |te| te.span);
                let dup = seen.iter().find(|(u, _)| match (t, *u) {
                    (None, None) => true,
                    (Some(t), Some(u)) => typ::identical(t, u, self.tc_objs),
                    _ => false,
                });
                if let Some(&(_, prev)) = dup {
                    let name = t.map_or_else(|| "nil".to_string(), |t| self.type_str(t));
                    let msg = format!("duplicate case {} in type switch (previous case at {})", name, prev.start);
                    self.error(TypeError::DuplicateCase, span, msg);
                    continue;
                }
                seen.push((t, span));
                if let (Some(t), Some(xt)) = (t, xt) {
                    self.type_assertion(&x, &ts.expr, xt, t, span);
                }
                if clause.types.len() == 1 {
                    single = t;
                }
            }

            self.open_scope(clause.id, ScopeKind::Case, clause.span);
            if let Some(ident) = bind {
                let t = single.or(xt).unwrap_or(invalid);
                let name = self.ident_name(ident).to_string();
                let okey = self.tc_objs.new_var(ident.span.start, Some(self.pkg), name, Some(t));
                let scope_pos = clause
                    .types
                    .iter()
                    .rev()
                    .find_map(|te| te.as_ref().map(|te| te.span.end))
                    .unwrap_or(clause.span.start + "default".len() as u32);
                let scope = self.scope_key();
                self.declare(scope, None, okey, scope_pos);
                self.record_implicit(clause.id, okey);
            }
            self.stmt_list(&clause.body);
            self.close_scope();
        }
        self.close_scope();
    }

    fn select_stmt(&mut self, sel: &SelectStmt) {
        self.multiple_defaults(sel.cases.iter().filter(|c| c.comm.is_none()).map(|c| c.span));
        for clause in &sel.cases {
            if let Some(CommStmt::Recv(r)) = &clause.comm {
                if !matches!(r.expr.unparen().kind, ExprKind::Receive(_)) {
                    self.error(
                        TypeError::InvalidReceive,
                        r.expr.span,
                        "select case must be send or receive (possibly with assignment)",
                    );
                    continue;
                }
            }
            self.open_scope(clause.id, ScopeKind::Comm, clause.span);
            match &clause.comm {
                Some(CommStmt::Send(ss)) => self.send_stmt(ss),
                Some(CommStmt::Recv(r)) => self.recv_stmt(clause.span, r),
                None => {}
            }
            self.stmt_list(&clause.body);
            self.close_scope();
        }
    }

    fn recv_stmt(&mut self, span: Span, r: &RecvStmt) {
        let rhs = std::slice::from_ref(&r.expr);
        if r.lhs.is_empty() {
            self.expr_stmt(&r.expr);
        } else if !r.define {
            self.assign_vars(&r.lhs, rhs);
        } else {
            let mut names = Vec::with_capacity(r.lhs.len());
            for e in &r.lhs {
                match &e.kind {
                    ExprKind::Ident(ident) => names.push(*ident),
                    _ => {
                        let msg = format!("cannot declare {}", self.expr_str(e));
                        self.error(TypeError::UnassignableOperand, e.span, msg);
                        self.use_exprs(rhs.iter());
                        return;
                    }
                }
            }
            self.short_var_decl(span, &names, rhs);
        }
    }
}

