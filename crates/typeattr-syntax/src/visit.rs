//! Read-only tree traversal.
//!
//! Override the `visit_*` hooks of [`Visitor`] and call the matching `walk_*`
//! function to continue into children.

use crate::ast::*;

pub trait Visitor: Sized {
    fn visit_file(&mut self, file: &File) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_type_expr(&mut self, ty: &TypeExpr) {
        walk_type_expr(self, ty);
    }
}

pub fn walk_file<V: Visitor>(v: &mut V, file: &File) {
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: Visitor>(v: &mut V, decl: &Decl) {
    match decl {
        Decl::Var(d) => walk_var_decl(v, d),
        Decl::Const(d) => walk_const_decl(v, d),
        Decl::Type(d) => v.visit_type_expr(&d.ty),
        Decl::Func(d) => {
            walk_func_type(v, &d.sig);
            if let Some(body) = &d.body {
                walk_block(v, body);
            }
        }
    }
}

fn walk_var_decl<V: Visitor>(v: &mut V, d: &VarDecl) {
    for spec in &d.specs {
        if let Some(ty) = &spec.ty {
            v.visit_type_expr(ty);
        }
        for value in &spec.values {
            v.visit_expr(value);
        }
    }
}

fn walk_const_decl<V: Visitor>(v: &mut V, d: &ConstDecl) {
    for spec in &d.specs {
        if let Some(ty) = &spec.ty {
            v.visit_type_expr(ty);
        }
        for value in &spec.values {
            v.visit_expr(value);
        }
    }
}

fn walk_func_type<V: Visitor>(v: &mut V, sig: &FuncType) {
    for p in sig.params.iter().chain(sig.results.iter()) {
        v.visit_type_expr(&p.ty);
    }
}

fn walk_block<V: Visitor>(v: &mut V, block: &Block) {
    for s in &block.stmts {
        v.visit_stmt(s);
    }
}

fn walk_opt_stmt<V: Visitor>(v: &mut V, s: &Option<Box<Stmt>>) {
    if let Some(s) = s {
        v.visit_stmt(s);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Empty | StmtKind::Fallthrough => {}
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Goto(_) => {}
        StmtKind::Block(b) => walk_block(v, b),
        StmtKind::Var(d) => walk_var_decl(v, d),
        StmtKind::Const(d) => walk_const_decl(v, d),
        StmtKind::Type(d) => v.visit_type_expr(&d.ty),
        StmtKind::ShortVar(d) => {
            for value in &d.values {
                v.visit_expr(value);
            }
        }
        StmtKind::Expr(e) | StmtKind::Go(e) | StmtKind::Defer(e) => v.visit_expr(e),
        StmtKind::Assign(a) => {
            for e in a.lhs.iter().chain(a.rhs.iter()) {
                v.visit_expr(e);
            }
        }
        StmtKind::IncDec(i) => v.visit_expr(&i.expr),
        StmtKind::Return(r) => {
            for e in &r.values {
                v.visit_expr(e);
            }
        }
        StmtKind::If(i) => {
            walk_opt_stmt(v, &i.init);
            v.visit_expr(&i.cond);
            walk_block(v, &i.then);
            walk_opt_stmt(v, &i.else_);
        }
        StmtKind::For(f) => {
            match &f.clause {
                ForClause::Three { init, cond, post } => {
                    walk_opt_stmt(v, init);
                    if let Some(cond) = cond {
                        v.visit_expr(cond);
                    }
                    walk_opt_stmt(v, post);
                }
                ForClause::Range { key, value, expr, .. } => {
                    for e in key.iter().chain(value.iter()) {
                        v.visit_expr(e);
                    }
                    v.visit_expr(expr);
                }
            }
            walk_block(v, &f.body);
        }
        StmtKind::Switch(s) => {
            walk_opt_stmt(v, &s.init);
            if let Some(tag) = &s.tag {
                v.visit_expr(tag);
            }
            for clause in &s.cases {
                for e in &clause.exprs {
                    v.visit_expr(e);
                }
                for s in &clause.body {
                    v.visit_stmt(s);
                }
            }
        }
        StmtKind::TypeSwitch(s) => {
            walk_opt_stmt(v, &s.init);
            v.visit_expr(&s.expr);
            for clause in &s.cases {
                for ty in clause.types.iter().flatten() {
                    v.visit_type_expr(ty);
                }
                for s in &clause.body {
                    v.visit_stmt(s);
                }
            }
        }
        StmtKind::Select(s) => {
            for clause in &s.cases {
                match &clause.comm {
                    Some(CommStmt::Send(send)) => {
                        v.visit_expr(&send.chan);
                        v.visit_expr(&send.value);
                    }
                    Some(CommStmt::Recv(recv)) => {
                        for e in &recv.lhs {
                            v.visit_expr(e);
                        }
                        v.visit_expr(&recv.expr);
                    }
                    None => {}
                }
                for s in &clause.body {
                    v.visit_stmt(s);
                }
            }
        }
        StmtKind::Send(s) => {
            v.visit_expr(&s.chan);
            v.visit_expr(&s.value);
        }
        StmtKind::Labeled(l) => v.visit_stmt(&l.stmt),
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Ident(_)
        | ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::ImagLit(_)
        | ExprKind::RuneLit(_)
        | ExprKind::StringLit(_) => {}
        ExprKind::Binary(b) => {
            v.visit_expr(&b.left);
            v.visit_expr(&b.right);
        }
        ExprKind::Unary(u) => v.visit_expr(&u.operand),
        ExprKind::Call(c) => {
            v.visit_expr(&c.func);
            for a in &c.args {
                v.visit_expr(a);
            }
        }
        ExprKind::Index(i) => {
            v.visit_expr(&i.expr);
            v.visit_expr(&i.index);
        }
        ExprKind::Slice(s) => {
            v.visit_expr(&s.expr);
            for e in s.low.iter().chain(s.high.iter()) {
                v.visit_expr(e);
            }
        }
        ExprKind::Selector(s) => v.visit_expr(&s.expr),
        ExprKind::TypeAssert(t) => {
            v.visit_expr(&t.expr);
            v.visit_type_expr(&t.ty);
        }
        ExprKind::CompositeLit(c) => {
            if let Some(ty) = &c.ty {
                v.visit_type_expr(ty);
            }
            for elem in &c.elems {
                if let Some(key) = &elem.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&elem.value);
            }
        }
        ExprKind::FuncLit(f) => {
            walk_func_type(v, &f.sig);
            walk_block(v, &f.body);
        }
        ExprKind::Conversion(c) => {
            v.visit_type_expr(&c.ty);
            v.visit_expr(&c.expr);
        }
        ExprKind::Receive(e) | ExprKind::Paren(e) => v.visit_expr(e),
        ExprKind::TypeAsExpr(t) => v.visit_type_expr(t),
    }
}

pub fn walk_type_expr<V: Visitor>(v: &mut V, ty: &TypeExpr) {
    match &ty.kind {
        TypeExprKind::Ident(_) | TypeExprKind::Selector(_) => {}
        TypeExprKind::Array(a) => {
            v.visit_expr(&a.len);
            v.visit_type_expr(&a.elem);
        }
        TypeExprKind::Slice(t) | TypeExprKind::Pointer(t) => v.visit_type_expr(t),
        TypeExprKind::Map(m) => {
            v.visit_type_expr(&m.key);
            v.visit_type_expr(&m.value);
        }
        TypeExprKind::Chan(c) => v.visit_type_expr(&c.elem),
        TypeExprKind::Func(f) => walk_func_type(v, f),
        TypeExprKind::Struct(s) => {
            for f in &s.fields {
                v.visit_type_expr(&f.ty);
            }
        }
        TypeExprKind::Interface(i) => {
            for elem in &i.elems {
                match elem {
                    InterfaceElem::Method(m) => walk_func_type(v, &m.sig),
                    InterfaceElem::Embedded(t) => v.visit_type_expr(t),
                }
            }
        }
    }
}
