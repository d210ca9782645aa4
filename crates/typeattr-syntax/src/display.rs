//! Compact one-line rendering of expressions and type expressions.
//!
//! The output is meant for diagnostics and for identifying nodes in tests,
//! not for round-tripping: function and composite literals are abbreviated
//! to `(T literal)`.

use std::fmt::Write;

use typeattr_common::symbol::{Symbol, SymbolInterner};

use crate::ast::*;

/// Renders `expr` as a string.
pub fn expr_string(expr: &Expr, interner: &SymbolInterner) -> String {
    let mut buf = String::new();
    ExprWriter { buf: &mut buf, interner }.expr(expr);
    buf
}

/// Renders a type expression as a string.
pub fn type_expr_string(ty: &TypeExpr, interner: &SymbolInterner) -> String {
    let mut buf = String::new();
    ExprWriter { buf: &mut buf, interner }.type_expr(ty);
    buf
}

struct ExprWriter<'a> {
    buf: &'a mut String,
    interner: &'a SymbolInterner,
}

impl<'a> ExprWriter<'a> {
    fn sym(&mut self, s: Symbol) {
        self.buf.push_str(self.interner.resolve(s).unwrap_or("_"));
    }

    fn ident(&mut self, ident: &Ident) {
        self.sym(ident.symbol);
    }

    fn list(&mut self, exprs: &[Expr]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.buf.push_str(", ");
            }
            self.expr(e);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(ident) => self.ident(ident),
            ExprKind::IntLit(lit)
            | ExprKind::FloatLit(lit)
            | ExprKind::ImagLit(lit)
            | ExprKind::RuneLit(lit)
            | ExprKind::StringLit(lit) => self.sym(lit.raw),
            ExprKind::FuncLit(f) => {
                self.buf.push('(');
                self.func_type(&f.sig);
                self.buf.push_str(" literal)");
            }
            ExprKind::CompositeLit(c) => {
                self.buf.push('(');
                if let Some(ty) = &c.ty {
                    self.type_expr(ty);
                }
                self.buf.push_str(" literal)");
            }
            ExprKind::Paren(inner) => {
                self.buf.push('(');
                self.expr(inner);
                self.buf.push(')');
            }
            ExprKind::Selector(s) => {
                self.expr(&s.expr);
                self.buf.push('.');
                self.ident(&s.sel);
            }
            ExprKind::Index(i) => {
                self.expr(&i.expr);
                self.buf.push('[');
                self.expr(&i.index);
                self.buf.push(']');
            }
            ExprKind::Slice(s) => {
                self.expr(&s.expr);
                self.buf.push('[');
                if let Some(low) = &s.low {
                    self.expr(low);
                }
                self.buf.push(':');
                if let Some(high) = &s.high {
                    self.expr(high);
                }
                self.buf.push(']');
            }
            ExprKind::TypeAssert(t) => {
                self.expr(&t.expr);
                self.buf.push_str(".(");
                self.type_expr(&t.ty);
                self.buf.push(')');
            }
            ExprKind::Call(c) => {
                self.expr(&c.func);
                self.buf.push('(');
                self.list(&c.args);
                if c.spread {
                    self.buf.push_str("...");
                }
                self.buf.push(')');
            }
            ExprKind::Conversion(c) => {
                self.type_expr(&c.ty);
                self.buf.push('(');
                self.expr(&c.expr);
                self.buf.push(')');
            }
            ExprKind::Unary(u) => {
                self.buf.push_str(u.op.as_str());
                self.expr(&u.operand);
            }
            ExprKind::Receive(e) => {
                self.buf.push_str("<-");
                self.expr(e);
            }
            ExprKind::Binary(b) => {
                self.expr(&b.left);
                let _ = write!(self.buf, " {} ", b.op.as_str());
                self.expr(&b.right);
            }
            ExprKind::TypeAsExpr(t) => self.type_expr(t),
        }
    }

    fn type_expr(&mut self, ty: &TypeExpr) {
        match &ty.kind {
            TypeExprKind::Ident(ident) => self.ident(ident),
            TypeExprKind::Selector(s) => {
                self.ident(&s.pkg);
                self.buf.push('.');
                self.ident(&s.sel);
            }
            TypeExprKind::Array(a) => {
                self.buf.push('[');
                self.expr(&a.len);
                self.buf.push(']');
                self.type_expr(&a.elem);
            }
            TypeExprKind::Slice(elem) => {
                self.buf.push_str("[]");
                self.type_expr(elem);
            }
            TypeExprKind::Pointer(base) => {
                self.buf.push('*');
                self.type_expr(base);
            }
            TypeExprKind::Map(m) => {
                self.buf.push_str("map[");
                self.type_expr(&m.key);
                self.buf.push(']');
                self.type_expr(&m.value);
            }
            TypeExprKind::Chan(c) => {
                self.buf.push_str(match c.dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.type_expr(&c.elem);
            }
            TypeExprKind::Func(f) => self.func_type(f),
            TypeExprKind::Struct(s) => {
                self.buf.push_str("struct{");
                for (i, f) in s.fields.iter().enumerate() {
                    if i > 0 {
                        self.buf.push_str("; ");
                    }
                    self.names(&f.names);
                    self.type_expr(&f.ty);
                }
                self.buf.push('}');
            }
            TypeExprKind::Interface(it) => {
                self.buf.push_str("interface{");
                for (i, elem) in it.elems.iter().enumerate() {
                    if i > 0 {
                        self.buf.push_str("; ");
                    }
                    match elem {
                        InterfaceElem::Method(m) => {
                            self.ident(&m.name);
                            self.signature(&m.sig);
                        }
                        InterfaceElem::Embedded(t) => self.type_expr(t),
                    }
                }
                self.buf.push('}');
            }
        }
    }

    fn names(&mut self, names: &[Ident]) {
        for (i, n) in names.iter().enumerate() {
            if i > 0 {
                self.buf.push_str(", ");
            }
            self.ident(n);
        }
        if !names.is_empty() {
            self.buf.push(' ');
        }
    }

    fn func_type(&mut self, f: &FuncType) {
        self.buf.push_str("func");
        self.signature(f);
    }

    fn signature(&mut self, f: &FuncType) {
        self.buf.push('(');
        self.params(&f.params, f.variadic);
        self.buf.push(')');
        if f.results.is_empty() {
            return;
        }
        self.buf.push(' ');
        if f.results.len() == 1 && f.results[0].names.is_empty() {
            self.type_expr(&f.results[0].ty);
            return;
        }
        self.buf.push('(');
        self.params(&f.results, false);
        self.buf.push(')');
    }

    fn params(&mut self, params: &[Param], variadic: bool) {
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.buf.push_str(", ");
            }
            self.names(&p.names);
            if variadic && i + 1 == params.len() {
                self.buf.push_str("...");
            }
            self.type_expr(&p.ty);
        }
    }
}
