//! Programmatic construction of syntax trees.
//!
//! Parsing is the driver's business; drivers that already hold a tree in
//! another form, and tests, build trees with [`AstBuilder`]. The builder
//! hands out fresh [`NodeId`]s and synthetic, strictly increasing spans, and
//! interns every name and literal in one [`SymbolInterner`].
//!
//! All methods take `&self` so calls nest naturally:
//!
//! ```
//! use typeattr_syntax::builder::AstBuilder;
//!
//! let b = AstBuilder::new();
//! let file = b.file(
//!     "p",
//!     vec![],
//!     vec![b.var_decl(&["x"], None, vec![b.int("1")])],
//! );
//! assert_eq!(file.decls.len(), 1);
//! ```

use std::cell::{Cell, Ref, RefCell};

use typeattr_common::span::Span;
use typeattr_common::symbol::{Symbol, SymbolInterner};

use crate::ast::*;

#[derive(Debug, Default)]
pub struct AstBuilder {
    next: Cell<u32>,
    interner: RefCell<SymbolInterner>,
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder {
            next: Cell::new(1),
            interner: RefCell::new(SymbolInterner::new()),
        }
    }

    /// Continues numbering after trees built by another builder sharing `interner`.
    pub fn with_interner(interner: SymbolInterner, first_id: u32) -> Self {
        AstBuilder {
            next: Cell::new(first_id.max(1)),
            interner: RefCell::new(interner),
        }
    }

    pub fn interner(&self) -> Ref<'_, SymbolInterner> {
        self.interner.borrow()
    }

    /// Consumes the builder, returning the interner that resolves its symbols.
    pub fn finish(self) -> SymbolInterner {
        self.interner.into_inner()
    }

    /// The id the next node will receive.
    pub fn peek_id(&self) -> u32 {
        self.next.get()
    }

    fn node(&self) -> (NodeId, Span) {
        let n = self.next.get();
        self.next.set(n + 1);
        (NodeId(n), Span::new(n, n + 1))
    }

    fn sym(&self, s: &str) -> Symbol {
        self.interner.borrow_mut().intern(s)
    }

    pub fn ident(&self, name: &str) -> Ident {
        let (id, span) = self.node();
        Ident { id, symbol: self.sym(name), span }
    }

    fn idents(&self, names: &[&str]) -> Vec<Ident> {
        names.iter().map(|n| self.ident(n)).collect()
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        let (id, span) = self.node();
        Expr { id, kind, span }
    }

    fn ty(&self, kind: TypeExprKind) -> TypeExpr {
        let (id, span) = self.node();
        TypeExpr { id, kind, span }
    }

    fn stmt(&self, kind: StmtKind) -> Stmt {
        let (id, span) = self.node();
        Stmt { id, kind, span }
    }

    fn lit(&self, raw: &str) -> BasicLit {
        BasicLit { raw: self.sym(raw) }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// An identifier expression.
    pub fn name(&self, name: &str) -> Expr {
        let ident = self.ident(name);
        self.expr(ExprKind::Ident(ident))
    }

    pub fn int(&self, raw: &str) -> Expr {
        self.expr(ExprKind::IntLit(self.lit(raw)))
    }

    pub fn float(&self, raw: &str) -> Expr {
        self.expr(ExprKind::FloatLit(self.lit(raw)))
    }

    pub fn imag(&self, raw: &str) -> Expr {
        self.expr(ExprKind::ImagLit(self.lit(raw)))
    }

    /// A rune literal; `raw` includes the single quotes.
    pub fn rune(&self, raw: &str) -> Expr {
        self.expr(ExprKind::RuneLit(self.lit(raw)))
    }

    /// A string literal; `raw` includes the quotes or backquotes.
    pub fn string(&self, raw: &str) -> Expr {
        self.expr(ExprKind::StringLit(self.lit(raw)))
    }

    pub fn paren(&self, e: Expr) -> Expr {
        self.expr(ExprKind::Paren(Box::new(e)))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary(Box::new(UnaryExpr { op, operand })))
    }

    pub fn binary(&self, left: Expr, op: BinaryOp, right: Expr) -> Expr {
        self.expr(ExprKind::Binary(Box::new(BinaryExpr { left, op, right })))
    }

    pub fn call(&self, func: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(Box::new(CallExpr { func, args, spread: false })))
    }

    /// `f(args...)`
    pub fn call_spread(&self, func: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(Box::new(CallExpr { func, args, spread: true })))
    }

    pub fn index(&self, expr: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index(Box::new(IndexExpr { expr, index })))
    }

    pub fn slice(&self, expr: Expr, low: Option<Expr>, high: Option<Expr>) -> Expr {
        self.expr(ExprKind::Slice(Box::new(SliceExpr { expr, low, high })))
    }

    pub fn sel(&self, expr: Expr, name: &str) -> Expr {
        let sel = self.ident(name);
        self.expr(ExprKind::Selector(Box::new(SelectorExpr { expr, sel })))
    }

    /// `expr.(ty)`
    pub fn assert(&self, expr: Expr, ty: TypeExpr) -> Expr {
        self.expr(ExprKind::TypeAssert(Box::new(TypeAssertExpr { expr, ty })))
    }

    /// `<-expr`
    pub fn recv(&self, expr: Expr) -> Expr {
        self.expr(ExprKind::Receive(Box::new(expr)))
    }

    pub fn composite(&self, ty: TypeExpr, elems: Vec<CompositeLitElem>) -> Expr {
        self.expr(ExprKind::CompositeLit(Box::new(CompositeLit { ty: Some(ty), elems })))
    }

    /// An inner composite literal whose type is elided.
    pub fn composite_elided(&self, elems: Vec<CompositeLitElem>) -> Expr {
        self.expr(ExprKind::CompositeLit(Box::new(CompositeLit { ty: None, elems })))
    }

    pub fn elem(&self, value: Expr) -> CompositeLitElem {
        let (_, span) = self.node();
        CompositeLitElem { key: None, value, span }
    }

    pub fn kv(&self, key: Expr, value: Expr) -> CompositeLitElem {
        let (_, span) = self.node();
        CompositeLitElem { key: Some(key), value, span }
    }

    pub fn func_lit(&self, sig: FuncType, body: Vec<Stmt>) -> Expr {
        let body = self.block(body);
        self.expr(ExprKind::FuncLit(Box::new(FuncLit { sig, body })))
    }

    /// `ty(expr)` with a syntactic type in call position.
    pub fn convert(&self, ty: TypeExpr, expr: Expr) -> Expr {
        self.expr(ExprKind::Conversion(Box::new(ConversionExpr { ty, expr })))
    }

    /// A type expression in operand position.
    pub fn type_operand(&self, ty: TypeExpr) -> Expr {
        self.expr(ExprKind::TypeAsExpr(Box::new(ty)))
    }

    // =========================================================================
    // Type expressions
    // =========================================================================

    /// A type name.
    pub fn t(&self, name: &str) -> TypeExpr {
        let ident = self.ident(name);
        self.ty(TypeExprKind::Ident(ident))
    }

    /// `pkg.Name`
    pub fn t_qual(&self, pkg: &str, name: &str) -> TypeExpr {
        let pkg = self.ident(pkg);
        let sel = self.ident(name);
        self.ty(TypeExprKind::Selector(Box::new(SelectorTypeExpr { pkg, sel })))
    }

    pub fn t_ptr(&self, base: TypeExpr) -> TypeExpr {
        self.ty(TypeExprKind::Pointer(Box::new(base)))
    }

    pub fn t_slice(&self, elem: TypeExpr) -> TypeExpr {
        self.ty(TypeExprKind::Slice(Box::new(elem)))
    }

    pub fn t_array(&self, len: Expr, elem: TypeExpr) -> TypeExpr {
        self.ty(TypeExprKind::Array(Box::new(ArrayType { len, elem })))
    }

    pub fn t_map(&self, key: TypeExpr, value: TypeExpr) -> TypeExpr {
        self.ty(TypeExprKind::Map(Box::new(MapType { key, value })))
    }

    pub fn t_chan(&self, dir: ChanDir, elem: TypeExpr) -> TypeExpr {
        self.ty(TypeExprKind::Chan(Box::new(ChanType { dir, elem })))
    }

    pub fn t_func(&self, sig: FuncType) -> TypeExpr {
        self.ty(TypeExprKind::Func(Box::new(sig)))
    }

    pub fn t_struct(&self, fields: Vec<Field>) -> TypeExpr {
        self.ty(TypeExprKind::Struct(Box::new(StructType { fields })))
    }

    pub fn t_interface(&self, elems: Vec<InterfaceElem>) -> TypeExpr {
        self.ty(TypeExprKind::Interface(Box::new(InterfaceType { elems })))
    }

    /// `interface{}`
    pub fn t_any(&self) -> TypeExpr {
        self.t_interface(vec![])
    }

    pub fn field(&self, names: &[&str], ty: TypeExpr) -> Field {
        let names = self.idents(names);
        let (_, span) = self.node();
        Field { names, ty, tag: None, span }
    }

    /// An embedded field.
    pub fn embed(&self, ty: TypeExpr) -> Field {
        self.field(&[], ty)
    }

    pub fn method_spec(&self, name: &str, sig: FuncType) -> InterfaceElem {
        let name = self.ident(name);
        let (_, span) = self.node();
        InterfaceElem::Method(MethodSpec { name, sig, span })
    }

    pub fn embed_iface(&self, ty: TypeExpr) -> InterfaceElem {
        InterfaceElem::Embedded(ty)
    }

    pub fn param(&self, names: &[&str], ty: TypeExpr) -> Param {
        let names = self.idents(names);
        let (_, span) = self.node();
        Param { names, ty, span }
    }

    pub fn sig(&self, params: Vec<Param>, results: Vec<Param>) -> FuncType {
        let (id, span) = self.node();
        FuncType { id, params, results, variadic: false, span }
    }

    /// A signature whose last parameter is `...T`.
    pub fn sig_variadic(&self, params: Vec<Param>, results: Vec<Param>) -> FuncType {
        FuncType {
            variadic: true,
            ..self.sig(params, results)
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn block(&self, stmts: Vec<Stmt>) -> Block {
        let (id, span) = self.node();
        Block { id, stmts, span }
    }

    pub fn block_stmt(&self, stmts: Vec<Stmt>) -> Stmt {
        let block = self.block(stmts);
        self.stmt(StmtKind::Block(block))
    }

    pub fn empty(&self) -> Stmt {
        self.stmt(StmtKind::Empty)
    }

    pub fn expr_stmt(&self, e: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(e))
    }

    /// `lhs = rhs`
    pub fn assign(&self, lhs: Vec<Expr>, rhs: Vec<Expr>) -> Stmt {
        self.op_assign(lhs, AssignOp::Assign, rhs)
    }

    pub fn op_assign(&self, lhs: Vec<Expr>, op: AssignOp, rhs: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Assign(AssignStmt { lhs, op, rhs }))
    }

    /// `names := values`
    pub fn define(&self, names: &[&str], values: Vec<Expr>) -> Stmt {
        let names = self.idents(names);
        self.stmt(StmtKind::ShortVar(ShortVarDecl { names, values }))
    }

    pub fn inc(&self, e: Expr) -> Stmt {
        self.stmt(StmtKind::IncDec(IncDecStmt { expr: e, is_inc: true }))
    }

    pub fn dec(&self, e: Expr) -> Stmt {
        self.stmt(StmtKind::IncDec(IncDecStmt { expr: e, is_inc: false }))
    }

    pub fn ret(&self, values: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(ReturnStmt { values }))
    }

    /// A local `var` statement with one spec.
    pub fn var_stmt(&self, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Stmt {
        let spec = self.var_spec(names, ty, values);
        let span = spec.span;
        self.stmt(StmtKind::Var(VarDecl { specs: vec![spec], span }))
    }

    /// A local `const` statement.
    pub fn const_stmt(&self, specs: Vec<ConstSpec>) -> Stmt {
        let (_, span) = self.node();
        self.stmt(StmtKind::Const(ConstDecl { specs, span }))
    }

    /// A local `type` statement.
    pub fn type_stmt(&self, name: &str, ty: TypeExpr) -> Stmt {
        let name = self.ident(name);
        let (_, span) = self.node();
        self.stmt(StmtKind::Type(TypeDecl { name, ty, span }))
    }

    pub fn if_stmt(
        &self,
        init: Option<Stmt>,
        cond: Expr,
        then: Vec<Stmt>,
        else_: Option<Stmt>,
    ) -> Stmt {
        let then = self.block(then);
        self.stmt(StmtKind::If(IfStmt {
            init: init.map(Box::new),
            cond,
            then,
            else_: else_.map(Box::new),
        }))
    }

    pub fn for_stmt(
        &self,
        init: Option<Stmt>,
        cond: Option<Expr>,
        post: Option<Stmt>,
        body: Vec<Stmt>,
    ) -> Stmt {
        let body = self.block(body);
        self.stmt(StmtKind::For(ForStmt {
            clause: ForClause::Three {
                init: init.map(Box::new),
                cond,
                post: post.map(Box::new),
            },
            body,
        }))
    }

    pub fn range_stmt(
        &self,
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
        body: Vec<Stmt>,
    ) -> Stmt {
        let body = self.block(body);
        self.stmt(StmtKind::For(ForStmt {
            clause: ForClause::Range { key, value, define, expr },
            body,
        }))
    }

    pub fn switch_stmt(&self, init: Option<Stmt>, tag: Option<Expr>, cases: Vec<CaseClause>) -> Stmt {
        self.stmt(StmtKind::Switch(SwitchStmt {
            init: init.map(Box::new),
            tag,
            cases,
        }))
    }

    /// A `case` clause; an empty `exprs` list is `default`.
    pub fn case(&self, exprs: Vec<Expr>, body: Vec<Stmt>) -> CaseClause {
        let (id, span) = self.node();
        CaseClause { id, exprs, body, span }
    }

    pub fn type_switch(
        &self,
        init: Option<Stmt>,
        bind: Option<&str>,
        expr: Expr,
        cases: Vec<TypeCaseClause>,
    ) -> Stmt {
        let bind = bind.map(|n| self.ident(n));
        self.stmt(StmtKind::TypeSwitch(TypeSwitchStmt {
            init: init.map(Box::new),
            bind,
            expr,
            cases,
        }))
    }

    pub fn type_case(&self, types: Vec<Option<TypeExpr>>, body: Vec<Stmt>) -> TypeCaseClause {
        let (id, span) = self.node();
        TypeCaseClause { id, types, body, span }
    }

    pub fn select(&self, cases: Vec<CommClause>) -> Stmt {
        self.stmt(StmtKind::Select(SelectStmt { cases }))
    }

    pub fn comm_send(&self, chan: Expr, value: Expr, body: Vec<Stmt>) -> CommClause {
        let (id, span) = self.node();
        CommClause {
            id,
            comm: Some(CommStmt::Send(SendStmt { chan, value })),
            body,
            span,
        }
    }

    /// `case lhs := <-ch:` (or `=` when `define` is false).
    pub fn comm_recv(&self, lhs: Vec<Expr>, define: bool, expr: Expr, body: Vec<Stmt>) -> CommClause {
        let (id, span) = self.node();
        CommClause {
            id,
            comm: Some(CommStmt::Recv(RecvStmt { lhs, define, expr })),
            body,
            span,
        }
    }

    pub fn comm_default(&self, body: Vec<Stmt>) -> CommClause {
        let (id, span) = self.node();
        CommClause { id, comm: None, body, span }
    }

    pub fn send(&self, chan: Expr, value: Expr) -> Stmt {
        self.stmt(StmtKind::Send(SendStmt { chan, value }))
    }

    pub fn go_stmt(&self, call: Expr) -> Stmt {
        self.stmt(StmtKind::Go(call))
    }

    pub fn defer_stmt(&self, call: Expr) -> Stmt {
        self.stmt(StmtKind::Defer(call))
    }

    pub fn brk(&self) -> Stmt {
        self.stmt(StmtKind::Break(None))
    }

    pub fn cont(&self) -> Stmt {
        self.stmt(StmtKind::Continue(None))
    }

    /// `break label`
    pub fn brk_to(&self, label: &str) -> Stmt {
        let label = self.ident(label);
        self.stmt(StmtKind::Break(Some(label)))
    }

    /// `continue label`
    pub fn cont_to(&self, label: &str) -> Stmt {
        let label = self.ident(label);
        self.stmt(StmtKind::Continue(Some(label)))
    }

    pub fn goto(&self, label: &str) -> Stmt {
        let label = self.ident(label);
        self.stmt(StmtKind::Goto(label))
    }

    pub fn fallthrough(&self) -> Stmt {
        self.stmt(StmtKind::Fallthrough)
    }

    pub fn labeled(&self, label: &str, stmt: Stmt) -> Stmt {
        let label = self.ident(label);
        self.stmt(StmtKind::Labeled(LabeledStmt { label, stmt: Box::new(stmt) }))
    }

    // =========================================================================
    // Declarations and files
    // =========================================================================

    pub fn var_spec(&self, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> VarSpec {
        let names = self.idents(names);
        let (id, span) = self.node();
        VarSpec { id, names, ty, values, span }
    }

    /// `var names ty = values`
    pub fn var_decl(&self, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Decl {
        self.var_group(vec![self.var_spec(names, ty, values)])
    }

    /// `var ( specs... )`
    pub fn var_group(&self, specs: Vec<VarSpec>) -> Decl {
        let (_, span) = self.node();
        Decl::Var(VarDecl { specs, span })
    }

    pub fn const_spec(&self, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> ConstSpec {
        let names = self.idents(names);
        let (id, span) = self.node();
        ConstSpec { id, names, ty, values, span }
    }

    /// `const names ty = values`
    pub fn const_decl(&self, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Decl {
        self.const_group(vec![self.const_spec(names, ty, values)])
    }

    /// `const ( specs... )`
    pub fn const_group(&self, specs: Vec<ConstSpec>) -> Decl {
        let (_, span) = self.node();
        Decl::Const(ConstDecl { specs, span })
    }

    pub fn type_decl(&self, name: &str, ty: TypeExpr) -> Decl {
        let name = self.ident(name);
        let (_, span) = self.node();
        Decl::Type(TypeDecl { name, ty, span })
    }

    /// A function; `body` is `None` for a body-less declaration.
    pub fn func_decl(&self, name: &str, sig: FuncType, body: Option<Vec<Stmt>>) -> Decl {
        let name = self.ident(name);
        let body = body.map(|stmts| self.block(stmts));
        let (_, span) = self.node();
        Decl::Func(FuncDecl { recv: None, name, sig, body, span })
    }

    pub fn receiver(&self, name: Option<&str>, ty: &str, is_pointer: bool) -> Receiver {
        let name = name.map(|n| self.ident(n));
        let ty = self.ident(ty);
        let (_, span) = self.node();
        Receiver { name, ty, is_pointer, span }
    }

    pub fn method_decl(
        &self,
        recv: Receiver,
        name: &str,
        sig: FuncType,
        body: Option<Vec<Stmt>>,
    ) -> Decl {
        let name = self.ident(name);
        let body = body.map(|stmts| self.block(stmts));
        let (_, span) = self.node();
        Decl::Func(FuncDecl { recv: Some(recv), name, sig, body, span })
    }

    /// `import "path"`
    pub fn import(&self, path: &str) -> ImportDecl {
        self.import_decl(None, path)
    }

    /// `import alias "path"`
    pub fn import_as(&self, alias: &str, path: &str) -> ImportDecl {
        self.import_decl(Some(alias), path)
    }

    fn import_decl(&self, alias: Option<&str>, path: &str) -> ImportDecl {
        let alias = alias.map(|a| self.ident(a));
        let path = self.sym(path);
        let (id, span) = self.node();
        ImportDecl { id, alias, path, span }
    }

    pub fn file(&self, package: &str, imports: Vec<ImportDecl>, decls: Vec<Decl>) -> File {
        let package = self.ident(package);
        let (id, span) = self.node();
        File { id, package, imports, decls, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::expr_string;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let b = AstBuilder::new();
        let x = b.name("x");
        let y = b.name("y");
        let sum = b.binary(x, BinaryOp::Add, y);
        let ExprKind::Binary(bin) = &sum.kind else {
            panic!("expected binary expression");
        };
        assert!(bin.left.id < bin.right.id);
        assert!(bin.right.id < sum.id);
        assert!(bin.left.span.start < sum.span.start);
    }

    #[test]
    fn test_nested_construction_and_printing() {
        let b = AstBuilder::new();
        let e = b.sel(
            b.paren(b.unary(UnaryOp::Deref, b.name("A"))),
            "f",
        );
        let call = b.call(b.name("new"), vec![b.name("A")]);
        let conv = b.convert(b.t_slice(b.t("byte")), b.string("\"foo\""));
        let interner = b.finish();
        assert_eq!(expr_string(&e, &interner), "(*A).f");
        assert_eq!(expr_string(&call, &interner), "new(A)");
        assert_eq!(expr_string(&conv, &interner), "[]byte(\"foo\")");
    }

    #[test]
    fn test_func_literal_printing() {
        let b = AstBuilder::new();
        let sig = b.sig(vec![], vec![b.param(&["_", "_"], b.t("int"))]);
        let lit = b.call(b.func_lit(sig, vec![]), vec![]);
        let single = b.func_lit(b.sig(vec![b.param(&["x"], b.t("int"))], vec![b.param(&[], b.t("int"))]), vec![]);
        let m = b.index(b.name("m"), b.string("\"foo\""));
        let interner = b.finish();
        assert_eq!(expr_string(&lit, &interner), "(func() (_, _ int) literal)()");
        assert_eq!(expr_string(&single, &interner), "(func(x int) int literal)");
        assert_eq!(expr_string(&m, &interner), "m[\"foo\"]");
    }

    #[test]
    fn test_unparen_strips_all_levels() {
        let b = AstBuilder::new();
        let inner = b.recv(b.name("c"));
        let id = inner.id;
        let e = b.paren(b.paren(inner));
        assert_eq!(e.unparen().id, id);
    }
}
