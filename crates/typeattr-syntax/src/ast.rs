//! Abstract Syntax Tree definitions.
//!
//! Every node the semantic layer attaches facts to carries a [`NodeId`]:
//! expressions, type expressions, identifiers, statements, blocks, clauses,
//! function types and files. Ids are unique across all files built by one
//! [`AstBuilder`](crate::builder::AstBuilder).

use std::fmt;

use typeattr_common::span::Span;
use typeattr_common::symbol::Symbol;

/// Identity of a syntax node, used as the key of every attribute map.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An identifier occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident {
    pub id: NodeId,
    pub symbol: Symbol,
    pub span: Span,
}

/// A source file.
#[derive(Debug, Clone)]
pub struct File {
    pub id: NodeId,
    /// The package clause.
    pub package: Ident,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
    pub span: Span,
}

/// An import declaration: `import alias "path"`.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub id: NodeId,
    /// Explicit local name, including `_` and `.`.
    pub alias: Option<Ident>,
    /// The import path without quotes.
    pub path: Symbol,
    pub span: Span,
}

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Decl {
    Var(VarDecl),
    Const(ConstDecl),
    Type(TypeDecl),
    Func(FuncDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Var(d) => d.span,
            Decl::Const(d) => d.span,
            Decl::Type(d) => d.span,
            Decl::Func(d) => d.span,
        }
    }
}

/// `var ( ... )`
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub specs: Vec<VarSpec>,
    pub span: Span,
}

/// `a, b T = x, y`
#[derive(Debug, Clone)]
pub struct VarSpec {
    pub id: NodeId,
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `const ( ... )`
#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub specs: Vec<ConstSpec>,
    pub span: Span,
}

/// A constant spec; `values` may be empty to repeat the previous spec.
#[derive(Debug, Clone)]
pub struct ConstSpec {
    pub id: NodeId,
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `type Name T`
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A function or method declaration.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<Receiver>,
    pub name: Ident,
    pub sig: FuncType,
    /// `None` for functions implemented outside the package.
    pub body: Option<Block>,
    pub span: Span,
}

/// A method receiver: `(r T)` or `(r *T)`.
#[derive(Debug, Clone)]
pub struct Receiver {
    pub name: Option<Ident>,
    pub ty: Ident,
    pub is_pointer: bool,
    pub span: Span,
}

// =============================================================================
// Type Expressions
// =============================================================================

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub id: NodeId,
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// `int`, `MyType`
    Ident(Ident),
    /// `pkg.Type`
    Selector(Box<SelectorTypeExpr>),
    /// `[N]T`
    Array(Box<ArrayType>),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `map[K]V`
    Map(Box<MapType>),
    /// `chan T`, `chan<- T`, `<-chan T`
    Chan(Box<ChanType>),
    /// `func(T) R`
    Func(Box<FuncType>),
    /// `struct { ... }`
    Struct(Box<StructType>),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `interface { ... }`
    Interface(Box<InterfaceType>),
}

#[derive(Debug, Clone)]
pub struct SelectorTypeExpr {
    pub pkg: Ident,
    pub sel: Ident,
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub len: Expr,
    pub elem: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct MapType {
    pub key: TypeExpr,
    pub value: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct ChanType {
    pub dir: ChanDir,
    pub elem: TypeExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A function signature. Introduces the function scope.
#[derive(Debug, Clone)]
pub struct FuncType {
    pub id: NodeId,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// The last parameter is `...T`.
    pub variadic: bool,
    pub span: Span,
}

/// A parameter group: `a, b int`, or a lone type when `names` is empty.
#[derive(Debug, Clone)]
pub struct Param {
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructType {
    pub fields: Vec<Field>,
}

/// A struct field group; `names` is empty for an embedded field.
#[derive(Debug, Clone)]
pub struct Field {
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
    pub tag: Option<Symbol>,
    pub span: Span,
}

impl Field {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub elems: Vec<InterfaceElem>,
}

#[derive(Debug, Clone)]
pub enum InterfaceElem {
    Method(MethodSpec),
    Embedded(TypeExpr),
}

#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: Ident,
    pub sig: FuncType,
    pub span: Span,
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Empty,
    Block(Block),
    Var(VarDecl),
    Const(ConstDecl),
    Type(TypeDecl),
    /// `x, y := a, b`
    ShortVar(ShortVarDecl),
    Expr(Expr),
    Assign(AssignStmt),
    IncDec(IncDecStmt),
    Return(ReturnStmt),
    If(IfStmt),
    For(ForStmt),
    Switch(SwitchStmt),
    TypeSwitch(TypeSwitchStmt),
    Select(SelectStmt),
    Go(Expr),
    Defer(Expr),
    Send(SendStmt),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Goto(Ident),
    Fallthrough,
    Labeled(LabeledStmt),
}

/// A braced block. Introduces a block scope unless it is a function body.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ShortVarDecl {
    pub names: Vec<Ident>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub lhs: Vec<Expr>,
    pub op: AssignOp,
    pub rhs: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    AndNot,
}

impl AssignOp {
    /// The binary operator of a compound assignment.
    pub fn binary_op(self) -> Option<BinaryOp> {
        Some(match self {
            AssignOp::Assign => return None,
            AssignOp::Add => BinaryOp::Add,
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Div => BinaryOp::Div,
            AssignOp::Rem => BinaryOp::Rem,
            AssignOp::Shl => BinaryOp::Shl,
            AssignOp::Shr => BinaryOp::Shr,
            AssignOp::And => BinaryOp::And,
            AssignOp::Or => BinaryOp::Or,
            AssignOp::Xor => BinaryOp::Xor,
            AssignOp::AndNot => BinaryOp::AndNot,
        })
    }
}

#[derive(Debug, Clone)]
pub struct IncDecStmt {
    pub expr: Expr,
    pub is_inc: bool,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub values: Vec<Expr>,
}

/// `if init; cond { then } else ...`. Introduces the `if` scope.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub then: Block,
    /// Either another `if` statement or a block.
    pub else_: Option<Box<Stmt>>,
}

/// Introduces the `for` or `range` scope.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub clause: ForClause,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub enum ForClause {
    /// `for init; cond; post`
    Three {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
    },
    /// `for key, value := range expr` or `for key, value = range expr`
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
    },
}

#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub tag: Option<Expr>,
    pub cases: Vec<CaseClause>,
}

/// A `case` clause; `exprs` is empty for `default`.
#[derive(Debug, Clone)]
pub struct CaseClause {
    pub id: NodeId,
    pub exprs: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `switch init; bind := expr.(type) { ... }`
#[derive(Debug, Clone)]
pub struct TypeSwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub bind: Option<Ident>,
    /// The operand `x` of `x.(type)`.
    pub expr: Expr,
    pub cases: Vec<TypeCaseClause>,
}

/// A type switch clause; `None` entries stand for `nil`, an empty list for `default`.
#[derive(Debug, Clone)]
pub struct TypeCaseClause {
    pub id: NodeId,
    pub types: Vec<Option<TypeExpr>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SelectStmt {
    pub cases: Vec<CommClause>,
}

/// A select clause; `comm` is `None` for `default`.
#[derive(Debug, Clone)]
pub struct CommClause {
    pub id: NodeId,
    pub comm: Option<CommStmt>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum CommStmt {
    Send(SendStmt),
    Recv(RecvStmt),
}

/// `lhs := <-ch`, `lhs = <-ch` or a bare `<-ch`.
#[derive(Debug, Clone)]
pub struct RecvStmt {
    pub lhs: Vec<Expr>,
    pub define: bool,
    /// The receive expression, possibly parenthesized.
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct SendStmt {
    pub chan: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct LabeledStmt {
    pub label: Ident,
    pub stmt: Box<Stmt>,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(Ident),
    IntLit(BasicLit),
    FloatLit(BasicLit),
    ImagLit(BasicLit),
    RuneLit(BasicLit),
    StringLit(BasicLit),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Call(Box<CallExpr>),
    Index(Box<IndexExpr>),
    Slice(Box<SliceExpr>),
    Selector(Box<SelectorExpr>),
    TypeAssert(Box<TypeAssertExpr>),
    CompositeLit(Box<CompositeLit>),
    FuncLit(Box<FuncLit>),
    /// `T(x)` where `T` is syntactically a type.
    Conversion(Box<ConversionExpr>),
    /// `<-x`
    Receive(Box<Expr>),
    Paren(Box<Expr>),
    /// A syntactic type in operand position (`new([]int)`, `[]byte(s)` callee).
    TypeAsExpr(Box<TypeExpr>),
}

/// Literal text exactly as written, quotes included.
#[derive(Debug, Clone)]
pub struct BasicLit {
    pub raw: Symbol,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Expr,
    pub op: BinaryOp,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::AndNot => "&^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    BitNot,
    Addr,
    Deref,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Deref => "*",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub func: Expr,
    pub args: Vec<Expr>,
    /// The last argument is followed by `...`.
    pub spread: bool,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub expr: Expr,
    pub index: Expr,
}

#[derive(Debug, Clone)]
pub struct SliceExpr {
    pub expr: Expr,
    pub low: Option<Expr>,
    pub high: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct SelectorExpr {
    pub expr: Expr,
    pub sel: Ident,
}

/// `x.(T)`
#[derive(Debug, Clone)]
pub struct TypeAssertExpr {
    pub expr: Expr,
    pub ty: TypeExpr,
}

/// `T{...}`; `ty` is `None` for an elided inner literal.
#[derive(Debug, Clone)]
pub struct CompositeLit {
    pub ty: Option<TypeExpr>,
    pub elems: Vec<CompositeLitElem>,
}

/// `key: value` or `value`. Struct literals read an identifier key as a field name.
#[derive(Debug, Clone)]
pub struct CompositeLitElem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncLit {
    pub sig: FuncType,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ConversionExpr {
    pub ty: TypeExpr,
    pub expr: Expr,
}

impl Expr {
    /// Strips any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::Paren(inner) = &e.kind {
            e = inner;
        }
        e
    }
}
