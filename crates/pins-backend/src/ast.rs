//! Abstract Syntax Tree (AST) definitions
//!
//! The tree handed over by semantic analysis. Every node carries a
//! [`NodeId`] and a [`Span`]; every name use (`VarExpr`, `CallExpr`)
//! carries the id of the definition it resolves to.
//!
//! Layout and code generation never mutate the tree. Their results are
//! side tables keyed by `NodeId` (see [`crate::layout::Layout`] and
//! [`crate::codegen::Fragments`]).

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// AST schema version
///
/// Included in JSON dumps. Increment when making breaking changes to the
/// AST structure.
pub const AST_VERSION: u32 = 1;

/// Stable identity of a node within one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whole compilation unit: top-level definitions in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub defs: Vec<Def>,
}

/// Versioned wrapper for JSON hand-over between phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct VersionedProgram {
    ast_version: u32,
    #[serde(flatten)]
    program: Program,
}

impl Program {
    pub fn new(defs: Vec<Def>) -> Self {
        Self { defs }
    }

    /// Serialize to a versioned JSON document
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&VersionedProgram {
            ast_version: AST_VERSION,
            program: self.clone(),
        })
    }

    /// Deserialize from a versioned JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let versioned: VersionedProgram = serde_json::from_str(json)?;
        Ok(versioned.program)
    }
}

/// A definition: top level or inside a `let` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Def {
    Fun(FunDef),
    Var(VarDef),
}

impl Def {
    pub fn id(&self) -> NodeId {
        match self {
            Def::Fun(f) => f.id,
            Def::Var(v) => v.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Def::Fun(f) => f.span,
            Def::Var(v) => v.span,
        }
    }
}

/// Function definition: `fun name(p1, p2) = stmts`
///
/// A function without statements is a declaration of an external routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunDef {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<ParDef>,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParDef {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

/// Variable definition: `var name = init, init, ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub id: NodeId,
    pub name: String,
    pub inits: Vec<Init>,
    pub span: Span,
}

/// One initializer group: `count * value` (a bare constant has count `1`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Init {
    pub id: NodeId,
    /// Integer constant
    pub count: Atom,
    /// Integer, character or string constant
    pub value: Atom,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(ExprStmt),
    Assign(AssignStmt),
    If(IfStmt),
    While(WhileStmt),
    Let(LetStmt),
}

impl Stmt {
    pub fn id(&self) -> NodeId {
        match self {
            Stmt::Expr(s) => s.id,
            Stmt::Assign(s) => s.id,
            Stmt::If(s) => s.id,
            Stmt::While(s) => s.id,
            Stmt::Let(s) => s.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Let(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprStmt {
    pub id: NodeId,
    pub expr: Expr,
    pub span: Span,
}

/// `dst = src`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub id: NodeId,
    pub dst: Expr,
    pub src: Expr,
    pub span: Span,
}

/// `if cond then stmts [else stmts] end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub id: NodeId,
    pub cond: Expr,
    pub then_stmts: Vec<Stmt>,
    pub else_stmts: Vec<Stmt>,
    pub span: Span,
}

/// `while cond do stmts end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub id: NodeId,
    pub cond: Expr,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// `let defs in stmts end`
///
/// Does not open a new frame: its variables belong to the enclosing
/// function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetStmt {
    pub id: NodeId,
    pub defs: Vec<Def>,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Atom(Atom),
    Var(VarExpr),
    Call(CallExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Atom(e) => e.id,
            Expr::Var(e) => e.id,
            Expr::Call(e) => e.id,
            Expr::Unary(e) => e.id,
            Expr::Binary(e) => e.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expr::Atom(e) => e.span,
            Expr::Var(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
        }
    }
}

/// Kind of a literal constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomKind {
    Int,
    Char,
    Str,
}

/// Literal constant, kept as its raw lexeme (quotes included)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: NodeId,
    pub kind: AtomKind,
    pub lexeme: String,
    pub span: Span,
}

/// Use of a variable or parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarExpr {
    pub id: NodeId,
    pub name: String,
    /// Resolved `VarDef` or `ParDef`
    pub def: NodeId,
    pub span: Span,
}

/// `name(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub id: NodeId,
    pub name: String,
    /// Resolved definition; a `FunDef` in a well-formed program
    pub def: NodeId,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `+e`
    Plus,
    /// `-e`
    Minus,
    /// `!e`
    Not,
    /// `^e`, address of a variable
    AddrOf,
    /// `e^`, value at an address
    Deref,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub id: NodeId,
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub id: NodeId,
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}
