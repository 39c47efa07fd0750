//! Programmatic AST construction
//!
//! `AstBuilder` hands out fresh [`NodeId`]s and distinct source positions
//! so that hand-built trees satisfy the same invariants as trees coming
//! out of semantic analysis: unique ids, and no two nodes at the same
//! position. Name uses are linked to their definitions by id.
//!
//! ```
//! use pins_backend::builder::AstBuilder;
//!
//! let mut b = AstBuilder::new();
//! let two = b.int("2");
//! let init = b.scalar_init(two);
//! let x = b.var("x", vec![init]);
//! let use_x = b.var_ref("x", x.id);
//! let body = b.expr_stmt(use_x);
//! let main_id = b.id();
//! let main = b.fun(main_id, "main", vec![], vec![body]);
//! let program = b.program(vec![x.into(), main.into()]);
//! assert_eq!(program.defs.len(), 2);
//! ```

use crate::ast::*;
use crate::span::Span;

/// Builder for annotated ASTs
#[derive(Debug, Clone)]
pub struct AstBuilder {
    next_id: u32,
    line: u32,
    column: u32,
}

impl AstBuilder {
    /// Create a builder positioned at `1:1`
    pub fn new() -> Self {
        Self {
            next_id: 0,
            line: 1,
            column: 1,
        }
    }

    /// Reserve a node id, e.g. for a function that calls itself
    pub fn id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Move the position cursor; the next node starts at `line:column`
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Continue on the next line, column 1
    pub fn newline(&mut self) -> &mut Self {
        self.line += 1;
        self.column = 1;
        self
    }

    fn span(&mut self) -> Span {
        let span = Span::point(self.line, self.column);
        self.column += 1;
        span
    }

    pub fn program(&mut self, defs: Vec<Def>) -> Program {
        Program::new(defs)
    }

    // ===== Definitions =====

    /// Function definition with a previously reserved id
    pub fn fun(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        params: Vec<ParDef>,
        stmts: Vec<Stmt>,
    ) -> FunDef {
        FunDef {
            id,
            name: name.into(),
            params,
            stmts,
            span: self.span(),
        }
    }

    pub fn param(&mut self, name: impl Into<String>) -> ParDef {
        ParDef {
            id: self.id(),
            name: name.into(),
            span: self.span(),
        }
    }

    pub fn var(&mut self, name: impl Into<String>, inits: Vec<Init>) -> VarDef {
        VarDef {
            id: self.id(),
            name: name.into(),
            inits,
            span: self.span(),
        }
    }

    /// `count * value`
    pub fn init(&mut self, count: Atom, value: Atom) -> Init {
        Init {
            id: self.id(),
            count,
            value,
            span: self.span(),
        }
    }

    /// A bare constant, i.e. `1 * value`
    pub fn scalar_init(&mut self, value: Atom) -> Init {
        let count = self.int("1");
        self.init(count, value)
    }

    // ===== Constants =====

    pub fn int(&mut self, lexeme: impl Into<String>) -> Atom {
        self.atom(AtomKind::Int, lexeme)
    }

    /// Character constant; the lexeme includes the quotes, e.g. `'a'`
    pub fn chr(&mut self, lexeme: impl Into<String>) -> Atom {
        self.atom(AtomKind::Char, lexeme)
    }

    /// String constant; the lexeme includes the quotes, e.g. `"ab"`
    pub fn str(&mut self, lexeme: impl Into<String>) -> Atom {
        self.atom(AtomKind::Str, lexeme)
    }

    fn atom(&mut self, kind: AtomKind, lexeme: impl Into<String>) -> Atom {
        Atom {
            id: self.id(),
            kind,
            lexeme: lexeme.into(),
            span: self.span(),
        }
    }

    // ===== Statements =====

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        Stmt::Expr(ExprStmt {
            id: self.id(),
            expr,
            span: self.span(),
        })
    }

    pub fn assign(&mut self, dst: Expr, src: Expr) -> Stmt {
        Stmt::Assign(AssignStmt {
            id: self.id(),
            dst,
            src,
            span: self.span(),
        })
    }

    pub fn if_then(&mut self, cond: Expr, then_stmts: Vec<Stmt>) -> Stmt {
        self.if_else(cond, then_stmts, Vec::new())
    }

    pub fn if_else(&mut self, cond: Expr, then_stmts: Vec<Stmt>, else_stmts: Vec<Stmt>) -> Stmt {
        Stmt::If(IfStmt {
            id: self.id(),
            cond,
            then_stmts,
            else_stmts,
            span: self.span(),
        })
    }

    pub fn while_do(&mut self, cond: Expr, stmts: Vec<Stmt>) -> Stmt {
        Stmt::While(WhileStmt {
            id: self.id(),
            cond,
            stmts,
            span: self.span(),
        })
    }

    pub fn let_in(&mut self, defs: Vec<Def>, stmts: Vec<Stmt>) -> Stmt {
        Stmt::Let(LetStmt {
            id: self.id(),
            defs,
            stmts,
            span: self.span(),
        })
    }

    // ===== Expressions =====

    pub fn lit(&mut self, atom: Atom) -> Expr {
        Expr::Atom(atom)
    }

    /// Use of the variable or parameter defined by `def`
    pub fn var_ref(&mut self, name: impl Into<String>, def: NodeId) -> Expr {
        Expr::Var(VarExpr {
            id: self.id(),
            name: name.into(),
            def,
            span: self.span(),
        })
    }

    /// Call of the function defined by `def`
    pub fn call(&mut self, name: impl Into<String>, def: NodeId, args: Vec<Expr>) -> Expr {
        Expr::Call(CallExpr {
            id: self.id(),
            name: name.into(),
            def,
            args,
            span: self.span(),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, expr: Expr) -> Expr {
        Expr::Unary(UnaryExpr {
            id: self.id(),
            op,
            expr: Box::new(expr),
            span: self.span(),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            id: self.id(),
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: self.span(),
        })
    }
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<FunDef> for Def {
    fn from(fun: FunDef) -> Self {
        Def::Fun(fun)
    }
}

impl From<VarDef> for Def {
    fn from(var: VarDef) -> Self {
        Def::Var(var)
    }
}
