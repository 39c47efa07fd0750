//! AST to stack machine code generator
//!
//! Second pass of the back end. Translates every node into a fragment of
//! code instructions (and, for variables and string constants, data
//! instructions), consulting the [`Layout`] built by the frame builder.
//! - Every node's fragment is recorded in [`Fragments`] by node id
//! - Expressions leave exactly one word on the stack
//! - Expression statements discard their value, except the last one of a
//!   function body, which is the function's result

mod expr;
mod stmt;

use crate::ast::*;
use crate::error::{CodegenError, CodegenResult};
use crate::instr::{Code, CodeInstr, DataInstr};
use crate::layout::Layout;
use crate::mem::Frame;
use log::{debug, trace};
use std::collections::HashMap;

/// Code and data fragments of every node, keyed by node id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragments {
    code: HashMap<NodeId, Vec<CodeInstr>>,
    data: HashMap<NodeId, Vec<DataInstr>>,
}

impl Fragments {
    /// Code emitted for a node
    pub fn code(&self, id: NodeId) -> Option<&[CodeInstr]> {
        self.code.get(&id).map(Vec::as_slice)
    }

    /// Data emitted for a variable definition or string constant
    pub fn data(&self, id: NodeId) -> Option<&[DataInstr]> {
        self.data.get(&id).map(Vec::as_slice)
    }

    pub fn code_count(&self) -> usize {
        self.code.len()
    }

    pub fn data_count(&self) -> usize {
        self.data.len()
    }
}

/// Function currently being translated
#[derive(Debug, Clone, Copy)]
pub(super) struct Ctx<'a> {
    pub(super) frame: &'a Frame,
    /// Expression statement whose value is the function's result
    pub(super) value_stmt: Option<NodeId>,
}

/// Code generator state
pub struct CodeGenerator<'a> {
    pub(super) layout: &'a Layout,
    pub(super) fragments: Fragments,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self {
            layout,
            fragments: Fragments::default(),
        }
    }

    /// Translate every definition of `program`
    pub fn generate(mut self, program: &Program) -> CodegenResult<Fragments> {
        for def in &program.defs {
            self.emit_def(def)?;
        }
        debug!(
            "codegen: {} code fragments, {} data fragments",
            self.fragments.code.len(),
            self.fragments.data.len()
        );
        Ok(self.fragments)
    }

    /// Code of a definition at its point of declaration
    ///
    /// A function yields no code in place; its body is recorded separately.
    pub(super) fn emit_def(&mut self, def: &Def) -> CodegenResult<Vec<CodeInstr>> {
        match def {
            Def::Fun(fun) => {
                self.emit_fun(fun)?;
                Ok(Vec::new())
            }
            Def::Var(var) => self.emit_var_def(var),
        }
    }

    fn emit_fun(&mut self, fun: &FunDef) -> CodegenResult<()> {
        // No body: an external routine, called by its name
        if fun.stmts.is_empty() {
            return Ok(());
        }

        let layout = self.layout;
        let frame = layout.frame(fun.id).ok_or_else(|| {
            CodegenError::internal(format!("no frame for function `{}` {}", fun.name, fun.id))
        })?;
        let ctx = Ctx {
            frame,
            value_stmt: value_stmt(&fun.stmts),
        };
        let span = fun.span;

        let mut code = vec![Code::Label(frame.label.clone()).at(span)];
        if frame.locals_size > 0 {
            code.push(Code::Push(-word_operand(frame.locals_size)?).at(span));
            code.push(Code::PopN.at(span));
        }
        code.extend(self.emit_stmts(&fun.stmts, &ctx)?);
        code.push(Code::Push(word_operand(frame.arguments_size())?).at(span));
        code.push(Code::Retn(frame.clone()).at(span));

        trace!("function {}: {} instructions", frame.label, code.len());
        self.record_code(fun.id, code);
        Ok(())
    }

    /// Record a node's code fragment and hand it back to the parent
    pub(super) fn record_code(&mut self, id: NodeId, code: Vec<CodeInstr>) -> Vec<CodeInstr> {
        self.fragments.code.insert(id, code.clone());
        code
    }

    pub(super) fn record_data(&mut self, id: NodeId, data: Vec<DataInstr>) {
        self.fragments.data.insert(id, data);
    }
}

/// Statement whose value a function returns: the last statement of the
/// body, looking through trailing `let` blocks, if it is an expression
/// statement
pub fn value_stmt(stmts: &[Stmt]) -> Option<NodeId> {
    match stmts.last()? {
        Stmt::Expr(stmt) => Some(stmt.id),
        Stmt::Let(block) => value_stmt(&block.stmts),
        Stmt::Assign(_) | Stmt::If(_) | Stmt::While(_) => None,
    }
}

/// Byte count as a `PUSH` operand
pub(super) fn word_operand(bytes: u32) -> CodegenResult<i32> {
    i32::try_from(bytes)
        .map_err(|_| CodegenError::internal(format!("{} bytes do not fit in an operand", bytes)))
}

/// Translate a laid-out program
pub fn generate(program: &Program, layout: &Layout) -> CodegenResult<Fragments> {
    CodeGenerator::new(layout).generate(program)
}
