//! Segment assembler
//!
//! Last pass of the back end. Flattens the recorded fragments into one
//! code segment and one data segment, in program order:
//!
//! - code: global variable initialization, the prologue calling the entry
//!   function and then the exit routine, then every function body
//!   (a function before the functions nested in it)
//! - data: initial-value blobs and storage of variables, and string
//!   constants, in the order they appear in the tree

pub mod listing;

use crate::ast::*;
use crate::codegen::Fragments;
use crate::config::CodegenConfig;
use crate::error::{CodegenError, CodegenResult};
use crate::instr::{Code, CodeInstr, DataInstr};
use crate::layout::Layout;
use log::debug;
use serde::{Deserialize, Serialize};

/// Final code and data segments of a program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segments {
    pub code: Vec<CodeInstr>,
    pub data: Vec<DataInstr>,
}

impl Segments {
    /// Size of the code segment in bytes
    pub fn code_size(&self) -> u32 {
        self.code.iter().map(CodeInstr::size).sum()
    }

    /// Size of the data segment in bytes
    pub fn data_size(&self) -> u32 {
        self.data.iter().map(DataInstr::size).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Concatenates fragments into segments
struct Assembler<'a> {
    fragments: &'a Fragments,
    segments: Segments,
}

impl Assembler<'_> {
    fn code_of(&self, id: NodeId, what: &str) -> CodegenResult<&[CodeInstr]> {
        self.fragments
            .code(id)
            .ok_or_else(|| CodegenError::internal(format!("no code recorded for {} {}", what, id)))
    }

    fn data_of(&self, id: NodeId, what: &str) -> CodegenResult<&[DataInstr]> {
        self.fragments
            .data(id)
            .ok_or_else(|| CodegenError::internal(format!("no data recorded for {} {}", what, id)))
    }

    // ===== Code segment =====

    fn global_inits(&mut self, program: &Program) -> CodegenResult<()> {
        for def in &program.defs {
            if let Def::Var(var) = def {
                let code = self.code_of(var.id, "global variable")?.to_vec();
                self.segments.code.extend(code);
            }
        }
        Ok(())
    }

    fn fun_bodies(&mut self, defs: &[Def]) -> CodegenResult<()> {
        for def in defs {
            if let Def::Fun(fun) = def {
                if !fun.stmts.is_empty() {
                    let code = self.code_of(fun.id, "function")?.to_vec();
                    self.segments.code.extend(code);
                }
                self.nested_bodies(&fun.stmts)?;
            }
        }
        Ok(())
    }

    fn nested_bodies(&mut self, stmts: &[Stmt]) -> CodegenResult<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Let(block) => {
                    self.fun_bodies(&block.defs)?;
                    self.nested_bodies(&block.stmts)?;
                }
                Stmt::If(stmt) => {
                    self.nested_bodies(&stmt.then_stmts)?;
                    self.nested_bodies(&stmt.else_stmts)?;
                }
                Stmt::While(stmt) => self.nested_bodies(&stmt.stmts)?,
                Stmt::Expr(_) | Stmt::Assign(_) => {}
            }
        }
        Ok(())
    }

    // ===== Data segment =====

    fn data_defs(&mut self, defs: &[Def]) -> CodegenResult<()> {
        for def in defs {
            match def {
                Def::Var(var) => {
                    let data = self.data_of(var.id, "variable")?.to_vec();
                    self.segments.data.extend(data);
                }
                Def::Fun(fun) => self.data_stmts(&fun.stmts)?,
            }
        }
        Ok(())
    }

    fn data_stmts(&mut self, stmts: &[Stmt]) -> CodegenResult<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Expr(stmt) => self.data_expr(&stmt.expr)?,
                Stmt::Assign(stmt) => {
                    self.data_expr(&stmt.dst)?;
                    self.data_expr(&stmt.src)?;
                }
                Stmt::If(stmt) => {
                    self.data_expr(&stmt.cond)?;
                    self.data_stmts(&stmt.then_stmts)?;
                    self.data_stmts(&stmt.else_stmts)?;
                }
                Stmt::While(stmt) => {
                    self.data_expr(&stmt.cond)?;
                    self.data_stmts(&stmt.stmts)?;
                }
                Stmt::Let(block) => {
                    self.data_defs(&block.defs)?;
                    self.data_stmts(&block.stmts)?;
                }
            }
        }
        Ok(())
    }

    fn data_expr(&mut self, expr: &Expr) -> CodegenResult<()> {
        match expr {
            Expr::Atom(atom) if atom.kind == AtomKind::Str => {
                let data = self.data_of(atom.id, "string constant")?.to_vec();
                self.segments.data.extend(data);
            }
            Expr::Atom(_) | Expr::Var(_) => {}
            Expr::Call(call) => {
                for arg in &call.args {
                    self.data_expr(arg)?;
                }
            }
            Expr::Unary(unary) => self.data_expr(&unary.expr)?,
            Expr::Binary(binary) => {
                self.data_expr(&binary.left)?;
                self.data_expr(&binary.right)?;
            }
        }
        Ok(())
    }
}

/// Top-level function named `name` that has a body
fn find_entry<'p>(program: &'p Program, name: &str) -> Option<&'p FunDef> {
    program.defs.iter().find_map(|def| match def {
        Def::Fun(fun) if fun.name == name && !fun.stmts.is_empty() => Some(fun),
        _ => None,
    })
}

/// Flatten the fragments of `program` into final segments
pub fn assemble(
    program: &Program,
    layout: &Layout,
    fragments: &Fragments,
    config: &CodegenConfig,
) -> CodegenResult<Segments> {
    let entry = find_entry(program, &config.entry)
        .ok_or_else(|| CodegenError::missing_entry_point(config.entry.as_str()))?;
    let entry_frame = layout.frame(entry.id).ok_or_else(|| {
        CodegenError::internal(format!("no frame for entry function {}", entry.id))
    })?;

    let mut assembler = Assembler {
        fragments,
        segments: Segments::default(),
    };

    assembler.global_inits(program)?;
    let span = entry.span;
    assembler.segments.code.extend([
        Code::Push(0).at(span),
        Code::Name(entry_frame.label.clone()).at(span),
        Code::Call(Some(entry_frame.clone())).at(span),
        Code::Push(0).at(span),
        Code::Name(config.exit.clone()).at(span),
        Code::Call(None).at(span),
    ]);
    assembler.fun_bodies(&program.defs)?;
    assembler.data_defs(&program.defs)?;

    let segments = assembler.segments;
    debug!(
        "assembled: code {} instructions ({} bytes), data {} instructions ({} bytes)",
        segments.code.len(),
        segments.code_size(),
        segments.data.len(),
        segments.data_size()
    );
    Ok(segments)
}
