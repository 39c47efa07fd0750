//! Frame builder
//!
//! First pass of the back end. Walks the program once, top-down, and
//! assigns every function a [`Frame`] and every variable and parameter an
//! [`Access`]. The resulting [`Layout`] is read-only for the later passes.
//!
//! - Top-level functions have depth 1; a function defined inside another
//!   function's body is one level deeper.
//! - `let` blocks do not open a frame. Their variables belong to the
//!   enclosing function.
//! - Variables outside any function are globals with absolute access.

use crate::ast::*;
use crate::decode;
use crate::diagnostic::error_codes;
use crate::error::{CodegenError, CodegenResult};
use crate::mem::{
    self, AbsAccess, Access, Frame, RelAccess, FIRST_PARAM_OFFSET, LINK_SIZE, LOCALS_BASE_OFFSET,
    WORD_SIZE,
};
use log::{debug, trace};
use std::collections::HashMap;

/// Frames and accesses of one program, keyed by definition node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    frames: HashMap<NodeId, Frame>,
    accesses: HashMap<NodeId, Access>,
}

impl Layout {
    /// Frame of a function definition
    pub fn frame(&self, fun: NodeId) -> Option<&Frame> {
        self.frames.get(&fun)
    }

    /// Access of a variable or parameter definition
    pub fn access(&self, def: NodeId) -> Option<&Access> {
        self.accesses.get(&def)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn access_count(&self) -> usize {
        self.accesses.len()
    }

    /// Human-readable report of every frame and access, in program order
    ///
    /// ```text
    /// var x@1:1 global:x@1:1 size=4 inits=2
    /// fun main@1:9 depth=1 params=8 locals=8
    ///   par n@1:5 offset=4 size=4 depth=1
    ///   var y@1:7 offset=-16 size=8 depth=1 inits=0,0
    /// ```
    pub fn describe(&self, program: &Program) -> String {
        let mut output = String::new();
        for def in &program.defs {
            self.describe_def(def, 0, &mut output);
        }
        output
    }

    fn describe_def(&self, def: &Def, indent: usize, output: &mut String) {
        let pad = "  ".repeat(indent);
        match def {
            Def::Fun(fun) => {
                output.push_str(&format!("{}fun {}@{}", pad, fun.name, fun.span));
                if let Some(frame) = self.frame(fun.id) {
                    output.push_str(&format!(
                        " depth={} params={} locals={}",
                        frame.depth, frame.params_size, frame.locals_size
                    ));
                }
                output.push('\n');
                for param in &fun.params {
                    output.push_str(&format!("{}  par {}@{}", pad, param.name, param.span));
                    self.describe_access(param.id, output);
                }
                self.describe_stmts(&fun.stmts, indent + 1, output);
            }
            Def::Var(var) => {
                output.push_str(&format!("{}var {}@{}", pad, var.name, var.span));
                self.describe_access(var.id, output);
            }
        }
    }

    fn describe_access(&self, def: NodeId, output: &mut String) {
        match self.access(def) {
            Some(Access::Rel(rel)) => {
                output.push_str(&format!(" offset={} size={} depth={}", rel.offset, rel.size, rel.depth));
                if let Some(inits) = &rel.inits {
                    output.push_str(&format!(" inits={}", inits));
                }
            }
            Some(Access::Abs(abs)) => {
                output.push_str(&format!(" {} size={} inits={}", abs.label, abs.size, abs.inits));
            }
            None => {}
        }
        output.push('\n');
    }

    fn describe_stmts(&self, stmts: &[Stmt], indent: usize, output: &mut String) {
        for stmt in stmts {
            match stmt {
                Stmt::Let(block) => {
                    for def in &block.defs {
                        self.describe_def(def, indent, output);
                    }
                    self.describe_stmts(&block.stmts, indent, output);
                }
                Stmt::If(stmt) => {
                    self.describe_stmts(&stmt.then_stmts, indent, output);
                    self.describe_stmts(&stmt.else_stmts, indent, output);
                }
                Stmt::While(stmt) => self.describe_stmts(&stmt.stmts, indent, output),
                Stmt::Expr(_) | Stmt::Assign(_) => {}
            }
        }
    }
}

/// Layout state of the function currently being traversed
#[derive(Debug)]
struct FrameContext {
    depth: u32,
    params_size: u32,
    /// Offset of the most recently allocated local
    next_local: i32,
    locals_size: u32,
}

impl FrameContext {
    fn new(depth: u32) -> Self {
        Self {
            depth,
            params_size: LINK_SIZE,
            next_local: LOCALS_BASE_OFFSET,
            locals_size: 0,
        }
    }

    /// Reserve `size` bytes below the previous local; `None` if the frame
    /// no longer fits the offset range
    fn allocate_local(&mut self, size: u32) -> Option<i32> {
        let delta = i32::try_from(size).ok()?;
        self.next_local = self.next_local.checked_sub(delta)?;
        self.locals_size = self.locals_size.checked_add(size)?;
        Some(self.next_local)
    }
}

/// Where a definition is being laid out
enum Scope<'a> {
    Global,
    InFrame(&'a mut FrameContext),
}

impl Scope<'_> {
    fn depth(&self) -> u32 {
        match self {
            Scope::Global => 0,
            Scope::InFrame(ctx) => ctx.depth,
        }
    }
}

/// Builds the [`Layout`] of a program
pub struct FrameBuilder {
    layout: Layout,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            layout: Layout::default(),
        }
    }

    /// Lay out every definition of `program`
    pub fn build(mut self, program: &Program) -> CodegenResult<Layout> {
        for def in &program.defs {
            self.def(def, &mut Scope::Global)?;
        }
        debug!(
            "layout: {} frames, {} accesses",
            self.layout.frames.len(),
            self.layout.accesses.len()
        );
        Ok(self.layout)
    }

    fn def(&mut self, def: &Def, scope: &mut Scope<'_>) -> CodegenResult<()> {
        match def {
            Def::Fun(fun) => self.fun(fun, scope.depth()),
            Def::Var(var) => self.var(var, scope),
        }
    }

    fn fun(&mut self, fun: &FunDef, parent_depth: u32) -> CodegenResult<()> {
        let mut ctx = FrameContext::new(parent_depth + 1);

        for param in &fun.params {
            let offset = FIRST_PARAM_OFFSET + (ctx.params_size - LINK_SIZE) as i32;
            self.insert_access(
                param.id,
                Access::Rel(RelAccess {
                    offset,
                    depth: ctx.depth,
                    size: WORD_SIZE,
                    inits: None,
                }),
            )?;
            ctx.params_size += WORD_SIZE;
        }

        self.stmts(&fun.stmts, &mut Scope::InFrame(&mut ctx))?;

        let label = if ctx.depth == 1 {
            fun.name.clone()
        } else {
            mem::named_label("fun", &fun.name, fun.span)
        };
        let frame = Frame {
            name: fun.name.clone(),
            label,
            depth: ctx.depth,
            params_size: ctx.params_size,
            locals_size: ctx.locals_size,
        };
        trace!(
            "frame {}: depth={} params={} locals={}",
            frame.label,
            frame.depth,
            frame.params_size,
            frame.locals_size
        );
        if self.layout.frames.insert(fun.id, frame).is_some() {
            return Err(CodegenError::internal(format!(
                "function `{}` {} laid out twice",
                fun.name, fun.id
            )));
        }
        Ok(())
    }

    fn var(&mut self, var: &VarDef, scope: &mut Scope<'_>) -> CodegenResult<()> {
        let (inits, size) = decode::decode_inits(&var.inits)?;
        let access = match scope {
            Scope::Global => Access::Abs(AbsAccess {
                label: mem::named_label("global", &var.name, var.span),
                size,
                inits,
            }),
            Scope::InFrame(ctx) => {
                let offset = ctx.allocate_local(size).ok_or_else(|| {
                    CodegenError::at(
                        error_codes::ILLEGAL_REPEAT_COUNT,
                        format!("variable `{}` does not fit in its frame", var.name),
                        var.span,
                    )
                })?;
                Access::Rel(RelAccess {
                    offset,
                    depth: ctx.depth,
                    size,
                    inits: Some(inits),
                })
            }
        };
        self.insert_access(var.id, access)
    }

    fn stmts(&mut self, stmts: &[Stmt], scope: &mut Scope<'_>) -> CodegenResult<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Let(block) => {
                    for def in &block.defs {
                        self.def(def, scope)?;
                    }
                    self.stmts(&block.stmts, scope)?;
                }
                Stmt::If(stmt) => {
                    self.stmts(&stmt.then_stmts, scope)?;
                    self.stmts(&stmt.else_stmts, scope)?;
                }
                Stmt::While(stmt) => self.stmts(&stmt.stmts, scope)?,
                Stmt::Expr(_) | Stmt::Assign(_) => {}
            }
        }
        Ok(())
    }

    fn insert_access(&mut self, def: NodeId, access: Access) -> CodegenResult<()> {
        if self.layout.accesses.insert(def, access).is_some() {
            return Err(CodegenError::internal(format!(
                "definition {} laid out twice",
                def
            )));
        }
        Ok(())
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the layout of a whole program
pub fn organize(program: &Program) -> CodegenResult<Layout> {
    FrameBuilder::new().build(program)
}
