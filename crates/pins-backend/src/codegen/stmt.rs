//! Statement and variable definition code generation

use crate::ast::*;
use crate::codegen::{CodeGenerator, Ctx};
use crate::diagnostic::error_codes;
use crate::error::{CodegenError, CodegenResult};
use crate::instr::{Code, CodeInstr, Data, Oper};
use crate::mem::{self, Access};

impl CodeGenerator<'_> {
    /// Variable definition: the init blob goes to the data segment, the
    /// code copies it into the variable's storage
    pub(super) fn emit_var_def(&mut self, var: &VarDef) -> CodegenResult<Vec<CodeInstr>> {
        let layout = self.layout;
        let access = layout.access(var.id).ok_or_else(|| {
            CodegenError::internal(format!("no access for variable `{}` {}", var.name, var.id))
        })?;
        let span = var.span;
        let init_label = mem::named_label("init", &var.name, span);

        let mut data = vec![Data::Label(init_label.clone()).at(span)];
        let mut code = Vec::new();
        match access {
            Access::Rel(rel) => {
                let inits = rel.inits.as_ref().ok_or_else(|| {
                    CodegenError::internal(format!("local `{}` {} has no initializer", var.name, var.id))
                })?;
                data.extend(inits.encoded().iter().map(|&word| Data::Word(word).at(span)));
                code.push(Code::RegFp.at(span));
                code.push(Code::Push(rel.offset).at(span));
                code.push(Code::Oper(Oper::Add).at(span));
            }
            Access::Abs(abs) => {
                data.extend(abs.inits.encoded().iter().map(|&word| Data::Word(word).at(span)));
                data.push(Data::Label(abs.label.clone()).at(span));
                data.push(Data::Size(abs.size).at(span));
                code.push(Code::Name(abs.label.clone()).at(span));
            }
        }
        code.push(Code::Name(init_label).at(span));
        code.push(Code::Init.at(span));

        self.record_data(var.id, data);
        Ok(self.record_code(var.id, code))
    }

    pub(super) fn emit_stmts(&mut self, stmts: &[Stmt], ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let mut code = Vec::new();
        for stmt in stmts {
            code.extend(self.emit_stmt(stmt, ctx)?);
        }
        Ok(code)
    }

    fn emit_stmt(&mut self, stmt: &Stmt, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        match stmt {
            Stmt::Expr(stmt) => self.emit_expr_stmt(stmt, ctx),
            Stmt::Assign(stmt) => self.emit_assign(stmt, ctx),
            Stmt::If(stmt) => self.emit_if(stmt, ctx),
            Stmt::While(stmt) => self.emit_while(stmt, ctx),
            Stmt::Let(stmt) => self.emit_let(stmt, ctx),
        }
    }

    fn emit_expr_stmt(&mut self, stmt: &ExprStmt, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let mut code = self.emit_expr(&stmt.expr, ctx)?;
        if ctx.value_stmt != Some(stmt.id) {
            code.push(Code::Push(1).at(stmt.span));
            code.push(Code::PopN.at(stmt.span));
        }
        Ok(self.record_code(stmt.id, code))
    }

    /// Value first, then the destination address, then store
    fn emit_assign(&mut self, stmt: &AssignStmt, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let mut code = self.emit_expr(&stmt.src, ctx)?;
        // the destination's fragment is the address stored to
        match &stmt.dst {
            Expr::Var(var) => {
                let addr = self.var_addr(var, ctx)?;
                code.extend(self.record_code(var.id, addr));
            }
            Expr::Unary(unary) if unary.op == UnaryOp::Deref => {
                let addr = self.emit_expr(&unary.expr, ctx)?;
                code.extend(self.record_code(unary.id, addr));
            }
            other => {
                return Err(CodegenError::at(
                    error_codes::ASSIGN_TO_NON_LVALUE,
                    "cannot assign to non-lvalue",
                    other.span(),
                ))
            }
        }
        code.push(Code::Save.at(stmt.span));
        Ok(self.record_code(stmt.id, code))
    }

    fn emit_if(&mut self, stmt: &IfStmt, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let span = stmt.span;
        let then_label = mem::label("if:then", span);
        let else_label = mem::label("if:else", span);
        let end_label = mem::label("if:end", span);

        let mut code = self.emit_expr(&stmt.cond, ctx)?;
        if stmt.else_stmts.is_empty() {
            code.push(Code::Name(then_label.clone()).at(span));
            code.push(Code::Name(end_label.clone()).at(span));
            code.push(Code::Cjmp.at(span));
            code.push(Code::Label(then_label.clone()).at(span));
            code.extend(self.emit_stmts(&stmt.then_stmts, ctx)?);
            // then-label repeats after the block; the false branch targets end
            code.push(Code::Label(then_label).at(span));
            code.push(Code::Label(end_label).at(span));
        } else {
            code.push(Code::Name(then_label.clone()).at(span));
            code.push(Code::Name(else_label.clone()).at(span));
            code.push(Code::Cjmp.at(span));
            code.push(Code::Label(then_label).at(span));
            code.extend(self.emit_stmts(&stmt.then_stmts, ctx)?);
            code.push(Code::Name(end_label.clone()).at(span));
            code.push(Code::Ujmp.at(span));
            code.push(Code::Label(else_label).at(span));
            code.extend(self.emit_stmts(&stmt.else_stmts, ctx)?);
            code.push(Code::Label(end_label).at(span));
        }
        Ok(self.record_code(stmt.id, code))
    }

    fn emit_while(&mut self, stmt: &WhileStmt, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let span = stmt.span;
        let cond_label = mem::label("while:cond", span);
        let body_label = mem::label("while:body", span);
        let end_label = mem::label("while:end", span);

        let mut code = vec![Code::Label(cond_label.clone()).at(span)];
        code.extend(self.emit_expr(&stmt.cond, ctx)?);
        code.push(Code::Name(body_label.clone()).at(span));
        code.push(Code::Name(end_label.clone()).at(span));
        code.push(Code::Cjmp.at(span));
        code.push(Code::Label(body_label).at(span));
        code.extend(self.emit_stmts(&stmt.stmts, ctx)?);
        code.push(Code::Name(cond_label).at(span));
        code.push(Code::Ujmp.at(span));
        code.push(Code::Label(end_label).at(span));
        Ok(self.record_code(stmt.id, code))
    }

    /// Nested variables are initialized in order; nested functions only
    /// get their own fragments
    fn emit_let(&mut self, stmt: &LetStmt, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let mut code = Vec::new();
        for def in &stmt.defs {
            code.extend(self.emit_def(def)?);
        }
        code.extend(self.emit_stmts(&stmt.stmts, ctx)?);
        Ok(self.record_code(stmt.id, code))
    }
}
