//! Expression code generation

use crate::ast::*;
use crate::codegen::{CodeGenerator, Ctx};
use crate::decode;
use crate::diagnostic::error_codes;
use crate::error::{CodegenError, CodegenResult};
use crate::instr::{Code, CodeInstr, Data, Oper};
use crate::mem::{self, Access};

impl CodeGenerator<'_> {
    /// Compile an expression; the code leaves one word on the stack
    pub(super) fn emit_expr(&mut self, expr: &Expr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        match expr {
            Expr::Atom(atom) => self.emit_atom(atom),
            Expr::Var(var) => self.emit_var(var, ctx),
            Expr::Call(call) => self.emit_call(call, ctx),
            Expr::Unary(unary) => self.emit_unary(unary, ctx),
            Expr::Binary(binary) => self.emit_binary(binary, ctx),
        }
    }

    /// Integers and characters are pushed directly; a string constant is
    /// placed in the data segment and denotes its address
    fn emit_atom(&mut self, atom: &Atom) -> CodegenResult<Vec<CodeInstr>> {
        let span = atom.span;
        let code = match atom.kind {
            AtomKind::Int => vec![Code::Push(decode::decode_int(atom)?).at(span)],
            AtomKind::Char => vec![Code::Push(decode::decode_char(atom)?).at(span)],
            AtomKind::Str => {
                let label = mem::label("str", span);
                let mut data = vec![Data::Label(label.clone()).at(span)];
                data.extend(
                    decode::decode_str(atom)?
                        .into_iter()
                        .map(|word| Data::Word(word).at(span)),
                );
                self.record_data(atom.id, data);
                vec![Code::Name(label).at(span)]
            }
        };
        Ok(self.record_code(atom.id, code))
    }

    fn emit_var(&mut self, var: &VarExpr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let mut code = self.var_addr(var, ctx)?;
        code.push(Code::Load.at(var.span));
        Ok(self.record_code(var.id, code))
    }

    /// Address of a variable or parameter
    ///
    /// A frame-relative variable is reached by following the static link
    /// once per level between the current function and the owner.
    pub(super) fn var_addr(&self, var: &VarExpr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let span = var.span;
        let access = self.layout.access(var.def).ok_or_else(|| {
            CodegenError::internal(format!(
                "`{}` at {} refers to {}, which has no access",
                var.name, span, var.def
            ))
        })?;
        match access {
            Access::Rel(rel) => {
                let hops = ctx.frame.depth.checked_sub(rel.depth).ok_or_else(|| {
                    CodegenError::internal(format!(
                        "`{}` at {} lives at depth {}, below the current function at depth {}",
                        var.name, span, rel.depth, ctx.frame.depth
                    ))
                })?;
                let mut code = vec![Code::RegFp.at(span)];
                code.extend((0..hops).map(|_| Code::Load.at(span)));
                code.push(Code::Push(rel.offset).at(span));
                code.push(Code::Oper(Oper::Add).at(span));
                Ok(code)
            }
            Access::Abs(abs) => Ok(vec![Code::Name(abs.label.clone()).at(span)]),
        }
    }

    /// Arguments in reverse order, then the callee's static link, then
    /// the call
    fn emit_call(&mut self, call: &CallExpr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let span = call.span;
        let layout = self.layout;
        let Some(callee) = layout.frame(call.def) else {
            return Err(match layout.access(call.def) {
                Some(_) => CodegenError::at(
                    error_codes::NOT_CALLABLE,
                    format!("cannot call non-function `{}`", call.name),
                    span,
                ),
                None => CodegenError::internal(format!(
                    "call of `{}` at {} refers to {}, which is not a definition",
                    call.name, span, call.def
                )),
            });
        };

        let mut code = Vec::new();
        for arg in call.args.iter().rev() {
            code.extend(self.emit_expr(arg, ctx)?);
        }

        let hops = (ctx.frame.depth + 1).checked_sub(callee.depth).ok_or_else(|| {
            CodegenError::internal(format!(
                "`{}` at depth {} is not visible from depth {}",
                call.name, callee.depth, ctx.frame.depth
            ))
        })?;
        code.push(Code::RegFp.at(span));
        code.extend((0..hops).map(|_| Code::Load.at(span)));
        code.push(Code::Name(callee.label.clone()).at(span));
        code.push(Code::Call(Some(callee.clone())).at(span));
        Ok(self.record_code(call.id, code))
    }

    fn emit_unary(&mut self, unary: &UnaryExpr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let span = unary.span;
        let code = match unary.op {
            UnaryOp::Plus => self.emit_expr(&unary.expr, ctx)?,
            UnaryOp::Minus => {
                let mut code = self.emit_expr(&unary.expr, ctx)?;
                code.push(Code::Oper(Oper::Neg).at(span));
                code
            }
            UnaryOp::Not => {
                let mut code = self.emit_expr(&unary.expr, ctx)?;
                code.push(Code::Oper(Oper::Not).at(span));
                code
            }
            UnaryOp::Deref => {
                let mut code = self.emit_expr(&unary.expr, ctx)?;
                code.push(Code::Load.at(span));
                code
            }
            UnaryOp::AddrOf => match unary.expr.as_ref() {
                Expr::Var(var) => {
                    // the operand's fragment is its address, not its value
                    let addr = self.var_addr(var, ctx)?;
                    self.record_code(var.id, addr)
                }
                other => {
                    return Err(CodegenError::at(
                        error_codes::ADDRESS_OF_NON_VARIABLE,
                        "cannot take address of non-variable expression",
                        other.span(),
                    ))
                }
            },
        };
        Ok(self.record_code(unary.id, code))
    }

    fn emit_binary(&mut self, binary: &BinaryExpr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let code = match binary.op {
            BinaryOp::Or => self.emit_or(binary, ctx)?,
            BinaryOp::And => self.emit_and(binary, ctx)?,
            op => {
                let mut code = self.emit_expr(&binary.left, ctx)?;
                code.extend(self.emit_expr(&binary.right, ctx)?);
                code.push(Code::Oper(Oper::from(op)).at(binary.span));
                code
            }
        };
        Ok(self.record_code(binary.id, code))
    }

    /// `a or b`: a true left operand yields 1 without evaluating `b`
    ///
    /// ```text
    ///       <a>
    ///       NAME or:true; NAME or:rhs; CJMP
    /// or:rhs:
    ///       PUSH 0; <b>; OPER OR
    ///       NAME or:join; UJMP
    /// or:true:
    ///       PUSH 1
    /// or:join:
    /// ```
    fn emit_or(&mut self, binary: &BinaryExpr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let span = binary.span;
        let rhs_label = mem::label("or:rhs", span);
        let true_label = mem::label("or:true", span);
        let join_label = mem::label("or:join", span);

        let mut code = self.emit_expr(&binary.left, ctx)?;
        code.push(Code::Name(true_label.clone()).at(span));
        code.push(Code::Name(rhs_label.clone()).at(span));
        code.push(Code::Cjmp.at(span));
        code.push(Code::Label(rhs_label).at(span));
        code.push(Code::Push(0).at(span));
        code.extend(self.emit_expr(&binary.right, ctx)?);
        code.push(Code::Oper(Oper::Or).at(span));
        code.push(Code::Name(join_label.clone()).at(span));
        code.push(Code::Ujmp.at(span));
        code.push(Code::Label(true_label).at(span));
        code.push(Code::Push(1).at(span));
        code.push(Code::Label(join_label).at(span));
        Ok(code)
    }

    /// `a and b`: a false left operand yields 0 without evaluating `b`
    fn emit_and(&mut self, binary: &BinaryExpr, ctx: &Ctx<'_>) -> CodegenResult<Vec<CodeInstr>> {
        let span = binary.span;
        let rhs_label = mem::label("and:rhs", span);
        let false_label = mem::label("and:false", span);
        let join_label = mem::label("and:join", span);

        let mut code = self.emit_expr(&binary.left, ctx)?;
        code.push(Code::Name(rhs_label.clone()).at(span));
        code.push(Code::Name(false_label.clone()).at(span));
        code.push(Code::Cjmp.at(span));
        code.push(Code::Label(rhs_label).at(span));
        code.push(Code::Push(1).at(span));
        code.extend(self.emit_expr(&binary.right, ctx)?);
        code.push(Code::Oper(Oper::And).at(span));
        code.push(Code::Name(join_label.clone()).at(span));
        code.push(Code::Ujmp.at(span));
        code.push(Code::Label(false_label).at(span));
        code.push(Code::Push(0).at(span));
        code.push(Code::Label(join_label).at(span));
        Ok(code)
    }
}
