//! Shared test utilities
//!
//! Sample programs built with `AstBuilder`, and a stack-height simulator
//! for checking the shape of emitted fragments.

#![allow(dead_code)]

use pins_backend::ast::*;
use pins_backend::builder::AstBuilder;
use pins_backend::{compile, CodeInstr, Code, CodegenConfig, Segments};
use std::collections::HashMap;

/// Compile with the default configuration, panicking on error
pub fn compile_ok(program: &Program) -> Segments {
    match compile(program, &CodegenConfig::default()) {
        Ok(segments) => segments,
        Err(err) => panic!("Compilation failed: {}", err),
    }
}

/// Rendered instructions of the code segment
pub fn code_text(segments: &Segments) -> Vec<String> {
    segments.code.iter().map(ToString::to_string).collect()
}

/// Rendered instructions of the data segment
pub fn data_text(segments: &Segments) -> Vec<String> {
    segments.data.iter().map(ToString::to_string).collect()
}

/// `var x = 2, fun main() x`
pub fn global_x_program() -> Program {
    let mut b = AstBuilder::new();
    let two = b.int("2");
    let init = b.scalar_init(two);
    let x = b.var("x", vec![init]);
    let use_x = b.var_ref("x", x.id);
    let body = b.expr_stmt(use_x);
    let main_id = b.id();
    let main = b.fun(main_id, "main", vec![], vec![body]);
    b.program(vec![x.into(), main.into()])
}

/// A program touching every construct:
///
/// ```text
/// var count = 10
/// fun putint(n)
/// fun main() =
///   let var i = 0  var s = 2 * "ab"
///       fun inc(k) = i = i + k, i
///   in
///     while i < count and !(i == 5) do
///       inc(1),
///       if i % 2 == 0 or i > 7 then putint(i) else putint((^s)^) end
///     end,
///     if i > 0 then putint("done") end,
///     i
///   end
/// ```
pub fn sample_program() -> Program {
    let mut b = AstBuilder::new();

    let ten = b.int("10");
    let count_init = b.scalar_init(ten);
    let count = b.var("count", vec![count_init]);
    b.newline();

    let putint_param = b.param("n");
    let putint_id = b.id();
    let putint = b.fun(putint_id, "putint", vec![putint_param], vec![]);
    b.newline();

    let zero = b.int("0");
    let i_init = b.scalar_init(zero);
    let i = b.var("i", vec![i_init]);
    let two = b.int("2");
    let ab = b.str("\"ab\"");
    let s_init = b.init(two, ab);
    let s = b.var("s", vec![s_init]);
    b.newline();

    let k = b.param("k");
    let k_id = k.id;
    let i_dst = b.var_ref("i", i.id);
    let i_use = b.var_ref("i", i.id);
    let k_use = b.var_ref("k", k_id);
    let sum = b.binary(BinaryOp::Add, i_use, k_use);
    let bump = b.assign(i_dst, sum);
    let i_result = b.var_ref("i", i.id);
    let result = b.expr_stmt(i_result);
    let inc_id = b.id();
    let inc = b.fun(inc_id, "inc", vec![k], vec![bump, result]);
    b.newline();

    let i_use = b.var_ref("i", i.id);
    let count_use = b.var_ref("count", count.id);
    let lt = b.binary(BinaryOp::Lt, i_use, count_use);
    let i_use = b.var_ref("i", i.id);
    let five = b.int("5");
    let eq = b.binary(BinaryOp::Eq, i_use, Expr::Atom(five));
    let not = b.unary(UnaryOp::Not, eq);
    let cond = b.binary(BinaryOp::And, lt, not);
    b.newline();

    let one = b.int("1");
    let call_inc = b.call("inc", inc_id, vec![Expr::Atom(one)]);
    let inc_stmt = b.expr_stmt(call_inc);
    b.newline();

    let i_use = b.var_ref("i", i.id);
    let two = b.int("2");
    let rem = b.binary(BinaryOp::Mod, i_use, Expr::Atom(two));
    let zero = b.int("0");
    let even = b.binary(BinaryOp::Eq, rem, Expr::Atom(zero));
    let i_use = b.var_ref("i", i.id);
    let seven = b.int("7");
    let big = b.binary(BinaryOp::Gt, i_use, Expr::Atom(seven));
    let test = b.binary(BinaryOp::Or, even, big);
    let i_use = b.var_ref("i", i.id);
    let put_i = b.call("putint", putint_id, vec![i_use]);
    let then_stmt = b.expr_stmt(put_i);
    let s_use = b.var_ref("s", s.id);
    let addr = b.unary(UnaryOp::AddrOf, s_use);
    let first = b.unary(UnaryOp::Deref, addr);
    let put_s = b.call("putint", putint_id, vec![first]);
    let else_stmt = b.expr_stmt(put_s);
    let branch = b.if_else(test, vec![then_stmt], vec![else_stmt]);
    let body = b.while_do(cond, vec![inc_stmt, branch]);
    b.newline();

    let i_use = b.var_ref("i", i.id);
    let zero = b.int("0");
    let pos = b.binary(BinaryOp::Gt, i_use, Expr::Atom(zero));
    let done = b.str("\"done\"");
    let put_done = b.call("putint", putint_id, vec![Expr::Atom(done)]);
    let done_stmt = b.expr_stmt(put_done);
    let report = b.if_then(pos, vec![done_stmt]);
    b.newline();

    let i_use = b.var_ref("i", i.id);
    let value = b.expr_stmt(i_use);
    let block = b.let_in(
        vec![i.into(), s.into(), inc.into()],
        vec![body, report, value],
    );
    let main_id = b.id();
    let main = b.fun(main_id, "main", vec![], vec![block]);

    b.program(vec![count.into(), putint.into(), main.into()])
}

/// Every function definition, nested ones included, in pre-order
pub fn functions(program: &Program) -> Vec<&FunDef> {
    fn in_defs<'p>(defs: &'p [Def], out: &mut Vec<&'p FunDef>) {
        for def in defs {
            if let Def::Fun(fun) = def {
                out.push(fun);
                in_stmts(&fun.stmts, out);
            }
        }
    }
    fn in_stmts<'p>(stmts: &'p [Stmt], out: &mut Vec<&'p FunDef>) {
        for stmt in stmts {
            match stmt {
                Stmt::Let(block) => {
                    in_defs(&block.defs, out);
                    in_stmts(&block.stmts, out);
                }
                Stmt::If(stmt) => {
                    in_stmts(&stmt.then_stmts, out);
                    in_stmts(&stmt.else_stmts, out);
                }
                Stmt::While(stmt) => in_stmts(&stmt.stmts, out),
                Stmt::Expr(_) | Stmt::Assign(_) => {}
            }
        }
    }
    let mut out = Vec::new();
    in_defs(&program.defs, &mut out);
    out
}

/// Every expression statement in a list of statements, recursively
pub fn expr_stmts(stmts: &[Stmt]) -> Vec<&ExprStmt> {
    let mut out = Vec::new();
    for stmt in stmts {
        match stmt {
            Stmt::Expr(stmt) => out.push(stmt),
            Stmt::Let(block) => out.extend(expr_stmts(&block.stmts)),
            Stmt::If(stmt) => {
                out.extend(expr_stmts(&stmt.then_stmts));
                out.extend(expr_stmts(&stmt.else_stmts));
            }
            Stmt::While(stmt) => out.extend(expr_stmts(&stmt.stmts)),
            Stmt::Assign(_) => {}
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Val {
    Label(String),
    Int(i32),
    Unknown,
}

fn pop(stack: &mut Vec<Val>) -> Val {
    stack.pop().expect("stack underflow")
}

fn pop_label(stack: &mut Vec<Val>) -> String {
    match pop(stack) {
        Val::Label(label) => label,
        other => panic!("Expected a label address, got {:?}", other),
    }
}

/// Stack height (in words) a fragment leaves behind, checked along every
/// control flow path
///
/// A path ends by falling off the end of the fragment or at `RETN` (after
/// its parameter-area operand is popped). `PUSH 1; POPN` drops one word;
/// a negative `POPN` operand reserves locals and does not touch the
/// expression stack. Panics if two paths disagree.
pub fn stack_effect(fragment: &[CodeInstr]) -> usize {
    let mut labels: HashMap<&str, usize> = HashMap::new();
    for (pc, instr) in fragment.iter().enumerate() {
        if let Code::Label(label) = &instr.kind {
            labels.entry(label.as_str()).or_insert(pc);
        }
    }
    let target = |label: &str| -> usize {
        *labels
            .get(label)
            .unwrap_or_else(|| panic!("Jump to label {} outside the fragment", label))
    };

    let mut seen: HashMap<usize, usize> = HashMap::new();
    let mut result: Option<usize> = None;
    let mut end_path = |height: usize| match result {
        Some(previous) => assert_eq!(previous, height, "Paths end at different heights"),
        None => result = Some(height),
    };
    let mut work = vec![(0usize, Vec::<Val>::new())];

    while let Some((mut pc, mut stack)) = work.pop() {
        loop {
            if pc == fragment.len() {
                end_path(stack.len());
                break;
            }
            if let Some(&height) = seen.get(&pc) {
                assert_eq!(height, stack.len(), "Stack height mismatch at {}", pc);
                break;
            }
            seen.insert(pc, stack.len());

            let kind = &fragment[pc].kind;
            pc += 1;
            match kind {
                Code::Label(_) => {}
                Code::Name(label) => stack.push(Val::Label(label.clone())),
                Code::Push(value) => stack.push(Val::Int(*value)),
                Code::RegFp => stack.push(Val::Unknown),
                Code::Load => {
                    pop(&mut stack);
                    stack.push(Val::Unknown);
                }
                Code::Save | Code::Init => {
                    pop(&mut stack);
                    pop(&mut stack);
                }
                Code::Oper(oper) => {
                    for _ in 0..oper.arity() {
                        pop(&mut stack);
                    }
                    stack.push(Val::Unknown);
                }
                Code::PopN => match pop(&mut stack) {
                    Val::Int(1) => {
                        pop(&mut stack);
                    }
                    Val::Int(n) if n < 0 => {}
                    other => panic!("Unexpected POPN operand {:?}", other),
                },
                Code::Ujmp => {
                    let label = pop_label(&mut stack);
                    pc = target(&label);
                }
                Code::Cjmp => {
                    let if_false = pop_label(&mut stack);
                    let if_true = pop_label(&mut stack);
                    pop(&mut stack);
                    work.push((target(&if_false), stack.clone()));
                    pc = target(&if_true);
                }
                Code::Call(frame) => {
                    pop_label(&mut stack);
                    pop(&mut stack);
                    let args = frame.as_ref().map_or(0, |f| f.arguments_size() / 4);
                    for _ in 0..args {
                        pop(&mut stack);
                    }
                    stack.push(Val::Unknown);
                }
                Code::Retn(_) => {
                    match pop(&mut stack) {
                        Val::Int(_) => {}
                        other => panic!("RETN expects the parameter-area size, got {:?}", other),
                    }
                    end_path(stack.len());
                    break;
                }
            }
        }
    }
    result.expect("No path reaches the end of the fragment")
}
