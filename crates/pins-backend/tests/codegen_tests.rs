//! End-to-end code generation tests

mod common;

use common::{
    code_text, compile_ok, data_text, expr_stmts, functions, global_x_program, sample_program,
    stack_effect,
};
use pins_backend::assemble::listing;
use pins_backend::ast::*;
use pins_backend::builder::AstBuilder;
use pins_backend::codegen::value_stmt;
use pins_backend::{
    compile, error_codes, generate, organize, Code, CodegenConfig, CodegenError, Data,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::{HashMap, HashSet};

#[test]
fn test_global_variable_end_to_end() {
    let segments = compile_ok(&global_x_program());

    assert_eq!(
        data_text(&segments),
        vec![
            "LABEL init:x@1:4",
            "DATA 1",
            "DATA 1",
            "DATA 1",
            "DATA 2",
            "LABEL global:x@1:4",
            "SIZE 4",
        ]
    );
    assert_eq!(
        code_text(&segments),
        vec![
            "NAME global:x@1:4",
            "NAME init:x@1:4",
            "INIT",
            "PUSH 0",
            "NAME main",
            "CALL main",
            "PUSH 0",
            "NAME exit",
            "CALL",
            "LABEL main",
            "NAME global:x@1:4",
            "LOAD",
            "PUSH 0",
            "RETN main",
        ]
    );
}

#[test]
fn test_global_variable_listing() {
    let segments = compile_ok(&global_x_program());

    insta::assert_snapshot!(listing::render(&segments), @r"
    === Code (45 bytes) ===
      000000  5  NAME global:x@1:4
      000005  5  NAME init:x@1:4
      000010  1  INIT
      000011  5  PUSH 0
      000016  5  NAME main
      000021  1  CALL main
      000022  5  PUSH 0
      000027  5  NAME exit
      000032  1  CALL
    main:
      000033  5  NAME global:x@1:4
      000038  1  LOAD
      000039  5  PUSH 0
      000044  1  RETN main

    === Data (20 bytes) ===
    init:x@1:4:
      000000  4  DATA 1
      000004  4  DATA 1
      000008  4  DATA 1
      000012  4  DATA 2
    global:x@1:4:
      000016  4  SIZE 4
    ");
}

#[test]
fn test_every_instruction_carries_a_span() {
    let segments = compile_ok(&sample_program());
    assert!(segments.code.iter().all(|instr| !instr.span.is_dummy()));
    assert!(segments.data.iter().all(|instr| !instr.span.is_dummy()));
}

#[test]
fn test_discard_balance() {
    let program = sample_program();
    let layout = organize(&program).unwrap();
    let fragments = generate(&program, &layout).unwrap();

    for fun in functions(&program) {
        let Some(code) = fragments.code(fun.id) else {
            assert!(fun.stmts.is_empty(), "{} has a body but no code", fun.name);
            continue;
        };
        let returns_value = value_stmt(&fun.stmts).is_some();
        assert_eq!(
            stack_effect(code),
            usize::from(returns_value),
            "stack effect of {}",
            fun.name
        );

        let value = value_stmt(&fun.stmts);
        for stmt in expr_stmts(&fun.stmts) {
            let expected = if Some(stmt.id) == value { 1 } else { 0 };
            assert_eq!(
                stack_effect(fragments.code(stmt.id).unwrap()),
                expected,
                "statement {} in {}",
                stmt.id,
                fun.name
            );
        }
    }
}

#[test]
fn test_function_ending_in_assignment_returns_nothing() {
    let mut b = AstBuilder::new();
    let zero = b.int("0");
    let init = b.scalar_init(zero);
    let t = b.var("t", vec![init]);
    let dst = b.var_ref("t", t.id);
    let one = b.int("1");
    let assign = b.assign(dst, Expr::Atom(one));
    let block = b.let_in(vec![t.into()], vec![assign]);
    let main_id = b.id();
    let main = b.fun(main_id, "main", vec![], vec![block]);
    let program = b.program(vec![main.into()]);

    let layout = organize(&program).unwrap();
    let fragments = generate(&program, &layout).unwrap();
    assert_eq!(stack_effect(fragments.code(main_id).unwrap()), 0);
}

/// Instructions between `LABEL from` and the next label
fn region<'c>(code: &'c [String], from: &str) -> &'c [String] {
    let start = code
        .iter()
        .position(|line| line == &format!("LABEL {}", from))
        .unwrap_or_else(|| panic!("no label {}", from))
        + 1;
    let len = code[start..]
        .iter()
        .position(|line| line.starts_with("LABEL "))
        .unwrap_or(code.len() - start);
    &code[start..start + len]
}

#[rstest]
#[case(BinaryOp::Or, "or:rhs", "or:true", "PUSH 1")]
#[case(BinaryOp::And, "and:rhs", "and:false", "PUSH 0")]
fn test_short_circuit_right_operand_only_in_rhs_branch(
    #[case] op: BinaryOp,
    #[case] rhs_tag: &str,
    #[case] short_tag: &str,
    #[case] short_value: &str,
) {
    let mut b = AstBuilder::new();
    let l = b.int("11");
    let r = b.int("22");
    let expr = b.binary(op, Expr::Atom(l), Expr::Atom(r));
    let expr_id = expr.id();
    let span = expr.span();
    let stmt = b.expr_stmt(expr);
    let main_id = b.id();
    let main = b.fun(main_id, "main", vec![], vec![stmt]);
    let program = b.program(vec![main.into()]);

    let layout = organize(&program).unwrap();
    let fragments = generate(&program, &layout).unwrap();
    let code: Vec<String> = fragments
        .code(expr_id)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();

    let rhs = region(&code, &format!("{}@{}", rhs_tag, span));
    let short = region(&code, &format!("{}@{}", short_tag, span));
    assert!(rhs.contains(&"PUSH 22".to_string()));
    assert_eq!(short, &[short_value.to_string()]);
    assert_eq!(code.iter().filter(|line| *line == "PUSH 22").count(), 1);
}

#[test]
fn test_labels_are_unique() {
    let segments = compile_ok(&sample_program());

    let mut code_labels: HashMap<&str, usize> = HashMap::new();
    for instr in &segments.code {
        if let Code::Label(label) = &instr.kind {
            *code_labels.entry(label.as_str()).or_default() += 1;
        }
    }
    for (label, count) in &code_labels {
        if label.starts_with("if:then@") {
            assert!(*count <= 2, "{} defined {} times", label, count);
        } else {
            assert_eq!(*count, 1, "{} defined {} times", label, count);
        }
    }

    let mut data_labels = HashSet::new();
    for instr in &segments.data {
        if let Data::Label(label) = &instr.kind {
            assert!(data_labels.insert(label.as_str()), "{} defined twice", label);
            assert!(!code_labels.contains_key(label.as_str()));
        }
    }
}

#[test]
fn test_every_referenced_label_is_defined() {
    let segments = compile_ok(&sample_program());
    let mut defined: HashSet<&str> = HashSet::new();
    for instr in &segments.code {
        if let Code::Label(label) = &instr.kind {
            defined.insert(label);
        }
    }
    for instr in &segments.data {
        if let Data::Label(label) = &instr.kind {
            defined.insert(label);
        }
    }

    let external = ["putint", "exit"];
    for instr in &segments.code {
        if let Code::Name(label) = &instr.kind {
            assert!(
                defined.contains(label.as_str()) || external.contains(&label.as_str()),
                "NAME {} has no definition",
                label
            );
        }
    }
}

#[test]
fn test_sample_segment_order() {
    let segments = compile_ok(&sample_program());
    let code = code_text(&segments);

    // global init, prologue, then main followed by its nested inc
    assert!(code[0].starts_with("NAME global:count@"));
    assert_eq!(&code[3..9], &["PUSH 0", "NAME main", "CALL main", "PUSH 0", "NAME exit", "CALL"]);
    assert_eq!(code[9], "LABEL main");
    let main_end = code.iter().position(|line| line == "RETN main").unwrap();
    assert!(code[main_end + 1].starts_with("LABEL fun:inc@"));
    assert!(code.last().unwrap().starts_with("RETN fun:inc@"));

    let data_labels: Vec<_> = segments
        .data
        .iter()
        .filter_map(|instr| match &instr.kind {
            Data::Label(label) => Some(label.split('@').next().unwrap_or_default().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(
        data_labels,
        vec!["init:count", "global:count", "init:i", "init:s", "str"]
    );
}

#[test]
fn test_local_array_initializer_data() {
    let segments = compile_ok(&sample_program());
    let data = data_text(&segments);
    let start = data.iter().position(|line| line.starts_with("LABEL init:s@")).unwrap();
    assert_eq!(
        &data[start + 1..start + 6],
        &["DATA 1", "DATA 2", "DATA 2", "DATA 97", "DATA 98"]
    );
}

#[test]
fn test_illegal_integer_reports_location() {
    let mut b = AstBuilder::new();
    b.at(4, 9);
    let big = b.int("4294967296");
    let stmt = b.expr_stmt(Expr::Atom(big));
    let main_id = b.id();
    let main = b.fun(main_id, "main", vec![], vec![stmt]);
    let program = b.program(vec![main.into()]);

    let err = compile(&program, &CodegenConfig::default()).unwrap_err();
    let CodegenError::Diagnostic(diag) = &err else {
        panic!("Expected diagnostic, got {:?}", err);
    };
    assert_eq!(diag.code, error_codes::ILLEGAL_INTEGER);
    assert_eq!((diag.line, diag.column), (4, 9));
    assert!(!err.is_internal());
}

#[test]
fn test_illegal_global_initializer_fails_layout() {
    let mut b = AstBuilder::new();
    let count = b.int("-3");
    let value = b.int("0");
    let init = b.init(count, value);
    let arr = b.var("arr", vec![init]);
    let program = b.program(vec![arr.into()]);

    let err = compile(&program, &CodegenConfig::default()).unwrap_err();
    assert_eq!(err.code(), error_codes::ILLEGAL_REPEAT_COUNT);
}

#[test]
fn test_program_survives_json_handover() {
    let program = sample_program();
    let json = program.to_json().unwrap();
    let restored = Program::from_json(&json).unwrap();

    assert_eq!(restored, program);
    assert_eq!(compile_ok(&restored), compile_ok(&program));
}

#[test]
fn test_segments_json() {
    let segments = compile_ok(&global_x_program());
    let json = segments.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["code"].as_array().unwrap().len(), segments.code.len());
    assert_eq!(value["data"][4]["kind"]["Word"], 2);
}
