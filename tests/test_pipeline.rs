//! End-to-end pipeline tests: phase routing, the stable diagnostic format,
//! and cross-phase behavior.

use minilang::compiler::{emit_python, interpret_capture, parse_source, run_frontend};
use minilang::diagnostics::Phase;
use minilang::lexer::tokenize;
use minilang::pretty::{print_ast, print_symbols, print_tokens};

// ---------------------------------------------------------------------------
// Diagnostic format, one scenario per phase
// ---------------------------------------------------------------------------

#[test]
fn test_lexical_error_format() {
    let err = tokenize("int x = @;").unwrap_err();
    assert_eq!(err.phase, Phase::Lexical);
    assert_eq!(
        err.to_string(),
        "Lexical error at line 1, column 9: unexpected character '@'"
    );
}

#[test]
fn test_syntactic_error_format() {
    let err = parse_source("int x = 10\nprint(x);").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Syntactic error at line 2, column 1: expected ';', found 'print'"
    );
}

#[test]
fn test_semantic_error_format() {
    let errors = run_frontend("int x = 1;\nprint(x + y);").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Semantic error at line 2, column 11: undeclared name 'y'"
    );
}

#[test]
fn test_runtime_error_format() {
    let errors = interpret_capture("int[3] a = [1, 2, 3];\nprint(a[5]);", "").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Runtime error at line 2, column 7: index 5 out of bounds for array of length 3"
    );
}

// ---------------------------------------------------------------------------
// Cross-phase propagation
// ---------------------------------------------------------------------------

#[test]
fn test_lexical_error_stops_the_pipeline() {
    let errors = run_frontend("print(@);").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].phase, Phase::Lexical);
}

#[test]
fn test_syntactic_error_stops_the_pipeline() {
    let errors = run_frontend("print(1)").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].phase, Phase::Syntactic);
}

#[test]
fn test_semantic_errors_are_batched() {
    let errors = run_frontend("print(a);\nprint(b);\nprint(c);").unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|e| e.phase == Phase::Semantic));
}

#[test]
fn test_semantic_failure_blocks_interpretation() {
    let errors = interpret_capture("print(undefined_name);", "").unwrap_err();
    assert_eq!(errors[0].phase, Phase::Semantic);
}

// ---------------------------------------------------------------------------
// Printers
// ---------------------------------------------------------------------------

#[test]
fn test_token_listing() {
    let tokens = tokenize("int x = 42;").unwrap();
    let listing = print_tokens(&tokens);
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "IntType 'int' at 1:1");
    assert_eq!(lines[1], "Identifier 'x' at 1:5");
    assert_eq!(lines[2], "Assign '=' at 1:7");
    assert_eq!(lines[3], "IntLiteral '42' at 1:9");
    assert_eq!(lines[4], "Semicolon ';' at 1:11");
    assert_eq!(lines[5], "Eof at 1:12");
}

#[test]
fn test_ast_tree_shape() {
    let program = parse_source("int x = 1 + 2;").unwrap();
    let tree = print_ast(&program);
    let expected = [
        "Program",
        "└── VarDeclaration: int x",
        "    └── Initializer:",
        "        └── BinaryOp: +",
        "            ├── Left:",
        "            │   └── Literal: 1 (int)",
        "            └── Right:",
        "                └── Literal: 2 (int)",
    ];
    assert_eq!(tree.lines().collect::<Vec<_>>(), expected);
}

#[test]
fn test_ast_tree_for_function() {
    let program = parse_source("function f(int n): int { return n; }").unwrap();
    let tree = print_ast(&program);
    assert!(tree.contains("FunctionDeclaration: f(int n) -> int"));
    assert!(tree.contains("ReturnStatement"));
    assert!(tree.contains("Identifier: n"));
}

#[test]
fn test_symbol_table_listing() {
    let frontend = run_frontend(
        r#"
int x = 1;
function dobro(int n): int {
    return n * 2;
}
"#,
    )
    .unwrap();
    let listing = print_symbols(&frontend.analysis);
    assert!(listing.starts_with("Scope (level 0):\n"));
    assert!(listing.contains("  dobro: function(int n) -> int\n"));
    assert!(listing.contains("  x: int\n"));
    // the function body scope is a child holding the parameter
    assert!(listing.contains("  Scope (level 1):\n"));
    assert!(listing.contains("    n: int\n"));
}

#[test]
fn test_symbol_table_nested_scopes() {
    let frontend = run_frontend("int a = 1;\n{\n    bool inner = true;\n}").unwrap();
    let listing = print_symbols(&frontend.analysis);
    assert!(listing.contains("  a: int\n"));
    assert!(listing.contains("    inner: bool\n"));
}

// ---------------------------------------------------------------------------
// Emission next to interpretation
// ---------------------------------------------------------------------------

#[test]
fn test_emitted_python_parallels_interpreter_output() {
    // The emitted source for a print-only program carries the same
    // literal values the interpreter prints, including the truncating
    // modulo form Python's own % would get wrong.
    let src = r#"
int x = 6;
print(x * 7);
print(-7 % 2);
print("ok");
"#;
    let interpreted = interpret_capture(src, "").unwrap();
    assert_eq!(interpreted, "42\n-1\nok\n");

    let python = emit_python(src).unwrap();
    assert!(python.contains("import math"));
    assert!(python.contains("x = 6"));
    assert!(python.contains("print((x * 7))"));
    assert!(python.contains("print(int(math.fmod((- 7), 2)))"));
    assert!(python.contains(r#"print("ok")"#));
}

#[test]
fn test_emission_fails_on_semantic_errors() {
    let errors = emit_python("print(missing);").unwrap_err();
    assert_eq!(errors[0].phase, Phase::Semantic);
}
