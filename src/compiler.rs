// Mini-Lang pipeline driver.
//
// Orchestrates the phases: tokenize -> parse -> analyze, and from there
// either interpretation or Python emission. Each phase takes its input as
// an explicit parameter and returns its output; there is no global state.

use std::io::Cursor;

use crate::analyzer::{self, Analysis};
use crate::ast::Program;
use crate::diagnostics::Diagnostic;
use crate::interpreter::Interpreter;
use crate::{codegen, lexer, parser};

/// Result of running the front-end phases on a source text: the fully
/// annotated AST plus the symbol and function tables.
#[derive(Debug)]
pub struct Frontend {
    pub program: Program,
    pub analysis: Analysis,
}

/// Tokenize and parse only. The first lexical or syntactic error aborts.
pub fn parse_source(source: &str) -> Result<Program, Diagnostic> {
    let tokens = lexer::tokenize(source)?;
    parser::parse(&tokens)
}

/// Run the full front-end: tokenize, parse, analyze.
///
/// Lexical and syntactic errors arrive one at a time; semantic analysis
/// batches everything it finds.
pub fn run_frontend(source: &str) -> Result<Frontend, Vec<Diagnostic>> {
    let tokens = lexer::tokenize(source).map_err(|e| vec![e])?;
    let mut program = parser::parse(&tokens).map_err(|e| vec![e])?;
    let analysis = analyzer::analyze(&mut program)?;
    Ok(Frontend { program, analysis })
}

/// Run the front-end and emit equivalent Python source.
pub fn emit_python(source: &str) -> Result<String, Vec<Diagnostic>> {
    let frontend = run_frontend(source)?;
    Ok(codegen::emit_python(&frontend.program))
}

/// Run the whole pipeline and interpret, feeding `stdin` to `input(...)`
/// and capturing everything the program prints.
pub fn interpret_capture(source: &str, stdin: &str) -> Result<String, Vec<Diagnostic>> {
    let Frontend { program, analysis } = run_frontend(source)?;
    let mut out: Vec<u8> = Vec::new();
    Interpreter::new(&program, &analysis, Cursor::new(stdin.as_bytes()), &mut out)
        .run()
        .map_err(|e| vec![e])?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
