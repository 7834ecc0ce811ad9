use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use minilang::compiler::{self, Frontend};
use minilang::diagnostics::Diagnostic;
use minilang::{codegen, interpreter, lexer, pretty};

/// Compiler and interpreter for the Mini-Lang language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file to compile (.min)
    input: PathBuf,

    /// Write emitted Python source to PATH
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Run the interpreter after successful analysis
    #[arg(short = 'r', long)]
    run: bool,

    /// Print the AST and exit
    #[arg(long)]
    ast: bool,

    /// Print the token stream and exit
    #[arg(long)]
    tokens: bool,

    /// Print the symbol table and exit
    #[arg(long)]
    symbols: bool,
}

fn main() {
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", args.input.display());
            process::exit(1);
        }
    };

    // Inspection modes print one artifact and suppress everything else.
    if args.tokens {
        let tokens = lexer::tokenize(&source).unwrap_or_else(|e| fail(&[e]));
        print!("{}", pretty::print_tokens(&tokens));
        return;
    }

    if args.ast {
        let program = compiler::parse_source(&source).unwrap_or_else(|e| fail(&[e]));
        print!("{}", pretty::print_ast(&program));
        return;
    }

    if args.symbols {
        let frontend = compiler::run_frontend(&source).unwrap_or_else(|e| fail(&e));
        print!("{}", pretty::print_symbols(&frontend.analysis));
        return;
    }

    let Frontend { program, analysis } =
        compiler::run_frontend(&source).unwrap_or_else(|e| fail(&e));

    if let Some(path) = &args.output {
        let python = codegen::emit_python(&program);
        if let Err(e) = fs::write(path, python) {
            eprintln!("error: cannot write {}: {e}", path.display());
            process::exit(1);
        }
    }

    if args.run {
        if let Err(e) = interpreter::run(&program, &analysis) {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

/// Print diagnostics in the stable one-per-line format and exit non-zero.
fn fail<T>(diagnostics: &[Diagnostic]) -> T {
    for d in diagnostics {
        eprintln!("{d}");
    }
    process::exit(1);
}
