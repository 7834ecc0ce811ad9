//! Python source emitter.
//!
//! A structural walk over the annotated AST producing equivalent Python.
//! The annotations left by the analyzer make the places where Mini-Lang
//! and Python semantics drift explicit: widening sites become `float(...)`
//! calls, integer division becomes `//`, modulo becomes the truncating
//! `math.fmod` form, and functions that assign to globals declare them
//! with `global`.

use std::collections::BTreeSet;

use crate::ast::*;
use crate::interpreter::format_float;
use crate::types::Type;

/// Emit runnable Python for an analyzed program.
pub fn emit_python(program: &Program) -> String {
    let mut emitter = Emitter::new();
    emitter.emit_program(program);
    emitter.finish()
}

struct Emitter {
    lines: Vec<String>,
    indent: usize,
}

impl Emitter {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            indent: 0,
        }
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{text}", "    ".repeat(self.indent)));
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn emit_program(&mut self, program: &Program) {
        self.line("# generated from Mini-Lang source");
        if program.statements.iter().any(stmt_uses_modulo) {
            self.line("import math");
        }
        self.line("");
        for stmt in &program.statements {
            self.emit_statement(stmt);
            if matches!(stmt.kind, StatementKind::FunctionDecl { .. }) {
                self.line("");
            }
        }
    }

    fn emit_statement(&mut self, stmt: &Statement) {
        match &stmt.kind {
            StatementKind::VarDecl {
                declared_type,
                name,
                initializer,
                ..
            } => match initializer {
                Some(init) => {
                    let value = expr_py(init);
                    self.line(format!("{name} = {value}"));
                }
                None => {
                    let value = default_py(declared_type);
                    self.line(format!("{name} = {value}"));
                }
            },

            StatementKind::FunctionDecl {
                name, params, body, ..
            } => {
                let params: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                self.line(format!("def {name}({}):", params.join(", ")));
                self.indent += 1;
                // Python treats any assigned name as function-local, so
                // writes that resolved to the program scope need an
                // explicit global declaration.
                let mut globals = BTreeSet::new();
                collect_global_writes(body, &mut globals);
                if !globals.is_empty() {
                    let names: Vec<&str> = globals.iter().map(String::as_str).collect();
                    self.line(format!("global {}", names.join(", ")));
                }
                if body.statements.is_empty() {
                    self.line("pass");
                } else {
                    self.emit_block(body);
                }
                self.indent -= 1;
            }

            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.line(format!("if {}:", expr_py(condition)));
                self.indent += 1;
                if then_branch.statements.is_empty() {
                    self.line("pass");
                } else {
                    self.emit_block(then_branch);
                }
                self.indent -= 1;
                if let Some(else_branch) = else_branch {
                    self.line("else:");
                    self.indent += 1;
                    if else_branch.statements.is_empty() {
                        self.line("pass");
                    } else {
                        self.emit_block(else_branch);
                    }
                    self.indent -= 1;
                }
            }

            StatementKind::While { condition, body } => {
                self.line(format!("while {}:", expr_py(condition)));
                self.indent += 1;
                if body.statements.is_empty() {
                    self.line("pass");
                } else {
                    self.emit_block(body);
                }
                self.indent -= 1;
            }

            // `for` lowers to init + `while` with the step re-emitted at
            // the end of the body, preserving evaluation order.
            StatementKind::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                self.emit_statement(init);
                self.line(format!("while {}:", expr_py(condition)));
                self.indent += 1;
                self.emit_block(body);
                self.emit_expr_statement(step);
                self.indent -= 1;
            }

            StatementKind::Return { value } => match value {
                Some(value) => self.line(format!("return {}", expr_py(value))),
                None => self.line("return"),
            },

            StatementKind::Print { value } => {
                self.line(format!("print({})", expr_py(value)));
            }

            StatementKind::ExprStmt { expression } => {
                self.emit_expr_statement(expression);
            }

            // Python has no block scope; the statements are emitted inline.
            StatementKind::Block { block } => {
                self.emit_block(block);
            }
        }
    }

    fn emit_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.emit_statement(stmt);
        }
    }

    /// Assignments in statement position become plain Python assignments
    /// rather than the expression form.
    fn emit_expr_statement(&mut self, expr: &Expr) {
        if let ExprKind::Assign { target, value } = &expr.kind {
            let target = lvalue_py(target);
            let value = expr_py(value);
            self.line(format!("{target} = {value}"));
        } else {
            self.line(expr_py(expr));
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn expr_py(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::IntLiteral { value } => value.to_string(),
        ExprKind::FloatLiteral { value } => format_float(*value),
        ExprKind::BoolLiteral { value } => {
            if *value { "True" } else { "False" }.to_string()
        }
        ExprKind::StringLiteral { value } => string_py(value),
        ExprKind::Identifier { name, .. } => name.clone(),

        ExprKind::ArrayLiteral { elements } => {
            let elements: Vec<String> = elements.iter().map(expr_py).collect();
            format!("[{}]", elements.join(", "))
        }

        ExprKind::Unary { op, operand } => {
            format!("({} {})", op.symbol(), expr_py(operand))
        }

        ExprKind::Binary { op, left, right } => {
            // Python's `%` floors toward the divisor's sign; Mini-Lang
            // modulo truncates toward the dividend's, which is what
            // `math.fmod` computes.
            if *op == BinaryOp::Mod {
                let call = format!("math.fmod({}, {})", expr_py(left), expr_py(right));
                return if expr.ty == Some(Type::Int) {
                    format!("int({call})")
                } else {
                    call
                };
            }
            let symbol = match op {
                // Mini-Lang int division truncates; Python's `/` would
                // produce a float, so integer-typed division uses `//`.
                BinaryOp::Div if expr.ty == Some(Type::Int) => "//",
                other => other.symbol(),
            };
            format!("({} {symbol} {})", expr_py(left), expr_py(right))
        }

        ExprKind::Index { target, index } => {
            format!("{}[{}]", expr_py(target), expr_py(index))
        }

        ExprKind::Call {
            name, arguments, ..
        } => {
            let args: Vec<String> = arguments.iter().map(expr_py).collect();
            format!("{name}({})", args.join(", "))
        }

        ExprKind::Input { prompt } => match prompt {
            Some(prompt) => format!("input({})", expr_py(prompt)),
            None => "input()".to_string(),
        },

        // Statement-position assignments are handled by the emitter; a
        // nested assignment to a name becomes a named expression.
        ExprKind::Assign { target, value } => match target {
            LValue::Name { name, .. } => format!("({name} := {})", expr_py(value)),
            LValue::Index { .. } => format!("{} = {}", lvalue_py(target), expr_py(value)),
        },

        ExprKind::Coerce { operand } => format!("float({})", expr_py(operand)),
    }
}

fn lvalue_py(target: &LValue) -> String {
    match target {
        LValue::Name { name, .. } => name.clone(),
        LValue::Index { name, index, .. } => format!("{name}[{}]", expr_py(index)),
    }
}

fn string_py(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn default_py(ty: &Type) -> String {
    match ty {
        Type::Int => "0".to_string(),
        Type::Float => "0.0".to_string(),
        Type::Bool => "False".to_string(),
        Type::String => "''".to_string(),
        Type::Array { element, size } => {
            format!("[{}] * {}", default_py(element), size.unwrap_or(0))
        }
        Type::Void => "None".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Body scans
// ---------------------------------------------------------------------------

/// Names assigned anywhere in a function body whose binding resolved to
/// the program scope. Item stores (`a[i] = v`) only read the name and do
/// not need a declaration.
fn collect_global_writes(block: &Block, names: &mut BTreeSet<String>) {
    for stmt in &block.statements {
        scan_stmt_writes(stmt, names);
    }
}

fn scan_stmt_writes(stmt: &Statement, names: &mut BTreeSet<String>) {
    match &stmt.kind {
        StatementKind::VarDecl { initializer, .. } => {
            if let Some(init) = initializer {
                scan_expr_writes(init, names);
            }
        }
        StatementKind::FunctionDecl { .. } => {}
        StatementKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            scan_expr_writes(condition, names);
            collect_global_writes(then_branch, names);
            if let Some(else_branch) = else_branch {
                collect_global_writes(else_branch, names);
            }
        }
        StatementKind::While { condition, body } => {
            scan_expr_writes(condition, names);
            collect_global_writes(body, names);
        }
        StatementKind::For {
            init,
            condition,
            step,
            body,
            ..
        } => {
            scan_stmt_writes(init, names);
            scan_expr_writes(condition, names);
            scan_expr_writes(step, names);
            collect_global_writes(body, names);
        }
        StatementKind::Return { value } => {
            if let Some(value) = value {
                scan_expr_writes(value, names);
            }
        }
        StatementKind::Print { value } => scan_expr_writes(value, names),
        StatementKind::ExprStmt { expression } => scan_expr_writes(expression, names),
        StatementKind::Block { block } => collect_global_writes(block, names),
    }
}

fn scan_expr_writes(expr: &Expr, names: &mut BTreeSet<String>) {
    match &expr.kind {
        ExprKind::Assign { target, value } => {
            match target {
                LValue::Name {
                    name,
                    binding: Some(binding),
                    ..
                } if binding.scope == 0 => {
                    names.insert(name.clone());
                }
                LValue::Index { index, .. } => scan_expr_writes(index, names),
                LValue::Name { .. } => {}
            }
            scan_expr_writes(value, names);
        }
        ExprKind::Unary { operand, .. } | ExprKind::Coerce { operand } => {
            scan_expr_writes(operand, names);
        }
        ExprKind::Binary { left, right, .. } => {
            scan_expr_writes(left, names);
            scan_expr_writes(right, names);
        }
        ExprKind::Index { target, index } => {
            scan_expr_writes(target, names);
            scan_expr_writes(index, names);
        }
        ExprKind::Call { arguments, .. } => {
            for arg in arguments {
                scan_expr_writes(arg, names);
            }
        }
        ExprKind::ArrayLiteral { elements } => {
            for element in elements {
                scan_expr_writes(element, names);
            }
        }
        ExprKind::Input { prompt } => {
            if let Some(prompt) = prompt {
                scan_expr_writes(prompt, names);
            }
        }
        ExprKind::IntLiteral { .. }
        | ExprKind::FloatLiteral { .. }
        | ExprKind::BoolLiteral { .. }
        | ExprKind::StringLiteral { .. }
        | ExprKind::Identifier { .. } => {}
    }
}

/// Whether any `%` appears, which decides the `import math` header line.
fn stmt_uses_modulo(stmt: &Statement) -> bool {
    match &stmt.kind {
        StatementKind::VarDecl { initializer, .. } => {
            initializer.as_ref().is_some_and(expr_uses_modulo)
        }
        StatementKind::FunctionDecl { body, .. } => block_uses_modulo(body),
        StatementKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            expr_uses_modulo(condition)
                || block_uses_modulo(then_branch)
                || else_branch.as_ref().is_some_and(block_uses_modulo)
        }
        StatementKind::While { condition, body } => {
            expr_uses_modulo(condition) || block_uses_modulo(body)
        }
        StatementKind::For {
            init,
            condition,
            step,
            body,
            ..
        } => {
            stmt_uses_modulo(init)
                || expr_uses_modulo(condition)
                || expr_uses_modulo(step)
                || block_uses_modulo(body)
        }
        StatementKind::Return { value } => value.as_ref().is_some_and(expr_uses_modulo),
        StatementKind::Print { value } => expr_uses_modulo(value),
        StatementKind::ExprStmt { expression } => expr_uses_modulo(expression),
        StatementKind::Block { block } => block_uses_modulo(block),
    }
}

fn block_uses_modulo(block: &Block) -> bool {
    block.statements.iter().any(stmt_uses_modulo)
}

fn expr_uses_modulo(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Binary { op, left, right } => {
            *op == BinaryOp::Mod || expr_uses_modulo(left) || expr_uses_modulo(right)
        }
        ExprKind::Unary { operand, .. } | ExprKind::Coerce { operand } => {
            expr_uses_modulo(operand)
        }
        ExprKind::Index { target, index } => {
            expr_uses_modulo(target) || expr_uses_modulo(index)
        }
        ExprKind::Call { arguments, .. } => arguments.iter().any(expr_uses_modulo),
        ExprKind::ArrayLiteral { elements } => elements.iter().any(expr_uses_modulo),
        ExprKind::Input { prompt } => prompt.as_deref().is_some_and(expr_uses_modulo),
        ExprKind::Assign { target, value } => {
            let index_uses = match target {
                LValue::Index { index, .. } => expr_uses_modulo(index),
                LValue::Name { .. } => false,
            };
            index_uses || expr_uses_modulo(value)
        }
        ExprKind::IntLiteral { .. }
        | ExprKind::FloatLiteral { .. }
        | ExprKind::BoolLiteral { .. }
        | ExprKind::StringLiteral { .. }
        | ExprKind::Identifier { .. } => false,
    }
}
