//! Semantic analysis for Mini-Lang.
//!
//! Two passes over the AST: a pre-pass collects every `function`
//! declaration into the program scope (giving functions mutual and forward
//! visibility), then a full walk type-checks declarations and statements,
//! building child scopes as it descends. Every expression node is annotated
//! with its resolved type, every name with its `(scope, slot)` binding, and
//! implicit `int` to `float` widening is materialized as `Coerce` nodes.
//!
//! Diagnostics are accumulated, not thrown: analysis reports every error it
//! can find before failing.

use std::collections::HashMap;

use crate::ast::*;
use crate::diagnostics::Diagnostic;
use crate::token::Span;
use crate::types::Type;

// ── Symbol table ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Symbol {
    Variable {
        name: String,
        ty: Type,
        is_parameter: bool,
        defined_at: Span,
    },
    Function {
        name: String,
        func: FuncId,
        defined_at: Span,
    },
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable { name, .. } | Symbol::Function { name, .. } => name,
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<u32>,
    symbols: Vec<Symbol>,
    index: HashMap<String, u32>,
}

impl Scope {
    fn new(parent: Option<u32>) -> Self {
        Self {
            parent,
            symbols: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

/// Arena of scopes. Scope 0 is the program scope; children point back at
/// their parent, which is only used for name lookup.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None)],
        }
    }

    pub fn push_scope(&mut self, parent: u32) -> u32 {
        let id = self.scopes.len() as u32;
        self.scopes.push(Scope::new(Some(parent)));
        id
    }

    pub fn scope(&self, id: u32) -> &Scope {
        &self.scopes[id as usize]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Number of value slots the interpreter must reserve for a scope.
    pub fn slot_count(&self, id: u32) -> usize {
        self.scopes[id as usize].symbols.len()
    }

    pub fn symbol(&self, scope: u32, slot: u32) -> &Symbol {
        &self.scopes[scope as usize].symbols[slot as usize]
    }

    /// Declare a symbol in `scope`. Fails when the name already exists in
    /// that same scope; shadowing an enclosing scope is fine.
    pub fn declare(&mut self, scope: u32, symbol: Symbol) -> Result<u32, ()> {
        let s = &mut self.scopes[scope as usize];
        if s.index.contains_key(symbol.name()) {
            return Err(());
        }
        let slot = s.symbols.len() as u32;
        s.index.insert(symbol.name().to_string(), slot);
        s.symbols.push(symbol);
        Ok(slot)
    }

    /// Resolve a name starting from `scope`, walking parent scopes.
    pub fn resolve(&self, scope: u32, name: &str) -> Option<(u32, u32)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id as usize];
            if let Some(&slot) = s.index.get(name) {
                return Some((id, slot));
            }
            current = s.parent;
        }
        None
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Function table ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    /// Index of the declaration in `Program::statements`.
    pub decl_index: usize,
    /// Scope holding the parameters and body declarations. Parameters
    /// occupy the first slots, in declaration order.
    pub body_scope: u32,
}

/// Everything the interpreter and the printers need besides the annotated
/// AST itself.
#[derive(Debug)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub functions: Vec<FunctionInfo>,
}

// ── Semantic analyzer ────────────────────────────────────────────────

pub struct SemanticAnalyzer {
    table: SymbolTable,
    functions: Vec<FunctionInfo>,
    errors: Vec<Diagnostic>,
    current_scope: u32,
    current_function: Option<FuncId>,
}

/// Analyze a parsed program in place. On success the AST is fully
/// annotated; on failure the collected diagnostics are returned and the
/// AST must not be fed to later phases.
pub fn analyze(program: &mut Program) -> Result<Analysis, Vec<Diagnostic>> {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.run(program);
    if analyzer.errors.is_empty() {
        Ok(Analysis {
            symbols: analyzer.table,
            functions: analyzer.functions,
        })
    } else {
        Err(analyzer.errors)
    }
}

impl SemanticAnalyzer {
    fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            functions: Vec::new(),
            errors: Vec::new(),
            current_scope: 0,
            current_function: None,
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(Diagnostic::semantic(span, message));
    }

    fn run(&mut self, program: &mut Program) {
        // Pass 1: collect function declarations into the program scope so
        // declaration order never matters.
        for (i, stmt) in program.statements.iter().enumerate() {
            if let StatementKind::FunctionDecl {
                name,
                params,
                return_type,
                ..
            } = &stmt.kind
            {
                let func = self.functions.len() as FuncId;
                self.functions.push(FunctionInfo {
                    name: name.clone(),
                    params: params.clone(),
                    return_type: return_type.clone(),
                    decl_index: i,
                    body_scope: 0,
                });
                let symbol = Symbol::Function {
                    name: name.clone(),
                    func,
                    defined_at: stmt.span,
                };
                if self.table.declare(0, symbol).is_err() {
                    self.error(stmt.span, format!("duplicate declaration of '{name}'"));
                }
            }
        }

        // Pass 2: check everything.
        let mut next_func: FuncId = 0;
        for stmt in program.statements.iter_mut() {
            let span = stmt.span;
            match &mut stmt.kind {
                StatementKind::FunctionDecl {
                    name,
                    params,
                    return_type,
                    body,
                } => {
                    let func = next_func;
                    next_func += 1;
                    self.check_function(func, span, name, params, return_type, body);
                }
                _ => self.check_statement(stmt),
            }
        }
    }

    // ── Functions ────────────────────────────────────────────────────

    fn check_function(
        &mut self,
        func: FuncId,
        span: Span,
        name: &str,
        params: &[Param],
        return_type: &Type,
        body: &mut Block,
    ) {
        let scope = self.table.push_scope(0);
        body.scope = scope;
        self.functions[func as usize].body_scope = scope;

        self.current_scope = scope;
        self.current_function = Some(func);

        for param in params {
            let symbol = Symbol::Variable {
                name: param.name.clone(),
                ty: param.param_type.clone(),
                is_parameter: true,
                defined_at: span,
            };
            if self.table.declare(scope, symbol).is_err() {
                self.error(span, format!("duplicate parameter '{}'", param.name));
            }
        }

        for stmt in body.statements.iter_mut() {
            self.check_statement(stmt);
        }

        if *return_type != Type::Void && !block_must_return(body) {
            self.error(
                span,
                format!("function '{name}' does not return a value on every path"),
            );
        }

        self.current_function = None;
        self.current_scope = 0;
    }

    // ── Statements ───────────────────────────────────────────────────

    fn check_statement(&mut self, stmt: &mut Statement) {
        let span = stmt.span;
        match &mut stmt.kind {
            StatementKind::VarDecl {
                declared_type,
                name,
                initializer,
                binding,
            } => {
                let declared = declared_type.clone();
                match initializer {
                    Some(init) => {
                        if let Err(Some(found)) = self.check_assignable(init, &declared) {
                            self.error(
                                init.span,
                                format!(
                                    "incompatible type in declaration of '{name}': expected {declared}, found {found}"
                                ),
                            );
                        }
                    }
                    None => {
                        if !has_complete_size(&declared) {
                            self.error(
                                span,
                                format!(
                                    "array declaration of '{name}' requires a size or an initializer"
                                ),
                            );
                        }
                    }
                }

                let symbol = Symbol::Variable {
                    name: name.clone(),
                    ty: declared,
                    is_parameter: false,
                    defined_at: span,
                };
                match self.table.declare(self.current_scope, symbol) {
                    Ok(slot) => {
                        *binding = Some(Binding {
                            scope: self.current_scope,
                            slot,
                        });
                    }
                    Err(()) => {
                        self.error(span, format!("duplicate declaration of '{name}'"));
                    }
                }
            }

            StatementKind::FunctionDecl { .. } => {
                self.error(span, "nested function declarations are not allowed");
            }

            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition, "'if' condition");
                self.check_block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_block(else_branch);
                }
            }

            StatementKind::While { condition, body } => {
                self.check_condition(condition, "'while' condition");
                self.check_block(body);
            }

            StatementKind::For {
                init,
                condition,
                step,
                body,
                header_scope,
            } => {
                let scope = self.table.push_scope(self.current_scope);
                *header_scope = scope;
                let saved = self.current_scope;
                self.current_scope = scope;

                self.check_statement(init);
                self.check_condition(condition, "'for' condition");
                self.infer(step);
                self.check_block(body);

                self.current_scope = saved;
            }

            StatementKind::Return { value } => {
                let Some(func) = self.current_function else {
                    self.error(span, "'return' outside of a function");
                    if let Some(value) = value {
                        self.infer(value);
                    }
                    return;
                };
                let info = &self.functions[func as usize];
                let name = info.name.clone();
                let expected = info.return_type.clone();

                match value {
                    Some(value) => {
                        if expected == Type::Void {
                            self.error(
                                span,
                                format!("void function '{name}' must not return a value"),
                            );
                            self.infer(value);
                        } else if let Err(Some(found)) = self.check_assignable(value, &expected) {
                            self.error(
                                value.span,
                                format!(
                                    "incompatible return type in '{name}': expected {expected}, found {found}"
                                ),
                            );
                        }
                    }
                    None => {
                        if expected != Type::Void {
                            self.error(span, format!("function '{name}' must return {expected}"));
                        }
                    }
                }
            }

            StatementKind::Print { value } => {
                if let Some(ty) = self.infer(value) {
                    if !ty.is_scalar() {
                        self.error(value.span, format!("cannot print a value of type {ty}"));
                    }
                }
            }

            StatementKind::ExprStmt { expression } => {
                self.infer(expression);
            }

            StatementKind::Block { block } => {
                self.check_block(block);
            }
        }
    }

    fn check_block(&mut self, block: &mut Block) {
        let scope = self.table.push_scope(self.current_scope);
        block.scope = scope;
        let saved = self.current_scope;
        self.current_scope = scope;
        for stmt in block.statements.iter_mut() {
            self.check_statement(stmt);
        }
        self.current_scope = saved;
    }

    fn check_condition(&mut self, condition: &mut Expr, what: &str) {
        if let Some(ty) = self.infer(condition) {
            if ty != Type::Bool {
                self.error(condition.span, format!("{what} must be bool, found {ty}"));
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Infer and record the type of an expression. `None` means the type
    /// could not be determined and a diagnostic was already emitted, which
    /// suppresses cascading errors in enclosing expressions.
    fn infer(&mut self, expr: &mut Expr) -> Option<Type> {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::IntLiteral { .. } => Some(Type::Int),
            ExprKind::FloatLiteral { .. } => Some(Type::Float),
            ExprKind::BoolLiteral { .. } => Some(Type::Bool),
            ExprKind::StringLiteral { .. } => Some(Type::String),

            ExprKind::Identifier { name, binding } => match self.resolve_variable(span, name) {
                Ok((b, ty)) => {
                    *binding = Some(b);
                    Some(ty)
                }
                Err(()) => None,
            },

            ExprKind::ArrayLiteral { elements } => {
                if elements.is_empty() {
                    self.error(span, "cannot infer the type of an empty array literal");
                    None
                } else {
                    let mut element_types = Vec::with_capacity(elements.len());
                    for element in elements.iter_mut() {
                        element_types.push(self.infer(element));
                    }
                    let mut unified = element_types[0].clone()?;
                    let mut ok = true;
                    for (element, ty) in elements.iter().zip(&element_types).skip(1) {
                        let Some(ty) = ty else {
                            ok = false;
                            continue;
                        };
                        match unified.unify(ty) {
                            Some(u) => unified = u,
                            None => {
                                self.error(
                                    element.span,
                                    format!(
                                        "array elements have incompatible types: {unified} and {ty}"
                                    ),
                                );
                                ok = false;
                            }
                        }
                    }
                    if !ok {
                        None
                    } else {
                        if unified == Type::Float {
                            for element in elements.iter_mut() {
                                widen_if_int(element);
                            }
                        }
                        Some(Type::array(unified, Some(elements.len() as u32)))
                    }
                }
            }

            ExprKind::Unary { op, operand } => {
                let op = *op;
                let ty = self.infer(operand)?;
                match op {
                    UnaryOp::Neg if ty.is_numeric() => Some(ty),
                    UnaryOp::Neg => {
                        self.error(
                            span,
                            format!("operator '-' requires a numeric operand, found {ty}"),
                        );
                        None
                    }
                    UnaryOp::Not if ty == Type::Bool => Some(Type::Bool),
                    UnaryOp::Not => {
                        self.error(
                            span,
                            format!("operator 'not' requires a bool operand, found {ty}"),
                        );
                        None
                    }
                }
            }

            ExprKind::Binary { op, left, right } => {
                let op = *op;
                let lt = self.infer(left);
                let rt = self.infer(right);
                let (lt, rt) = (lt?, rt?);
                self.check_binary(op, span, left, right, lt, rt)
            }

            ExprKind::Index { target, index } => {
                let target_ty = self.infer(target);
                if let Some(ty) = self.infer(index) {
                    if ty != Type::Int {
                        self.error(index.span, format!("array index must be int, found {ty}"));
                    }
                }
                match target_ty? {
                    Type::Array { element, .. } => Some(*element),
                    other => {
                        self.error(
                            target.span,
                            format!("cannot index into a value of type {other}"),
                        );
                        None
                    }
                }
            }

            ExprKind::Call {
                name,
                func,
                arguments,
            } => {
                let resolved = self.table.resolve(self.current_scope, name);
                let Some((scope, slot)) = resolved else {
                    let name = name.clone();
                    self.error(span, format!("undeclared function '{name}'"));
                    for arg in arguments.iter_mut() {
                        self.infer(arg);
                    }
                    return None;
                };
                let callee = match self.table.symbol(scope, slot) {
                    Symbol::Function { func, .. } => Some(*func),
                    Symbol::Variable { .. } => None,
                };
                let Some(id) = callee else {
                    let name = name.clone();
                    self.error(span, format!("'{name}' is not a function"));
                    for arg in arguments.iter_mut() {
                        self.infer(arg);
                    }
                    return None;
                };
                *func = Some(id);

                let info = &self.functions[id as usize];
                let name = info.name.clone();
                let params = info.params.clone();
                let return_type = info.return_type.clone();

                if arguments.len() != params.len() {
                    self.error(
                        span,
                        format!(
                            "function '{name}' expects {} argument(s), got {}",
                            params.len(),
                            arguments.len()
                        ),
                    );
                    for arg in arguments.iter_mut() {
                        self.infer(arg);
                    }
                } else {
                    for (i, (arg, param)) in arguments.iter_mut().zip(&params).enumerate() {
                        if let Err(Some(found)) = self.check_assignable(arg, &param.param_type) {
                            self.error(
                                arg.span,
                                format!(
                                    "argument {} of '{name}': expected {}, found {found}",
                                    i + 1,
                                    param.param_type
                                ),
                            );
                        }
                    }
                }
                Some(return_type)
            }

            ExprKind::Input { prompt } => {
                if let Some(prompt) = prompt {
                    if let Some(ty) = self.infer(prompt) {
                        if ty != Type::String {
                            self.error(
                                prompt.span,
                                format!("input prompt must be string, found {ty}"),
                            );
                        }
                    }
                }
                Some(Type::String)
            }

            ExprKind::Assign { target, value } => match target {
                LValue::Name {
                    name,
                    binding,
                    span: target_span,
                } => {
                    let target_span = *target_span;
                    match self.resolve_variable(target_span, name) {
                        Ok((b, target_ty)) => {
                            *binding = Some(b);
                            if let Err(Some(found)) = self.check_assignable(value, &target_ty) {
                                self.error(
                                    value.span,
                                    format!(
                                        "incompatible types in assignment: expected {target_ty}, found {found}"
                                    ),
                                );
                            }
                            Some(target_ty)
                        }
                        Err(()) => {
                            self.infer(value);
                            None
                        }
                    }
                }
                LValue::Index {
                    name,
                    binding,
                    index,
                    span: target_span,
                } => {
                    let target_span = *target_span;
                    if let Some(ty) = self.infer(index) {
                        if ty != Type::Int {
                            self.error(index.span, format!("array index must be int, found {ty}"));
                        }
                    }
                    match self.resolve_variable(target_span, name) {
                        Ok((b, Type::Array { element, .. })) => {
                            *binding = Some(b);
                            let element = *element;
                            if let Err(Some(found)) = self.check_assignable(value, &element) {
                                self.error(
                                    value.span,
                                    format!(
                                        "incompatible types in assignment: expected {element}, found {found}"
                                    ),
                                );
                            }
                            Some(element)
                        }
                        Ok((_, other)) => {
                            let name = name.clone();
                            self.error(
                                target_span,
                                format!("'{name}' is not an array, it has type {other}"),
                            );
                            self.infer(value);
                            None
                        }
                        Err(()) => {
                            self.infer(value);
                            None
                        }
                    }
                }
            },

            // Inserted by this analyzer, never produced by the parser.
            ExprKind::Coerce { operand } => {
                self.infer(operand);
                Some(Type::Float)
            }
        };

        expr.ty = ty.clone();
        ty
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        span: Span,
        left: &mut Expr,
        right: &mut Expr,
        lt: Type,
        rt: Type,
    ) -> Option<Type> {
        if op.is_arithmetic() {
            if op == BinaryOp::Add && lt == Type::String && rt == Type::String {
                return Some(Type::String);
            }
            if lt.is_numeric() && rt.is_numeric() {
                if lt == Type::Int && rt == Type::Int {
                    return Some(Type::Int);
                }
                widen_if_int(left);
                widen_if_int(right);
                return Some(Type::Float);
            }
            self.error(
                span,
                format!("operator '{}' is not defined for {lt} and {rt}", op.symbol()),
            );
            return None;
        }

        if op.is_relational() {
            if lt.is_numeric() && rt.is_numeric() {
                widen_if_int(left);
                widen_if_int(right);
                return Some(Type::Bool);
            }
            if lt == Type::String && rt == Type::String {
                return Some(Type::Bool);
            }
            self.error(
                span,
                format!(
                    "operator '{}' requires numeric or string operands, found {lt} and {rt}",
                    op.symbol()
                ),
            );
            return None;
        }

        if op.is_equality() {
            if !lt.is_scalar() || !rt.is_scalar() {
                if lt.is_array() || rt.is_array() {
                    self.error(
                        span,
                        format!("cannot compare arrays with '{}'", op.symbol()),
                    );
                } else {
                    self.error(span, format!("cannot compare {lt} and {rt}"));
                }
                return None;
            }
            match lt.unify(&rt) {
                Some(u) => {
                    if u == Type::Float {
                        widen_if_int(left);
                        widen_if_int(right);
                    }
                    Some(Type::Bool)
                }
                None => {
                    self.error(span, format!("cannot compare {lt} and {rt}"));
                    None
                }
            }
        } else {
            // and / or
            if lt == Type::Bool && rt == Type::Bool {
                Some(Type::Bool)
            } else {
                self.error(
                    span,
                    format!(
                        "operator '{}' requires bool operands, found {lt} and {rt}",
                        op.symbol()
                    ),
                );
                None
            }
        }
    }

    /// Resolve a name to a variable binding, reporting undeclared names
    /// and attempts to use a function as a value.
    fn resolve_variable(&mut self, span: Span, name: &str) -> Result<(Binding, Type), ()> {
        let Some((scope, slot)) = self.table.resolve(self.current_scope, name) else {
            self.error(span, format!("undeclared name '{name}'"));
            return Err(());
        };
        let variable_type = match self.table.symbol(scope, slot) {
            Symbol::Variable { ty, .. } => Some(ty.clone()),
            Symbol::Function { .. } => None,
        };
        match variable_type {
            Some(ty) => Ok((Binding { scope, slot }, ty)),
            None => {
                self.error(
                    span,
                    format!("'{name}' is a function and cannot be used as a value"),
                );
                Err(())
            }
        }
    }

    /// Check that `expr` may be stored into a location of type `expected`,
    /// inserting widening where the rules allow it.
    ///
    /// Array literals are checked element-by-element against the expected
    /// element type, so `float[3] a = [1, 2, 3];` is legal. `Err(Some(t))`
    /// reports a mismatch for the caller to phrase; `Err(None)` means the
    /// failure was already reported here or during inference.
    fn check_assignable(&mut self, expr: &mut Expr, expected: &Type) -> Result<(), Option<Type>> {
        if let Type::Array {
            element: expected_element,
            size: expected_size,
        } = expected
        {
            if let ExprKind::ArrayLiteral { elements } = &mut expr.kind {
                let expected_element = expected_element.as_ref().clone();
                let expected_size = *expected_size;
                let len = elements.len();
                for element in elements.iter_mut() {
                    if let Err(Some(found)) = self.check_assignable(element, &expected_element) {
                        self.error(
                            element.span,
                            format!(
                                "incompatible array element: expected {expected_element}, found {found}"
                            ),
                        );
                    }
                }
                if let Some(n) = expected_size {
                    if n as usize != len {
                        self.error(
                            expr.span,
                            format!("expected an array of length {n}, found {len}"),
                        );
                    }
                }
                expr.ty = Some(Type::array(expected_element, Some(len as u32)));
                return Ok(());
            }
        }

        let Some(found) = self.infer(expr) else {
            return Err(None);
        };
        if found == *expected {
            return Ok(());
        }
        if found.widens_to(expected) {
            widen_if_int(expr);
            return Ok(());
        }
        if found.assignable_to(expected) {
            return Ok(());
        }
        Err(Some(found))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Wrap an `int`-typed expression in a `Coerce` node. No-op otherwise.
fn widen_if_int(expr: &mut Expr) {
    if expr.ty != Some(Type::Int) {
        return;
    }
    let span = expr.span;
    let inner = std::mem::replace(expr, Expr::new(ExprKind::IntLiteral { value: 0 }, span));
    *expr = Expr {
        kind: ExprKind::Coerce {
            operand: Box::new(inner),
        },
        span,
        ty: Some(Type::Float),
    };
}

/// A declaration without an initializer needs a concrete length at every
/// array level to build its default value.
fn has_complete_size(ty: &Type) -> bool {
    match ty {
        Type::Array { element, size } => size.is_some() && has_complete_size(element),
        _ => true,
    }
}

/// Structural must-return analysis: a block must-returns iff its last
/// statement does; an `if` must-returns iff both branches do.
fn block_must_return(block: &Block) -> bool {
    block.statements.last().is_some_and(stmt_must_return)
}

fn stmt_must_return(stmt: &Statement) -> bool {
    match &stmt.kind {
        StatementKind::Return { .. } => true,
        StatementKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => block_must_return(then_branch) && block_must_return(else_branch),
        StatementKind::Block { block } => block_must_return(block),
        _ => false,
    }
}
