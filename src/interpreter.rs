//! Tree-walking interpreter for analyzed Mini-Lang programs.
//!
//! Execution keeps an activation stack of frames; each frame owns a stack
//! of scope instances whose slots were laid out by the analyzer, so no
//! name is ever looked up by string at runtime. A function call pushes a
//! fresh frame holding the body scope with parameters bound by value;
//! block entry pushes a scope instance onto the current frame.

use std::fmt;
use std::io::{self, BufRead, Write};

use crate::analyzer::Analysis;
use crate::ast::*;
use crate::diagnostics::Diagnostic;
use crate::token::Span;
use crate::types::Type;

// ---------------------------------------------------------------------------
// Runtime values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Array(Vec<Value>),
    Unit,
}

/// Shortest round-trip decimal form that always keeps a decimal point,
/// so `2.0` prints as `2.0` rather than `2`.
pub fn format_float(value: f64) -> String {
    let mut s = format!("{value}");
    if !s.contains('.') && !s.contains("inf") && !s.contains("NaN") {
        s.push_str(".0");
    }
    s
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Bool(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Value::Str(v) => write!(f, "{v}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Unit => Ok(()),
        }
    }
}

/// Default value of a declared type, used for declarations without an
/// initializer. The analyzer guarantees array types here carry sizes.
fn default_value(ty: &Type) -> Value {
    match ty {
        Type::Int => Value::Int(0),
        Type::Float => Value::Float(0.0),
        Type::Bool => Value::Bool(false),
        Type::String => Value::Str(String::new()),
        Type::Array { element, size } => {
            let n = size.unwrap_or(0) as usize;
            Value::Array(vec![default_value(element); n])
        }
        Type::Void => Value::Unit,
    }
}

// ---------------------------------------------------------------------------
// Activation frames
// ---------------------------------------------------------------------------

struct ScopeInstance {
    id: u32,
    slots: Vec<Value>,
}

struct Frame {
    scopes: Vec<ScopeInstance>,
}

/// Non-linear control flow out of a statement.
enum Flow {
    Normal,
    Return(Value),
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

pub struct Interpreter<'p, R, W> {
    program: &'p Program,
    analysis: &'p Analysis,
    frames: Vec<Frame>,
    input: R,
    output: W,
}

/// Run an analyzed program against the process's standard streams.
pub fn run(program: &Program, analysis: &Analysis) -> Result<(), Diagnostic> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Interpreter::new(program, analysis, stdin.lock(), stdout.lock()).run()
}

impl<'p, R: BufRead, W: Write> Interpreter<'p, R, W> {
    pub fn new(program: &'p Program, analysis: &'p Analysis, input: R, output: W) -> Self {
        Self {
            program,
            analysis,
            frames: Vec::new(),
            input,
            output,
        }
    }

    /// Execute the program's top-level statements in source order.
    pub fn run(mut self) -> Result<(), Diagnostic> {
        let program = self.program;
        self.frames.push(Frame {
            scopes: vec![self.scope_instance(0)],
        });
        for stmt in &program.statements {
            if let StatementKind::FunctionDecl { .. } = stmt.kind {
                continue;
            }
            self.exec_statement(stmt)?;
        }
        Ok(())
    }

    fn scope_instance(&self, id: u32) -> ScopeInstance {
        ScopeInstance {
            id,
            slots: vec![Value::Unit; self.analysis.symbols.slot_count(id)],
        }
    }

    // -----------------------------------------------------------------------
    // Slot access
    // -----------------------------------------------------------------------

    /// Locate a binding's slot: the current frame's scopes first, then the
    /// program frame for globals referenced from inside a function.
    fn slot_mut(&mut self, binding: Binding) -> &mut Value {
        let frame_count = self.frames.len();
        let in_current = self.frames[frame_count - 1]
            .scopes
            .iter()
            .rposition(|s| s.id == binding.scope);
        let (frame_idx, scope_idx) = match in_current {
            Some(idx) => (frame_count - 1, idx),
            None => {
                let idx = self.frames[0]
                    .scopes
                    .iter()
                    .rposition(|s| s.id == binding.scope)
                    .unwrap_or(0);
                (0, idx)
            }
        };
        &mut self.frames[frame_idx].scopes[scope_idx].slots[binding.slot as usize]
    }

    fn load(&mut self, binding: Binding) -> Value {
        self.slot_mut(binding).clone()
    }

    fn store(&mut self, binding: Binding, value: Value) {
        *self.slot_mut(binding) = value;
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn exec_statement(&mut self, stmt: &Statement) -> Result<Flow, Diagnostic> {
        match &stmt.kind {
            StatementKind::VarDecl {
                declared_type,
                initializer,
                binding,
                ..
            } => {
                let value = match initializer {
                    Some(init) => self.eval(init)?,
                    None => default_value(declared_type),
                };
                if let Some(binding) = binding {
                    self.store(*binding, value);
                }
                Ok(Flow::Normal)
            }

            StatementKind::FunctionDecl { .. } => Ok(Flow::Normal),

            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_bool(condition)? {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            StatementKind::While { condition, body } => {
                while self.eval_bool(condition)? {
                    if let Flow::Return(v) = self.exec_block(body)? {
                        return Ok(Flow::Return(v));
                    }
                }
                Ok(Flow::Normal)
            }

            StatementKind::For {
                init,
                condition,
                step,
                body,
                header_scope,
            } => {
                let instance = self.scope_instance(*header_scope);
                self.current_frame().scopes.push(instance);
                let result = self.exec_for(init, condition, step, body);
                self.current_frame().scopes.pop();
                result
            }

            StatementKind::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }

            StatementKind::Print { value } => {
                let value = self.eval(value)?;
                writeln!(self.output, "{value}")
                    .map_err(|e| Diagnostic::runtime(stmt.span, format!("output error: {e}")))?;
                Ok(Flow::Normal)
            }

            StatementKind::ExprStmt { expression } => {
                self.eval(expression)?;
                Ok(Flow::Normal)
            }

            StatementKind::Block { block } => self.exec_block(block),
        }
    }

    fn exec_for(
        &mut self,
        init: &Statement,
        condition: &Expr,
        step: &Expr,
        body: &Block,
    ) -> Result<Flow, Diagnostic> {
        self.exec_statement(init)?;
        while self.eval_bool(condition)? {
            if let Flow::Return(v) = self.exec_block(body)? {
                return Ok(Flow::Return(v));
            }
            self.eval(step)?;
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, block: &Block) -> Result<Flow, Diagnostic> {
        let instance = self.scope_instance(block.scope);
        self.current_frame().scopes.push(instance);
        let mut flow = Flow::Normal;
        for stmt in &block.statements {
            match self.exec_statement(stmt) {
                Ok(Flow::Normal) => {}
                Ok(ret) => {
                    flow = ret;
                    break;
                }
                Err(e) => {
                    self.current_frame().scopes.pop();
                    return Err(e);
                }
            }
        }
        self.current_frame().scopes.pop();
        Ok(flow)
    }

    fn current_frame(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Result<Value, Diagnostic> {
        match &expr.kind {
            ExprKind::IntLiteral { value } => Ok(Value::Int(*value)),
            ExprKind::FloatLiteral { value } => Ok(Value::Float(*value)),
            ExprKind::BoolLiteral { value } => Ok(Value::Bool(*value)),
            ExprKind::StringLiteral { value } => Ok(Value::Str(value.clone())),

            ExprKind::Identifier { binding, .. } => {
                let binding = self.resolved(*binding, expr.span)?;
                Ok(self.load(binding))
            }

            ExprKind::ArrayLiteral { elements } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element)?);
                }
                Ok(Value::Array(items))
            }

            ExprKind::Coerce { operand } => match self.eval(operand)? {
                Value::Int(v) => Ok(Value::Float(v as f64)),
                other => Ok(other),
            },

            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
                    (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
                    (UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
                    (op, value) => Err(Diagnostic::runtime(
                        expr.span,
                        format!("operator '{}' applied to {value}", op.symbol()),
                    )),
                }
            }

            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    if !self.eval_bool(left)? {
                        Ok(Value::Bool(false))
                    } else {
                        Ok(Value::Bool(self.eval_bool(right)?))
                    }
                }
                BinaryOp::Or => {
                    if self.eval_bool(left)? {
                        Ok(Value::Bool(true))
                    } else {
                        Ok(Value::Bool(self.eval_bool(right)?))
                    }
                }
                _ => {
                    let l = self.eval(left)?;
                    let r = self.eval(right)?;
                    eval_binary(*op, l, r, expr.span)
                }
            },

            ExprKind::Index { target, index } => {
                let target = self.eval(target)?;
                let idx = self.eval_int(index)?;
                let items = match target {
                    Value::Array(items) => items,
                    other => {
                        return Err(Diagnostic::runtime(
                            expr.span,
                            format!("cannot index into {other}"),
                        ));
                    }
                };
                let checked = check_bounds(idx, items.len(), expr.span)?;
                Ok(items[checked].clone())
            }

            ExprKind::Call {
                name,
                func,
                arguments,
            } => {
                let Some(func) = *func else {
                    return Err(Diagnostic::runtime(
                        expr.span,
                        format!("call to unresolved function '{name}'"),
                    ));
                };
                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.eval(arg)?);
                }
                self.call_function(func, args)
            }

            ExprKind::Input { prompt } => {
                if let Some(prompt) = prompt {
                    let prompt = self.eval(prompt)?;
                    write!(self.output, "{prompt}").and_then(|_| self.output.flush()).map_err(
                        |e| Diagnostic::runtime(expr.span, format!("output error: {e}")),
                    )?;
                }
                let mut line = String::new();
                let read = self
                    .input
                    .read_line(&mut line)
                    .map_err(|e| Diagnostic::runtime(expr.span, format!("input error: {e}")))?;
                if read == 0 {
                    return Err(Diagnostic::runtime(expr.span, "unexpected end of input"));
                }
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Ok(Value::Str(line))
            }

            ExprKind::Assign { target, value } => {
                let value = self.eval(value)?;
                match target {
                    LValue::Name { binding, .. } => {
                        let binding = self.resolved(*binding, target.span())?;
                        self.store(binding, value.clone());
                    }
                    LValue::Index { binding, index, .. } => {
                        let idx = self.eval_int(index)?;
                        let binding = self.resolved(*binding, target.span())?;
                        let span = target.span();
                        let slot = self.slot_mut(binding);
                        let items = match slot {
                            Value::Array(items) => items,
                            other => {
                                let msg = format!("cannot index into {other}");
                                return Err(Diagnostic::runtime(span, msg));
                            }
                        };
                        let checked = check_bounds(idx, items.len(), span)?;
                        items[checked] = value.clone();
                    }
                }
                Ok(value)
            }
        }
    }

    /// Evaluate arguments left-to-right, push a fresh frame holding the
    /// body scope with parameters bound by value, and execute the body.
    fn call_function(&mut self, func: FuncId, args: Vec<Value>) -> Result<Value, Diagnostic> {
        let info = &self.analysis.functions[func as usize];
        let body_scope = info.body_scope;
        let decl_index = info.decl_index;

        let mut instance = self.scope_instance(body_scope);
        // Parameters occupy the leading slots of the body scope.
        for (slot, arg) in args.into_iter().enumerate() {
            instance.slots[slot] = arg;
        }
        self.frames.push(Frame {
            scopes: vec![instance],
        });

        let program = self.program;
        let body = match &program.statements[decl_index].kind {
            StatementKind::FunctionDecl { body, .. } => body,
            _ => {
                self.frames.pop();
                return Err(Diagnostic::runtime(
                    program.statements[decl_index].span,
                    "function body missing",
                ));
            }
        };

        let mut result = Value::Unit;
        for stmt in &body.statements {
            match self.exec_statement(stmt) {
                Ok(Flow::Normal) => {}
                Ok(Flow::Return(v)) => {
                    result = v;
                    break;
                }
                Err(e) => {
                    self.frames.pop();
                    return Err(e);
                }
            }
        }

        self.frames.pop();
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Typed evaluation helpers
    // -----------------------------------------------------------------------

    fn eval_bool(&mut self, expr: &Expr) -> Result<bool, Diagnostic> {
        match self.eval(expr)? {
            Value::Bool(v) => Ok(v),
            other => Err(Diagnostic::runtime(
                expr.span,
                format!("expected a bool value, got {other}"),
            )),
        }
    }

    fn eval_int(&mut self, expr: &Expr) -> Result<i64, Diagnostic> {
        match self.eval(expr)? {
            Value::Int(v) => Ok(v),
            other => Err(Diagnostic::runtime(
                expr.span,
                format!("expected an int value, got {other}"),
            )),
        }
    }

    fn resolved(&self, binding: Option<Binding>, span: Span) -> Result<Binding, Diagnostic> {
        binding.ok_or_else(|| Diagnostic::runtime(span, "unresolved name"))
    }
}

// ---------------------------------------------------------------------------
// Binary operator evaluation
// ---------------------------------------------------------------------------

/// Index within bounds, or the runtime error carrying the offending index
/// and the array length.
fn check_bounds(index: i64, len: usize, span: Span) -> Result<usize, Diagnostic> {
    if index < 0 || index as usize >= len {
        return Err(Diagnostic::runtime(
            span,
            format!("index {index} out of bounds for array of length {len}"),
        ));
    }
    Ok(index as usize)
}

/// Non-short-circuit binary operators. The analyzer's `Coerce` insertion
/// guarantees both operands arrive with the same type, so only same-typed
/// pairs are handled. Int arithmetic wraps in two's complement; Float
/// follows IEEE-754, including division by zero.
fn eval_binary(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value, Diagnostic> {
    use BinaryOp::*;
    use Value::*;

    let value = match (op, left, right) {
        (Add, Int(a), Int(b)) => Int(a.wrapping_add(b)),
        (Sub, Int(a), Int(b)) => Int(a.wrapping_sub(b)),
        (Mul, Int(a), Int(b)) => Int(a.wrapping_mul(b)),
        (Div, Int(_), Int(0)) => {
            return Err(Diagnostic::runtime(span, "division by zero"));
        }
        (Div, Int(a), Int(b)) => Int(a.wrapping_div(b)),
        (Mod, Int(_), Int(0)) => {
            return Err(Diagnostic::runtime(span, "modulo by zero"));
        }
        (Mod, Int(a), Int(b)) => Int(a.wrapping_rem(b)),

        (Add, Float(a), Float(b)) => Float(a + b),
        (Sub, Float(a), Float(b)) => Float(a - b),
        (Mul, Float(a), Float(b)) => Float(a * b),
        (Div, Float(a), Float(b)) => Float(a / b),
        (Mod, Float(a), Float(b)) => Float(a % b),

        (Add, Str(a), Str(b)) => Str(a + &b),

        (Lt, Int(a), Int(b)) => Bool(a < b),
        (Le, Int(a), Int(b)) => Bool(a <= b),
        (Gt, Int(a), Int(b)) => Bool(a > b),
        (Ge, Int(a), Int(b)) => Bool(a >= b),
        (Lt, Float(a), Float(b)) => Bool(a < b),
        (Le, Float(a), Float(b)) => Bool(a <= b),
        (Gt, Float(a), Float(b)) => Bool(a > b),
        (Ge, Float(a), Float(b)) => Bool(a >= b),
        (Lt, Str(a), Str(b)) => Bool(a < b),
        (Le, Str(a), Str(b)) => Bool(a <= b),
        (Gt, Str(a), Str(b)) => Bool(a > b),
        (Ge, Str(a), Str(b)) => Bool(a >= b),

        (Eq, a, b) => Bool(a == b),
        (Ne, a, b) => Bool(a != b),

        (op, a, b) => {
            return Err(Diagnostic::runtime(
                span,
                format!("operator '{}' applied to {a} and {b}", op.symbol()),
            ));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(3.14), "3.14");
        assert_eq!(format_float(-0.5), "-0.5");
        assert_eq!(format_float(1e2), "100.0");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(-42).to_string(), "-42");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(&Type::Int), Value::Int(0));
        assert_eq!(default_value(&Type::Float), Value::Float(0.0));
        assert_eq!(default_value(&Type::Bool), Value::Bool(false));
        assert_eq!(default_value(&Type::String), Value::Str(String::new()));
        assert_eq!(
            default_value(&Type::array(Type::Int, Some(3))),
            Value::Array(vec![Value::Int(0), Value::Int(0), Value::Int(0)])
        );
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let span = Span::new(1, 1);
        let v = eval_binary(BinaryOp::Add, Value::Int(i64::MAX), Value::Int(1), span).unwrap();
        assert_eq!(v, Value::Int(i64::MIN));
    }

    #[test]
    fn test_division_by_zero() {
        let span = Span::new(1, 1);
        let err = eval_binary(BinaryOp::Div, Value::Int(1), Value::Int(0), span).unwrap_err();
        assert_eq!(err.message, "division by zero");
        // Floats follow IEEE-754
        let v = eval_binary(BinaryOp::Div, Value::Float(1.0), Value::Float(0.0), span).unwrap();
        assert_eq!(v, Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_truncated_modulo() {
        let span = Span::new(1, 1);
        let v = eval_binary(BinaryOp::Mod, Value::Int(-7), Value::Int(3), span).unwrap();
        assert_eq!(v, Value::Int(-1));
    }

    #[test]
    fn test_string_comparison() {
        let span = Span::new(1, 1);
        let v = eval_binary(
            BinaryOp::Lt,
            Value::Str("abc".into()),
            Value::Str("abd".into()),
            span,
        )
        .unwrap();
        assert_eq!(v, Value::Bool(true));
    }
}
