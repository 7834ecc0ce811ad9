//! Human-readable listings of the compiler's artifacts: the AST as an
//! ASCII tree, the token stream, and the symbol table.

use crate::analyzer::{Analysis, Symbol};
use crate::ast::*;
use crate::interpreter::format_float;
use crate::token::{Token, TokenType};

// ---------------------------------------------------------------------------
// AST tree
// ---------------------------------------------------------------------------

struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    fn new(label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }
}

/// Render the program as an ASCII tree using box-drawing connectors.
pub fn print_ast(program: &Program) -> String {
    let mut out = String::from("Program\n");
    let children: Vec<TreeNode> = program.statements.iter().map(stmt_node).collect();
    render_children(&children, "", &mut out);
    out
}

fn render_children(children: &[TreeNode], prefix: &str, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(&child.label);
        out.push('\n');
        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_children(&child.children, &child_prefix, out);
    }
}

fn block_nodes(block: &Block) -> Vec<TreeNode> {
    block.statements.iter().map(stmt_node).collect()
}

fn stmt_node(stmt: &Statement) -> TreeNode {
    match &stmt.kind {
        StatementKind::VarDecl {
            declared_type,
            name,
            initializer,
            ..
        } => {
            let label = format!("VarDeclaration: {declared_type} {name}");
            match initializer {
                Some(init) => TreeNode::new(
                    label,
                    vec![TreeNode::new("Initializer:", vec![expr_node(init)])],
                ),
                None => TreeNode::leaf(label),
            }
        }

        StatementKind::FunctionDecl {
            name,
            params,
            return_type,
            body,
        } => {
            let params: Vec<String> = params
                .iter()
                .map(|p| format!("{} {}", p.param_type, p.name))
                .collect();
            let label = format!(
                "FunctionDeclaration: {name}({}) -> {return_type}",
                params.join(", ")
            );
            TreeNode::new(label, vec![TreeNode::new("Body:", block_nodes(body))])
        }

        StatementKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut children = vec![
                TreeNode::new("Condition:", vec![expr_node(condition)]),
                TreeNode::new("Then:", block_nodes(then_branch)),
            ];
            if let Some(else_branch) = else_branch {
                children.push(TreeNode::new("Else:", block_nodes(else_branch)));
            }
            TreeNode::new("IfStatement", children)
        }

        StatementKind::While { condition, body } => TreeNode::new(
            "WhileStatement",
            vec![
                TreeNode::new("Condition:", vec![expr_node(condition)]),
                TreeNode::new("Body:", block_nodes(body)),
            ],
        ),

        StatementKind::For {
            init,
            condition,
            step,
            body,
            ..
        } => TreeNode::new(
            "ForStatement",
            vec![
                TreeNode::new("Init:", vec![stmt_node(init)]),
                TreeNode::new("Condition:", vec![expr_node(condition)]),
                TreeNode::new("Step:", vec![expr_node(step)]),
                TreeNode::new("Body:", block_nodes(body)),
            ],
        ),

        StatementKind::Return { value } => match value {
            Some(value) => TreeNode::new("ReturnStatement", vec![expr_node(value)]),
            None => TreeNode::leaf("ReturnStatement"),
        },

        StatementKind::Print { value } => {
            TreeNode::new("PrintStatement", vec![expr_node(value)])
        }

        StatementKind::ExprStmt { expression } => {
            TreeNode::new("ExpressionStatement", vec![expr_node(expression)])
        }

        StatementKind::Block { block } => TreeNode::new("Block", block_nodes(block)),
    }
}

fn expr_node(expr: &Expr) -> TreeNode {
    match &expr.kind {
        ExprKind::IntLiteral { value } => TreeNode::leaf(format!("Literal: {value} (int)")),
        ExprKind::FloatLiteral { value } => {
            TreeNode::leaf(format!("Literal: {} (float)", format_float(*value)))
        }
        ExprKind::BoolLiteral { value } => TreeNode::leaf(format!("Literal: {value} (bool)")),
        ExprKind::StringLiteral { value } => {
            TreeNode::leaf(format!("Literal: {value} (string)"))
        }
        ExprKind::Identifier { name, .. } => TreeNode::leaf(format!("Identifier: {name}")),

        ExprKind::ArrayLiteral { elements } => TreeNode::new(
            format!("ArrayLiteral ({} elements)", elements.len()),
            elements.iter().map(expr_node).collect(),
        ),

        ExprKind::Unary { op, operand } => TreeNode::new(
            format!("UnaryOp: {}", op.symbol()),
            vec![expr_node(operand)],
        ),

        ExprKind::Binary { op, left, right } => TreeNode::new(
            format!("BinaryOp: {}", op.symbol()),
            vec![
                TreeNode::new("Left:", vec![expr_node(left)]),
                TreeNode::new("Right:", vec![expr_node(right)]),
            ],
        ),

        ExprKind::Index { target, index } => TreeNode::new(
            "ArrayAccess",
            vec![
                TreeNode::new("Array:", vec![expr_node(target)]),
                TreeNode::new("Index:", vec![expr_node(index)]),
            ],
        ),

        ExprKind::Call {
            name, arguments, ..
        } => {
            let label = format!("FunctionCall: {name}");
            if arguments.is_empty() {
                TreeNode::leaf(label)
            } else {
                TreeNode::new(
                    label,
                    vec![TreeNode::new(
                        "Arguments:",
                        arguments.iter().map(expr_node).collect(),
                    )],
                )
            }
        }

        ExprKind::Input { prompt } => match prompt {
            Some(prompt) => TreeNode::new(
                "InputExpression",
                vec![TreeNode::new("Prompt:", vec![expr_node(prompt)])],
            ),
            None => TreeNode::leaf("InputExpression"),
        },

        ExprKind::Assign { target, value } => TreeNode::new(
            "Assignment",
            vec![
                TreeNode::new("Target:", vec![lvalue_node(target)]),
                TreeNode::new("Value:", vec![expr_node(value)]),
            ],
        ),

        ExprKind::Coerce { operand } => {
            TreeNode::new("Coerce: int -> float", vec![expr_node(operand)])
        }
    }
}

fn lvalue_node(target: &LValue) -> TreeNode {
    match target {
        LValue::Name { name, .. } => TreeNode::leaf(format!("Identifier: {name}")),
        LValue::Index { name, index, .. } => TreeNode::new(
            "ArrayAccess",
            vec![
                TreeNode::new("Array:", vec![TreeNode::leaf(format!("Identifier: {name}"))]),
                TreeNode::new("Index:", vec![expr_node(index)]),
            ],
        ),
    }
}

// ---------------------------------------------------------------------------
// Token stream
// ---------------------------------------------------------------------------

/// One token per line: kind, lexeme and position.
pub fn print_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.token_type == TokenType::Eof {
            out.push_str(&format!(
                "Eof at {}:{}\n",
                token.span.line, token.span.column
            ));
        } else {
            out.push_str(&format!(
                "{:?} '{}' at {}:{}\n",
                token.token_type, token.lexeme, token.span.line, token.span.column
            ));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Symbol table
// ---------------------------------------------------------------------------

/// Indented scope tree with one line per symbol.
pub fn print_symbols(analysis: &Analysis) -> String {
    let mut out = String::new();
    write_scope(analysis, 0, 0, &mut out);
    out
}

fn write_scope(analysis: &Analysis, id: u32, level: usize, out: &mut String) {
    let indent = "  ".repeat(level);
    out.push_str(&format!("{indent}Scope (level {level}):\n"));

    for symbol in analysis.symbols.scope(id).symbols() {
        match symbol {
            Symbol::Variable { name, ty, .. } => {
                out.push_str(&format!("{indent}  {name}: {ty}\n"));
            }
            Symbol::Function { name, func, .. } => {
                let info = &analysis.functions[*func as usize];
                let params: Vec<String> = info
                    .params
                    .iter()
                    .map(|p| format!("{} {}", p.param_type, p.name))
                    .collect();
                out.push_str(&format!(
                    "{indent}  {name}: function({}) -> {}\n",
                    params.join(", "),
                    info.return_type
                ));
            }
        }
    }

    for child in 0..analysis.symbols.scope_count() as u32 {
        if analysis.symbols.scope(child).parent == Some(id) {
            write_scope(analysis, child, level + 1, out);
        }
    }
}
