//! Recursive-descent parser for Mini-Lang.
//!
//! Consumes the token stream produced by the lexer and builds a `Program`.
//! One parse function per precedence level; the first syntactic error
//! aborts parsing.

use crate::ast::*;
use crate::diagnostics::Diagnostic;
use crate::token::{Token, TokenType};
use crate::types::Type;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse a token stream (which must end in `Eof`) into a `Program`.
pub fn parse(tokens: &[Token]) -> Result<Program, Diagnostic> {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    // -----------------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // The stream always carries a terminal Eof token.
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn check(&self, tt: TokenType) -> bool {
        self.peek().token_type == tt
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.token_type != TokenType::Eof {
            self.pos += 1;
        }
        tok
    }

    fn match_token(&mut self, tt: TokenType) -> bool {
        if self.check(tt) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tt: TokenType) -> Result<Token, Diagnostic> {
        if self.check(tt) {
            return Ok(self.advance());
        }
        let found = self.peek();
        Err(Diagnostic::syntactic(
            found.span,
            format!("expected {}, found {}", tt.describe(), found.describe()),
        ))
    }

    // -----------------------------------------------------------------------
    // Program (top-level)
    // -----------------------------------------------------------------------

    fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let mut statements = Vec::new();
        while !self.check(TokenType::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    // -----------------------------------------------------------------------
    // Statement dispatch
    // -----------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        if self.peek().is_type_start() {
            let stmt = self.parse_var_decl()?;
            self.expect(TokenType::Semicolon)?;
            return Ok(stmt);
        }

        if self.check(TokenType::Function) {
            return self.parse_function_decl();
        }

        if self.check(TokenType::Print) {
            return self.parse_print_statement();
        }

        if self.check(TokenType::Return) {
            return self.parse_return_statement();
        }

        if self.check(TokenType::If) {
            return self.parse_if_statement();
        }

        if self.check(TokenType::While) {
            return self.parse_while_statement();
        }

        if self.check(TokenType::For) {
            return self.parse_for_statement();
        }

        if self.check(TokenType::LBrace) {
            let block = self.parse_block()?;
            let span = block.span;
            return Ok(Statement::new(StatementKind::Block { block }, span));
        }

        // Bare expression statement
        let expression = self.parse_expression()?;
        let span = expression.span;
        self.expect(TokenType::Semicolon)?;
        Ok(Statement::new(StatementKind::ExprStmt { expression }, span))
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    /// type ::= ("int"|"float"|"bool"|"string") [ "[" [INT_LIT] "]" ]
    ///       |  "array" "<" type ">" [ "[" [INT_LIT] "]" ]
    fn parse_type(&mut self) -> Result<Type, Diagnostic> {
        let tok = self.peek().clone();
        let base = match tok.token_type {
            TokenType::IntType => {
                self.advance();
                Type::Int
            }
            TokenType::FloatType => {
                self.advance();
                Type::Float
            }
            TokenType::BoolType => {
                self.advance();
                Type::Bool
            }
            TokenType::StringType => {
                self.advance();
                Type::String
            }
            TokenType::Array => {
                self.advance();
                self.expect(TokenType::Less)?;
                let inner = self.parse_type()?;
                self.expect(TokenType::Greater)?;
                let size = self.parse_array_suffix()?;
                return Ok(Type::array(inner, size.flatten()));
            }
            _ => {
                return Err(Diagnostic::syntactic(
                    tok.span,
                    format!("expected type, found {}", tok.describe()),
                ));
            }
        };

        match self.parse_array_suffix()? {
            Some(size) => Ok(Type::array(base, size)),
            None => Ok(base),
        }
    }

    /// Parses an optional `[n]` / `[]` suffix. The outer `Option` says
    /// whether a suffix was present, the inner one whether it had a size.
    fn parse_array_suffix(&mut self) -> Result<Option<Option<u32>>, Diagnostic> {
        if !self.match_token(TokenType::LBracket) {
            return Ok(None);
        }
        let mut size = None;
        if self.check(TokenType::IntLiteral) {
            let tok = self.advance();
            let n = tok
                .lexeme
                .parse::<i64>()
                .ok()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| Diagnostic::syntactic(tok.span, "array size out of range"))?;
            size = Some(n);
        }
        self.expect(TokenType::RBracket)?;
        Ok(Some(size))
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// var_decl ::= type IDENT [ "=" expr ]   (the ";" belongs to the caller)
    fn parse_var_decl(&mut self) -> Result<Statement, Diagnostic> {
        let span = self.peek().span;
        let declared_type = self.parse_type()?;
        let name = self.expect(TokenType::Identifier)?.lexeme;

        let initializer = if self.match_token(TokenType::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Statement::new(
            StatementKind::VarDecl {
                declared_type,
                name,
                initializer,
                binding: None,
            },
            span,
        ))
    }

    /// func_decl ::= "function" IDENT "(" [params] ")" [":" type] block
    fn parse_function_decl(&mut self) -> Result<Statement, Diagnostic> {
        let span = self.expect(TokenType::Function)?.span;
        let name = self.expect(TokenType::Identifier)?.lexeme;

        self.expect(TokenType::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                let param_type = self.parse_type()?;
                let param_name = self.expect(TokenType::Identifier)?.lexeme;
                params.push(Param {
                    param_type,
                    name: param_name,
                });
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RParen)?;

        let return_type = if self.match_token(TokenType::Colon) {
            self.parse_type()?
        } else {
            Type::Void
        };

        let body = self.parse_block()?;

        Ok(Statement::new(
            StatementKind::FunctionDecl {
                name,
                params,
                return_type,
                body,
            },
            span,
        ))
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_print_statement(&mut self) -> Result<Statement, Diagnostic> {
        let span = self.expect(TokenType::Print)?.span;
        self.expect(TokenType::LParen)?;
        let value = self.parse_expression()?;
        self.expect(TokenType::RParen)?;
        self.expect(TokenType::Semicolon)?;
        Ok(Statement::new(StatementKind::Print { value }, span))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Diagnostic> {
        let span = self.expect(TokenType::Return)?.span;
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenType::Semicolon)?;
        Ok(Statement::new(StatementKind::Return { value }, span))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Diagnostic> {
        let span = self.expect(TokenType::If)?.span;
        self.expect(TokenType::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenType::RParen)?;

        let then_branch = self.parse_branch()?;
        let else_branch = if self.match_token(TokenType::Else) {
            Some(self.parse_branch()?)
        } else {
            None
        };

        Ok(Statement::new(
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Diagnostic> {
        let span = self.expect(TokenType::While)?.span;
        self.expect(TokenType::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenType::RParen)?;
        let body = self.parse_branch()?;

        Ok(Statement::new(StatementKind::While { condition, body }, span))
    }

    /// for_stmt ::= "for" "(" (var_decl | expr) ";" expr ";" expr ")" block
    fn parse_for_statement(&mut self) -> Result<Statement, Diagnostic> {
        let span = self.expect(TokenType::For)?.span;
        self.expect(TokenType::LParen)?;

        let init = if self.peek().is_type_start() {
            self.parse_var_decl()?
        } else {
            let expression = self.parse_expression()?;
            let expr_span = expression.span;
            Statement::new(StatementKind::ExprStmt { expression }, expr_span)
        };
        self.expect(TokenType::Semicolon)?;

        let condition = self.parse_expression()?;
        self.expect(TokenType::Semicolon)?;

        let step = self.parse_expression()?;
        self.expect(TokenType::RParen)?;

        let body = self.parse_branch()?;

        Ok(Statement::new(
            StatementKind::For {
                init: Box::new(init),
                condition,
                step,
                body,
                header_scope: 0,
            },
            span,
        ))
    }

    /// Control-flow bodies accept either a braced block or a single
    /// statement, which is wrapped into a one-statement block.
    fn parse_branch(&mut self) -> Result<Block, Diagnostic> {
        if self.check(TokenType::LBrace) {
            return self.parse_block();
        }
        let stmt = self.parse_statement()?;
        let span = stmt.span;
        Ok(Block::new(vec![stmt], span))
    }

    fn parse_block(&mut self) -> Result<Block, Diagnostic> {
        let span = self.expect(TokenType::LBrace)?.span;
        let mut statements = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenType::RBrace)?;
        Ok(Block::new(statements, span))
    }

    // -----------------------------------------------------------------------
    // Expressions, lowest precedence first
    // -----------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_assignment()
    }

    /// Assignment is right-associative; the left-hand side must be an
    /// identifier or an index into a named array.
    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let expr = self.parse_or()?;

        if self.check(TokenType::Assign) {
            let eq = self.advance();
            let value = self.parse_assignment()?;
            let span = expr.span;
            let target = Self::lvalue_from_expr(expr).ok_or_else(|| {
                Diagnostic::syntactic(eq.span, "invalid assignment target")
            })?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    target,
                    value: Box::new(value),
                },
                span,
            ));
        }

        Ok(expr)
    }

    fn lvalue_from_expr(expr: Expr) -> Option<LValue> {
        match expr.kind {
            ExprKind::Identifier { name, binding } => Some(LValue::Name {
                name,
                binding,
                span: expr.span,
            }),
            ExprKind::Index { target, index } => match target.kind {
                ExprKind::Identifier { name, binding } => Some(LValue::Index {
                    name,
                    binding,
                    index,
                    span: expr.span,
                }),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_and()?;
        while self.match_token(TokenType::Or) {
            let right = self.parse_and()?;
            let span = left.span;
            left = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_equality()?;
        while self.match_token(TokenType::And) {
            let right = self.parse_equality()?;
            let span = left.span;
            left = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Equal => BinaryOp::Eq,
                TokenType::NotEqual => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            let span = left.span;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Less => BinaryOp::Lt,
                TokenType::LessEqual => BinaryOp::Le,
                TokenType::Greater => BinaryOp::Gt,
                TokenType::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            let span = left.span;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let span = left.span;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Times => BinaryOp::Mul,
                TokenType::Divide => BinaryOp::Div,
                TokenType::Modulo => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = left.span;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = match self.peek().token_type {
            TokenType::Not => Some(UnaryOp::Not),
            TokenType::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let tok = self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                tok.span,
            ));
        }
        self.parse_postfix()
    }

    /// Postfix indexing and calls. Calls are restricted to named callees.
    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_token(TokenType::LBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenType::RBracket)?;
                let span = expr.span;
                expr = Expr::new(
                    ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.check(TokenType::LParen) {
                let lparen = self.advance();
                let name = match expr.kind {
                    ExprKind::Identifier { name, .. } => name,
                    _ => {
                        return Err(Diagnostic::syntactic(
                            lparen.span,
                            "invalid call target",
                        ));
                    }
                };
                let mut arguments = Vec::new();
                if !self.check(TokenType::RParen) {
                    loop {
                        arguments.push(self.parse_expression()?);
                        if !self.match_token(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenType::RParen)?;
                let span = expr.span;
                expr = Expr::new(
                    ExprKind::Call {
                        name,
                        func: None,
                        arguments,
                    },
                    span,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let tok = self.peek().clone();
        match tok.token_type {
            TokenType::IntLiteral => {
                self.advance();
                let value = tok.lexeme.parse::<i64>().map_err(|_| {
                    Diagnostic::syntactic(tok.span, "invalid integer literal")
                })?;
                Ok(Expr::new(ExprKind::IntLiteral { value }, tok.span))
            }
            TokenType::FloatLiteral => {
                self.advance();
                let value = tok.lexeme.parse::<f64>().map_err(|_| {
                    Diagnostic::syntactic(tok.span, "invalid float literal")
                })?;
                Ok(Expr::new(ExprKind::FloatLiteral { value }, tok.span))
            }
            TokenType::StringLiteral => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::StringLiteral { value: tok.lexeme },
                    tok.span,
                ))
            }
            TokenType::BoolLiteral => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::BoolLiteral {
                        value: tok.lexeme == "true",
                    },
                    tok.span,
                ))
            }
            TokenType::Input => {
                self.advance();
                self.expect(TokenType::LParen)?;
                let prompt = if self.check(TokenType::RParen) {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                self.expect(TokenType::RParen)?;
                Ok(Expr::new(ExprKind::Input { prompt }, tok.span))
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Identifier {
                        name: tok.lexeme,
                        binding: None,
                    },
                    tok.span,
                ))
            }
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::RParen)?;
                Ok(expr)
            }
            TokenType::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenType::RBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.match_token(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenType::RBracket)?;
                Ok(Expr::new(ExprKind::ArrayLiteral { elements }, tok.span))
            }
            _ => Err(Diagnostic::syntactic(
                tok.span,
                format!("expected expression, found {}", tok.describe()),
            )),
        }
    }
}
