use crate::diagnostics::Diagnostic;
use crate::token::{Span, Token, TokenType};

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    /// Consume one code point. Columns advance by one per code point;
    /// a newline resets the column and bumps the line.
    fn advance(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn push(&mut self, token_type: TokenType, lexeme: impl Into<String>, span: Span) {
        self.tokens.push(Token::new(token_type, lexeme, span));
    }

    // -----------------------------------------------------------------------
    // Token readers
    // -----------------------------------------------------------------------

    fn read_number(&mut self) -> Result<(), Diagnostic> {
        let start = self.span();
        let mut text = String::new();
        let mut has_dot = false;

        while let Some(c) = self.current() {
            if c == '.' {
                if has_dot {
                    return Err(Diagnostic::lexical(
                        self.span(),
                        "number has more than one decimal point",
                    ));
                }
                has_dot = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }

        if has_dot {
            self.push(TokenType::FloatLiteral, text, start);
        } else {
            if text.parse::<i64>().is_err() {
                return Err(Diagnostic::lexical(start, "integer literal out of range"));
            }
            self.push(TokenType::IntLiteral, text, start);
        }
        Ok(())
    }

    /// Reads a quoted literal, decoding the escapes `\n`, `\r`, `\t`,
    /// `\\`, `\"` and `\'`. The token's lexeme is the decoded payload.
    fn read_string(&mut self) -> Result<(), Diagnostic> {
        let start = self.span();
        let quote = match self.current() {
            Some(q) => q,
            None => return Ok(()),
        };
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(Diagnostic::lexical(start, "unterminated string"));
                }
                Some(c) if c == quote => {
                    self.advance(); // closing quote
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escape_span = self.span();
                    match self.current() {
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some(other) => {
                            return Err(Diagnostic::lexical(
                                escape_span,
                                format!("invalid escape sequence '\\{other}'"),
                            ));
                        }
                        None => {
                            return Err(Diagnostic::lexical(start, "unterminated string"));
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        self.push(TokenType::StringLiteral, value, start);
        Ok(())
    }

    fn read_identifier(&mut self) {
        let start = self.span();
        let mut ident = String::new();

        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let token_type = TokenType::keyword_from_str(&ident).unwrap_or(TokenType::Identifier);
        self.push(token_type, ident, start);
    }

    // -----------------------------------------------------------------------
    // Main tokenize loop
    // -----------------------------------------------------------------------

    fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        while let Some(c) = self.current() {
            // Whitespace
            if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
                self.advance();
                continue;
            }

            // Comment: '#' to end of line
            if c == '#' {
                while !self.at_end() && self.current() != Some('\n') {
                    self.advance();
                }
                continue;
            }

            if c.is_ascii_digit() {
                self.read_number()?;
                continue;
            }

            if c == '"' || c == '\'' {
                self.read_string()?;
                continue;
            }

            if c.is_ascii_alphabetic() || c == '_' {
                self.read_identifier();
                continue;
            }

            // Two-character operators before their single-character prefixes
            let span = self.span();
            if let Some(next) = self.peek() {
                let two = match (c, next) {
                    ('=', '=') => Some(TokenType::Equal),
                    ('!', '=') => Some(TokenType::NotEqual),
                    ('<', '=') => Some(TokenType::LessEqual),
                    ('>', '=') => Some(TokenType::GreaterEqual),
                    _ => None,
                };
                if let Some(token_type) = two {
                    self.advance();
                    self.advance();
                    let lexeme: String = [c, next].iter().collect();
                    self.push(token_type, lexeme, span);
                    continue;
                }
            }

            let single = match c {
                '+' => Some(TokenType::Plus),
                '-' => Some(TokenType::Minus),
                '*' => Some(TokenType::Times),
                '/' => Some(TokenType::Divide),
                '%' => Some(TokenType::Modulo),
                '<' => Some(TokenType::Less),
                '>' => Some(TokenType::Greater),
                '=' => Some(TokenType::Assign),
                '(' => Some(TokenType::LParen),
                ')' => Some(TokenType::RParen),
                '{' => Some(TokenType::LBrace),
                '}' => Some(TokenType::RBrace),
                '[' => Some(TokenType::LBracket),
                ']' => Some(TokenType::RBracket),
                ';' => Some(TokenType::Semicolon),
                ',' => Some(TokenType::Comma),
                ':' => Some(TokenType::Colon),
                _ => None,
            };
            match single {
                Some(token_type) => {
                    self.advance();
                    self.push(token_type, c.to_string(), span);
                }
                None => {
                    return Err(Diagnostic::lexical(
                        span,
                        format!("unexpected character '{c}'"),
                    ));
                }
            }
        }

        let span = self.span();
        self.push(TokenType::Eof, "", span);
        Ok(self.tokens)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Tokenize a full source text. On success the stream always ends with a
/// single `Eof` token; the first lexical error aborts the scan.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(input).tokenize()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
