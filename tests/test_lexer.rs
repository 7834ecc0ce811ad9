//! Integration tests for the lexer: full program scans, positions, and
//! failure modes, complementing the unit tests in `src/lexer.rs`.

use minilang::lexer::tokenize;
use minilang::token::TokenType;

#[test]
fn test_realistic_program_token_stream() {
    let src = r#"
# factorial
function fatorial(int n): int {
    if (n <= 1) {
        return 1;
    }
    return n * fatorial(n - 1);
}
print(fatorial(5));
"#;
    let tokens = tokenize(src).expect("lexing failed");
    let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
    assert_eq!(kinds[0], TokenType::Function);
    assert_eq!(kinds[1], TokenType::Identifier);
    assert_eq!(kinds[2], TokenType::LParen);
    assert_eq!(kinds[3], TokenType::IntType);
    assert_eq!(kinds[4], TokenType::Identifier);
    assert_eq!(kinds[5], TokenType::RParen);
    assert_eq!(kinds[6], TokenType::Colon);
    assert_eq!(kinds[7], TokenType::IntType);
    assert_eq!(kinds[8], TokenType::LBrace);
    assert_eq!(*kinds.last().unwrap(), TokenType::Eof);
}

#[test]
fn test_comment_only_source() {
    let tokens = tokenize("# nothing here\n# or here\n").unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token_type, TokenType::Eof);
}

#[test]
fn test_positions_across_lines() {
    let src = "int a = 1;\nint bb = 22;\n";
    let tokens = tokenize(src).unwrap();
    // second declaration starts on line 2
    let bb = tokens.iter().find(|t| t.lexeme == "bb").unwrap();
    assert_eq!(bb.span.line, 2);
    assert_eq!(bb.span.column, 5);
    let twenty_two = tokens.iter().find(|t| t.lexeme == "22").unwrap();
    assert_eq!(twenty_two.span.column, 10);
}

#[test]
fn test_string_spanning_tokens() {
    let tokens = tokenize(r#"print("Fatorial de 5:");"#).unwrap();
    assert_eq!(tokens[0].token_type, TokenType::Print);
    assert_eq!(tokens[2].token_type, TokenType::StringLiteral);
    assert_eq!(tokens[2].lexeme, "Fatorial de 5:");
}

#[test]
fn test_array_type_tokens() {
    let tokens = tokenize("array<int>[5]").unwrap();
    let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
    assert_eq!(
        kinds,
        vec![
            TokenType::Array,
            TokenType::Less,
            TokenType::IntType,
            TokenType::Greater,
            TokenType::LBracket,
            TokenType::IntLiteral,
            TokenType::RBracket,
            TokenType::Eof,
        ]
    );
}

#[test]
fn test_adjacent_operators_do_not_merge() {
    // '=' then '==' then '=' again
    let tokens = tokenize("a = b == c;").unwrap();
    assert_eq!(tokens[1].token_type, TokenType::Assign);
    assert_eq!(tokens[3].token_type, TokenType::Equal);
}

#[test]
fn test_error_position_reported_mid_file() {
    let err = tokenize("int ok = 1;\nint bad = $;\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 11);
    assert_eq!(err.message, "unexpected character '$'");
    assert_eq!(
        err.to_string(),
        "Lexical error at line 2, column 11: unexpected character '$'"
    );
}

#[test]
fn test_unterminated_string_points_at_opening_quote() {
    let err = tokenize("string s = \"abc").unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 12);
}
