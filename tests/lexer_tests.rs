// tests/lexer_tests.rs

use cel_lang::ast::TokenKind;
use cel_lang::lexer::Lexer;

fn kinds(input: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(input);
    let mut result = Vec::new();
    loop {
        let token = lexer.next().unwrap();
        let kind = token.kind;
        result.push(kind);
        if kind == TokenKind::Eof {
            return result;
        }
    }
}

// ============================================================================
// Single Character Tokens
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        ("[", TokenKind::LBracket),
        ("]", TokenKind::RBracket),
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
        (".", TokenKind::Dot),
        (",", TokenKind::Comma),
        (":", TokenKind::Colon),
        ("?", TokenKind::Question),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("<", TokenKind::Lt),
        (">", TokenKind::Gt),
        ("!", TokenKind::Bang),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, expected, "Failed for input: {}", input);
        assert_eq!(token.text, input);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
    }
}

// ============================================================================
// Two Character Tokens
// ============================================================================

#[test]
fn test_two_char_tokens() {
    let test_cases = vec![
        ("==", TokenKind::EqEq),
        ("!=", TokenKind::NotEq),
        ("<=", TokenKind::LtEq),
        (">=", TokenKind::GtEq),
        ("&&", TokenKind::AndAnd),
        ("||", TokenKind::OrOr),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, expected, "Failed for input: {}", input);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
    }
}

#[test]
fn test_two_char_vs_single_char() {
    assert_eq!(
        kinds("< <="),
        vec![TokenKind::Lt, TokenKind::LtEq, TokenKind::Eof]
    );
    assert_eq!(
        kinds("! !="),
        vec![TokenKind::Bang, TokenKind::NotEq, TokenKind::Eof]
    );
    assert_eq!(
        kinds(">= >"),
        vec![TokenKind::GtEq, TokenKind::Gt, TokenKind::Eof]
    );
}

#[test]
fn test_single_ampersand_is_invalid() {
    let mut lexer = Lexer::new("a & b");
    lexer.next().unwrap();
    let result = lexer.next();
    assert!(result.is_err());
    let error = result.unwrap_err();
    assert!(error.message.contains("Unexpected character"));
    assert_eq!(error.column, 3);
}

// ============================================================================
// Keywords and Identifiers
// ============================================================================

#[test]
fn test_keywords() {
    let test_cases = vec![
        ("null", TokenKind::Null),
        ("true", TokenKind::True),
        ("false", TokenKind::False),
        ("in", TokenKind::In),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        assert_eq!(lexer.next().unwrap().kind, expected, "Failed for: {}", input);
    }
}

#[test]
fn test_keywords_vs_identifiers() {
    // Keywords are whole-word only
    let test_cases = vec!["nullable", "trueish", "falsey", "inside", "_in", "null_"];

    for input in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Ident, "Failed for: {}", input);
        assert_eq!(token.text, input);
    }
}

#[test]
fn test_identifiers() {
    let test_cases = vec!["x", "user_name", "_private", "camelCase", "x2"];

    for input in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Ident);
        assert_eq!(token.text, input);
    }
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_integers() {
    let test_cases = vec!["0", "42", "1234567890"];

    for input in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Int, "Failed for: {}", input);
        assert_eq!(token.text, input);
    }
}

#[test]
fn test_hex_integers() {
    for input in ["0x10", "0XFF", "0x1a"] {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Int, "Failed for: {}", input);
        assert_eq!(token.text, input);
    }
}

#[test]
fn test_uint_suffix() {
    for input in ["42u", "42U", "0x10u", "0xFFU"] {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Uint, "Failed for: {}", input);
        assert_eq!(token.text, input);
    }
}

#[test]
fn test_doubles() {
    for input in ["3.14", "0.5", "1e6", "2.5e-3", "1E+2"] {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Double, "Failed for: {}", input);
        assert_eq!(token.text, input);
    }
}

#[test]
fn test_minus_is_not_part_of_number() {
    assert_eq!(
        kinds("-5"),
        vec![TokenKind::Minus, TokenKind::Int, TokenKind::Eof]
    );
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_string_lexemes_keep_quotes() {
    let test_cases = vec![
        (r#""hello""#, TokenKind::String),
        ("'world'", TokenKind::String),
        (r#"r"raw""#, TokenKind::String),
        ("R'raw'", TokenKind::String),
        (r#""""triple""""#, TokenKind::String),
        ("'''triple'''", TokenKind::String),
        (r#"b"bytes""#, TokenKind::Bytes),
        ("B'bytes'", TokenKind::Bytes),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, expected, "Failed for: {}", input);
        assert_eq!(token.text, input, "Lexeme must be preserved verbatim");
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
    }
}

#[test]
fn test_string_with_escaped_quote() {
    let mut lexer = Lexer::new(r#""say \"hi\"""#);
    let token = lexer.next().unwrap();
    assert_eq!(token.kind, TokenKind::String);
    assert_eq!(token.text, r#""say \"hi\"""#);
}

#[test]
fn test_triple_quoted_string_spans_newlines() {
    let mut lexer = Lexer::new("\"\"\"line 1\nline 2\"\"\" x");
    let token = lexer.next().unwrap();
    assert_eq!(token.kind, TokenKind::String);

    // The identifier after the string is on line 2
    let next = lexer.next().unwrap();
    assert_eq!(next.kind, TokenKind::Ident);
    assert_eq!(next.line, 2);
}

#[test]
fn test_unterminated_string_reports_opening_quote() {
    let mut lexer = Lexer::new("  \"abc");
    let error = lexer.next().unwrap_err();
    assert!(error.message.contains("Unterminated string"));
    assert_eq!(error.line, 1);
    assert_eq!(error.column, 3);
}

#[test]
fn test_unterminated_triple_quoted_string() {
    let mut lexer = Lexer::new("\"\"\"abc");
    let error = lexer.next().unwrap_err();
    assert!(error.message.contains("Unterminated triple-quoted string"));
}

#[test]
fn test_unterminated_bytes_literal() {
    let mut lexer = Lexer::new("b\"abc");
    let error = lexer.next().unwrap_err();
    assert!(error.message.contains("Unterminated bytes literal"));
}

#[test]
fn test_r_and_b_identifiers_are_not_prefixes() {
    // 'r' and 'b' only start a string when a quote follows
    assert_eq!(
        kinds("r + b"),
        vec![TokenKind::Ident, TokenKind::Plus, TokenKind::Ident, TokenKind::Eof]
    );
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn test_line_and_column_tracking() {
    let mut lexer = Lexer::new("a\n  b\nc");

    let a = lexer.next().unwrap();
    assert_eq!((a.line, a.column), (1, 1));

    let b = lexer.next().unwrap();
    assert_eq!((b.line, b.column), (2, 3));

    let c = lexer.next().unwrap();
    assert_eq!((c.line, c.column), (3, 1));
}

#[test]
fn test_crlf_counts_as_one_newline() {
    let mut lexer = Lexer::new("a\r\nb\rc");

    lexer.next().unwrap();
    let b = lexer.next().unwrap();
    assert_eq!((b.line, b.column), (2, 1));
    let c = lexer.next().unwrap();
    assert_eq!((c.line, c.column), (3, 1));
}

#[test]
fn test_unicode_whitespace_is_skipped() {
    let mut lexer = Lexer::new("\u{00A0}\t x");
    let token = lexer.next().unwrap();
    assert_eq!(token.kind, TokenKind::Ident);
    assert_eq!(token.text, "x");
}

// ============================================================================
// Lookahead
// ============================================================================

#[test]
fn test_peek_buffers_tokens() {
    let mut lexer = Lexer::new("a.b.C{");

    assert_eq!(lexer.peek(1).unwrap().kind, TokenKind::Ident);
    assert_eq!(lexer.peek(4).unwrap().kind, TokenKind::Dot);
    assert_eq!(lexer.peek(6).unwrap().kind, TokenKind::LBrace);

    // Consuming drains the buffer in order
    assert_eq!(lexer.next().unwrap().text, "a");
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Dot);
    assert_eq!(lexer.next().unwrap().text, "b");
}

#[test]
fn test_eof_is_repeatable() {
    let mut lexer = Lexer::new("");
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
}
