/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// The `null` keyword
    Null,

    /// The `true` keyword
    True,

    /// The `false` keyword
    False,

    /// Integer literal, decimal or hexadecimal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0xFF
    /// ```
    Int,

    /// Unsigned integer literal (`u`/`U` suffix)
    ///
    /// # Examples
    /// ```text
    /// 42u
    /// 0x1Au
    /// ```
    Uint,

    /// Floating-point literal with a decimal point and/or exponent
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 1e6
    /// 2.5e-3
    /// ```
    Double,

    /// String literal
    ///
    /// The token text keeps the raw lexeme, including quotes and any
    /// `r`/`R` prefix, so the parser can decode escapes (or skip decoding
    /// for raw strings).
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'it'
    /// r"no \n escapes"
    /// """spans
    /// lines"""
    /// ```
    String,

    /// Bytes literal (`b`/`B` prefix)
    ///
    /// # Examples
    /// ```text
    /// b"abc"
    /// B'\x00'
    /// ```
    Bytes,

    /// Identifier: `[A-Za-z_][A-Za-z0-9_]*`, excluding reserved words
    Ident,

    // Operators
    /// Addition or concatenation (`+`)
    Plus,

    /// Subtraction or unary negation (`-`)
    Minus,

    /// Multiplication or repetition (`*`)
    Star,

    /// Division (`/`)
    Slash,

    /// Modulo (`%`)
    Percent,

    /// Equality (`==`)
    EqEq,

    /// Inequality (`!=`)
    NotEq,

    /// Less than (`<`)
    Lt,

    /// Less than or equal (`<=`)
    LtEq,

    /// Greater than (`>`)
    Gt,

    /// Greater than or equal (`>=`)
    GtEq,

    /// Logical AND (`&&`)
    AndAnd,

    /// Logical OR (`||`)
    OrOr,

    /// Logical NOT (`!`)
    Bang,

    /// Membership test (`in`)
    In,

    // Delimiters
    /// Left parenthesis
    LParen,

    /// Right parenthesis
    RParen,

    /// Left bracket
    LBracket,

    /// Right bracket
    RBracket,

    /// Left brace
    LBrace,

    /// Right brace
    RBrace,

    /// Dot for member access and qualified names
    Dot,

    /// Comma separator
    Comma,

    /// Colon in map entries, field initializers, and conditionals
    Colon,

    /// Question mark opening a conditional
    Question,

    /// End of input
    Eof,
}

/// A lexical token with its raw text and 1-based source position.
///
/// `text` preserves the lexeme exactly as written, so string tokens still
/// carry their quotes and prefixes and numeric tokens carry any suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.kind, self.text)
    }
}
