use crate::{
    ast::{BinaryOp, Expr, FieldInit, Literal, MapEntry, Token, TokenKind, UnaryOp},
    lexer::{LexError, Lexer},
};

/// Method names that are interpreted as macros when they appear in method
/// position. Global-function form is never a macro.
const MACRO_METHODS: [&str; 5] = ["map", "filter", "all", "exists", "existsOne"];

/// Error raised when the input contains invalid syntax. Positions are
/// 1-based and point at the offending token.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at line {}, column {}", self.message, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

/// Recursive descent parser for CEL expressions.
///
/// Operates with a single token of state plus bounded lexer lookahead for
/// the two disambiguation points of the grammar: map vs. struct literals,
/// and qualified type names (`pkg.Type{...}`) vs. member access.
pub struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next()?;
        Ok(Parser { lexer, current })
    }

    /// Parses a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error(format!(
                "Unexpected token after expression: {}",
                self.current.text
            )));
        }
        Ok(expr)
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            line: self.current.line,
            column: self.current.column,
        }
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next()?;
        Ok(())
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if !self.check(kind) {
            return Err(self.error(format!(
                "Expected {:?} but found {:?}",
                kind, self.current.kind
            )));
        }
        self.advance()
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if !self.check(TokenKind::Ident) {
            return Err(self.error(format!(
                "Expected identifier but found {}",
                self.current.text
            )));
        }
        let name = self.current.text.clone();
        self.advance()?;
        Ok(name)
    }

    // expr = conditionalOr ( '?' conditionalOr ':' expr )?
    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_conditional_or()?;

        if self.matches(TokenKind::Question)? {
            let then = self.parse_conditional_or()?;
            self.expect(TokenKind::Colon)?;
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }

        Ok(condition)
    }

    // conditionalOr = conditionalAnd ( '||' conditionalAnd )*
    fn parse_conditional_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_conditional_and()?;

        while self.matches(TokenKind::OrOr)? {
            let right = self.parse_conditional_and()?;
            left = binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    // conditionalAnd = relation ( '&&' relation )*
    fn parse_conditional_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relation()?;

        while self.matches(TokenKind::AndAnd)? {
            let right = self.parse_relation()?;
            left = binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    // relation = addition ( relop addition )*
    // relop = '<' | '<=' | '>' | '>=' | '==' | '!=' | 'in'
    fn parse_relation(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_addition()?;

        while let Some(op) = relational_op(self.current.kind) {
            self.advance()?;
            let right = self.parse_addition()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    // addition = multiplication ( ('+' | '-') multiplication )*
    fn parse_addition(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplication()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplication()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    // multiplication = unary ( ('*' | '/' | '%') unary )*
    fn parse_multiplication(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    // unary = ('!' | '-') unary | member
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.matches(TokenKind::Bang)? {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        if self.matches(TokenKind::Minus)? {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(operand),
            });
        }

        self.parse_member()
    }

    // member = primary ( '.' ident callArgs? | '[' expr ']' )*
    fn parse_member(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(TokenKind::Dot) {
                self.advance()?;
                let field = self.expect_identifier()?;

                if self.check(TokenKind::LParen) {
                    self.advance()?;
                    let args = self.parse_expr_list()?;
                    self.expect(TokenKind::RParen)?;
                    let is_macro = MACRO_METHODS.contains(&field.as_str());
                    expr = Expr::Call {
                        target: Some(Box::new(expr)),
                        function: field,
                        args,
                        is_macro,
                    };
                } else {
                    expr = Expr::Select {
                        operand: Some(Box::new(expr)),
                        field,
                        test: false,
                    };
                }
            } else if self.check(TokenKind::LBracket) {
                self.advance()?;
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    operand: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    // primary = literal
    //         | ident callArgs?
    //         | listLiteral
    //         | mapLiteral
    //         | structLiteral
    //         | '(' expr ')'
    //         | '.' ident callArgs?
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if is_literal_token(self.current.kind) {
            return self.parse_literal();
        }

        if self.check(TokenKind::LBracket) {
            return self.parse_list_literal();
        }

        if self.check(TokenKind::LBrace) {
            return self.parse_map_or_struct(None);
        }

        if self.matches(TokenKind::LParen)? {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::RParen)?;
            return Ok(expr);
        }

        // Leading dot: .field or .fn(args), selecting against the
        // environment itself
        if self.matches(TokenKind::Dot)? {
            let field = self.expect_identifier()?;

            if self.matches(TokenKind::LParen)? {
                let args = self.parse_expr_list()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expr::Call {
                    target: None,
                    function: field,
                    args,
                    is_macro: false,
                });
            }

            return Ok(Expr::Select {
                operand: None,
                field,
                test: false,
            });
        }

        if self.check(TokenKind::Ident) {
            let name = self.current.text.clone();
            self.advance()?;

            // Function call
            if self.matches(TokenKind::LParen)? {
                let args = self.parse_expr_list()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expr::Call {
                    target: None,
                    function: name,
                    args,
                    is_macro: false,
                });
            }

            // A following dot may begin a qualified struct type
            // (pkg.Type{...}); commit only if the .ident chain ends in '{'
            if self.check(TokenKind::Dot) && self.is_qualified_struct_literal()? {
                let qualified = self.parse_qualified_ident(name)?;
                return self.parse_map_or_struct(Some(qualified));
            }

            // Struct literal with a simple type name
            if self.check(TokenKind::LBrace) {
                return self.parse_map_or_struct(Some(name));
            }

            return Ok(Expr::Identifier(name));
        }

        Err(self.error(format!("Unexpected token: {}", self.current.text)))
    }

    // listLiteral = '[' exprList? ','? ']'
    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBracket)?;
        let elements = self.parse_expr_list()?;
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::List(elements))
    }

    // mapLiteral or structLiteral, brace onwards
    fn parse_map_or_struct(&mut self, type_name: Option<String>) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBrace)?;

        if self.matches(TokenKind::RBrace)? {
            if type_name.is_some() {
                return Ok(Expr::Struct {
                    type_name,
                    fields: Vec::new(),
                });
            }
            return Ok(Expr::Map(Vec::new()));
        }

        // An identifier directly followed by ':' opens a field
        // initializer; anything else opens a map entry. A leading type
        // name forces struct form.
        let is_struct = self.check(TokenKind::Ident)
            && self.lexer.peek(1)?.kind == TokenKind::Colon;

        if is_struct || type_name.is_some() {
            let fields = self.parse_field_inits()?;
            self.expect(TokenKind::RBrace)?;
            Ok(Expr::Struct { type_name, fields })
        } else {
            let entries = self.parse_map_inits()?;
            self.expect(TokenKind::RBrace)?;
            Ok(Expr::Map(entries))
        }
    }

    // exprList = expr ( ',' expr )* ','?
    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut expressions = Vec::new();

        if self.check(TokenKind::RParen) || self.check(TokenKind::RBracket) {
            return Ok(expressions);
        }

        expressions.push(self.parse_expr()?);

        while self.matches(TokenKind::Comma)? {
            if self.check(TokenKind::RParen) || self.check(TokenKind::RBracket) {
                break;
            }
            expressions.push(self.parse_expr()?);
        }

        Ok(expressions)
    }

    // mapInits = mapInit ( ',' mapInit )* ','?
    fn parse_map_inits(&mut self) -> Result<Vec<MapEntry>, ParseError> {
        let mut entries = vec![self.parse_map_init()?];

        while self.matches(TokenKind::Comma)? {
            if self.check(TokenKind::RBrace) {
                break;
            }
            entries.push(self.parse_map_init()?);
        }

        Ok(entries)
    }

    // mapInit = expr ':' expr
    fn parse_map_init(&mut self) -> Result<MapEntry, ParseError> {
        let key = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_expr()?;
        Ok(MapEntry { key, value })
    }

    // fieldInits = fieldInit ( ',' fieldInit )* ','?
    fn parse_field_inits(&mut self) -> Result<Vec<FieldInit>, ParseError> {
        let mut fields = vec![self.parse_field_init()?];

        while self.matches(TokenKind::Comma)? {
            if self.check(TokenKind::RBrace) {
                break;
            }
            fields.push(self.parse_field_init()?);
        }

        Ok(fields)
    }

    // fieldInit = ident ':' expr
    fn parse_field_init(&mut self) -> Result<FieldInit, ParseError> {
        let field = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_expr()?;
        Ok(FieldInit { field, value })
    }

    // qualifiedIdent = ident ( '.' ident )*
    fn parse_qualified_ident(&mut self, first: String) -> Result<String, ParseError> {
        let mut qualified = first;

        while self.matches(TokenKind::Dot)? {
            qualified.push('.');
            qualified.push_str(&self.expect_identifier()?);
        }

        Ok(qualified)
    }

    // Checks for the pattern '.' ident ( '.' ident )* '{' to distinguish
    // Type.Name{...} from obj.field. The current token is the dot.
    fn is_qualified_struct_literal(&mut self) -> Result<bool, ParseError> {
        let mut lookahead = 1;
        let mut token = self.lexer.peek(lookahead)?;

        if token.kind != TokenKind::Ident {
            return Ok(false);
        }

        lookahead += 1;
        token = self.lexer.peek(lookahead)?;

        while token.kind == TokenKind::Dot {
            lookahead += 1;
            token = self.lexer.peek(lookahead)?;
            if token.kind != TokenKind::Ident {
                return Ok(false);
            }
            lookahead += 1;
            token = self.lexer.peek(lookahead)?;
        }

        Ok(token.kind == TokenKind::LBrace)
    }

    fn parse_literal(&mut self) -> Result<Expr, ParseError> {
        let token = self.current.clone();
        self.advance()?;

        let literal = match token.kind {
            TokenKind::Null => Literal::Null,
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Int => Literal::Int(decode_int(&token)?),
            TokenKind::Uint => Literal::Uint(decode_uint(&token)?),
            TokenKind::Double => Literal::Double(decode_double(&token)?),
            TokenKind::String => Literal::String(decode_string(&token.text)),
            TokenKind::Bytes => Literal::Bytes(decode_bytes(&token.text)),
            _ => {
                return Err(ParseError {
                    message: format!("Not a literal: {}", token.text),
                    line: token.line,
                    column: token.column,
                })
            }
        };

        Ok(Expr::Literal(literal))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn is_literal_token(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Null
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Int
            | TokenKind::Uint
            | TokenKind::Double
            | TokenKind::String
            | TokenKind::Bytes
    )
}

fn relational_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::Le),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::Ge),
        TokenKind::EqEq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::Ne),
        TokenKind::In => Some(BinaryOp::In),
        _ => None,
    }
}

fn literal_error(token: &Token) -> ParseError {
    ParseError {
        message: format!("Invalid numeric literal: {}", token.text),
        line: token.line,
        column: token.column,
    }
}

fn decode_int(token: &Token) -> Result<i64, ParseError> {
    let text = &token.text;
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        text.parse::<i64>()
    };
    parsed.map_err(|_| literal_error(token))
}

fn decode_uint(token: &Token) -> Result<i64, ParseError> {
    // Strip the 'u'/'U' suffix; the value lives in a signed 64-bit slot
    let number = &token.text[..token.text.len() - 1];
    let parsed = if let Some(hex) = number.strip_prefix("0x").or_else(|| number.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        number.parse::<u64>()
    };
    parsed
        .ok()
        .and_then(|v| i64::try_from(v).ok())
        .ok_or_else(|| literal_error(token))
}

fn decode_double(token: &Token) -> Result<f64, ParseError> {
    token.text.parse::<f64>().map_err(|_| literal_error(token))
}

fn decode_string(text: &str) -> String {
    let is_raw = text.starts_with('r') || text.starts_with('R');
    let body = if is_raw { &text[1..] } else { text };

    if body.starts_with("\"\"\"") || body.starts_with("'''") {
        let content = &body[3..body.len() - 3];
        if is_raw {
            content.to_string()
        } else {
            unescape(content)
        }
    } else {
        let content = &body[1..body.len() - 1];
        if is_raw {
            content.to_string()
        } else {
            unescape(content)
        }
    }
}

fn decode_bytes(text: &str) -> Vec<u8> {
    // Strip the b/B prefix and quotes, then decode like a string
    let content = &text[2..text.len() - 1];
    unescape(content).into_bytes()
}

/// Decodes backslash escapes. Unknown or truncated sequences keep the
/// backslash as a literal character rather than erroring.
fn unescape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut result = String::with_capacity(value.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            result.push(chars[i]);
            i += 1;
            continue;
        }

        let next = chars[i + 1];
        match next {
            '\\' | '"' | '\'' | '`' | '?' => {
                result.push(next);
                i += 2;
            }
            'a' => {
                result.push('\u{0007}');
                i += 2;
            }
            'b' => {
                result.push('\u{0008}');
                i += 2;
            }
            'f' => {
                result.push('\u{000C}');
                i += 2;
            }
            'n' => {
                result.push('\n');
                i += 2;
            }
            'r' => {
                result.push('\r');
                i += 2;
            }
            't' => {
                result.push('\t');
                i += 2;
            }
            'v' => {
                result.push('\u{000B}');
                i += 2;
            }
            'x' if i + 3 < chars.len() => {
                let hex: String = chars[i + 2..i + 4].iter().collect();
                match u32::from_str_radix(&hex, 16) {
                    Ok(code) => {
                        result.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        i += 4;
                    }
                    Err(_) => {
                        result.push(chars[i]);
                        i += 1;
                    }
                }
            }
            'u' if i + 5 < chars.len() => {
                let hex: String = chars[i + 2..i + 6].iter().collect();
                match u32::from_str_radix(&hex, 16) {
                    Ok(code) => {
                        result.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        i += 6;
                    }
                    Err(_) => {
                        result.push(chars[i]);
                        i += 1;
                    }
                }
            }
            'U' if i + 9 < chars.len() => {
                let hex: String = chars[i + 2..i + 10].iter().collect();
                match u32::from_str_radix(&hex, 16) {
                    Ok(code) => {
                        result.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        i += 10;
                    }
                    Err(_) => {
                        result.push(chars[i]);
                        i += 1;
                    }
                }
            }
            // Octal escape: \OOO with the first digit 0-3
            '0'..='3'
                if i + 3 < chars.len()
                    && ('0'..='7').contains(&chars[i + 2])
                    && ('0'..='7').contains(&chars[i + 3]) =>
            {
                let octal: String = chars[i + 1..i + 4].iter().collect();
                let code = u32::from_str_radix(&octal, 8).unwrap_or(0);
                result.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                i += 4;
            }
            _ => {
                result.push('\\');
                i += 1;
            }
        }
    }

    result
}
