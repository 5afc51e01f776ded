/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    /// Addition, concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Sub,
    /// Multiplication, repetition (`*`)
    Mul,
    /// Division (`/`)
    Div,
    /// Modulo (`%`)
    Mod,

    // Comparison
    /// Equal (`==`)
    Eq,
    /// Not equal (`!=`)
    Ne,
    /// Less than (`<`)
    Lt,
    /// Less than or equal (`<=`)
    Le,
    /// Greater than (`>`)
    Gt,
    /// Greater than or equal (`>=`)
    Ge,

    // Logical
    /// Short-circuit AND (`&&`)
    And,
    /// Short-circuit OR (`||`)
    Or,

    /// Membership test (`in`)
    In,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical NOT (`!`)
    Not,
    /// Numeric negation (`-`)
    Negate,
}
