use std::sync::Arc;

use crate::{
    ast::Expr,
    functions::{Functions, StandardFunctions},
    interpreter::{EvalError, Interpreter},
    parser::{ParseError, Parser},
    value::{Environment, Value},
};

/// Error from the one-shot [`eval`] entry points, covering both phases.
#[derive(Debug, Clone)]
pub enum Error {
    /// Syntax error from the lexer or parser, with source position
    Parse(ParseError),
    /// Error raised during evaluation
    Eval(EvalError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::Eval(e)
    }
}

/// A compiled expression that can be evaluated many times.
///
/// The parsed AST is immutable and the registry is behind an `Arc`, so a
/// program can be shared freely across threads; each evaluation works on
/// its own copy of the caller's environment, which is therefore observably
/// unchanged afterwards.
pub struct Program {
    ast: Expr,
    functions: Arc<dyn Functions>,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program").field("ast", &self.ast).finish()
    }
}

impl Program {
    pub fn new(ast: Expr, functions: Arc<dyn Functions>) -> Self {
        Program { ast, functions }
    }

    /// The parsed expression.
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluates the program against the given variable bindings.
    ///
    /// # Examples
    ///
    /// ```
    /// use cel_lang::{compile, Environment, Value};
    ///
    /// let program = compile("price * quantity").unwrap();
    ///
    /// let mut env = Environment::new();
    /// env.insert("price".to_string(), Value::Int(10));
    /// env.insert("quantity".to_string(), Value::Int(5));
    ///
    /// assert_eq!(program.evaluate(&env).unwrap(), Value::Int(50));
    /// ```
    pub fn evaluate(&self, variables: &Environment) -> Result<Value, EvalError> {
        let mut env = variables.clone();
        Interpreter::new(&mut env, self.functions.as_ref()).evaluate(&self.ast)
    }
}

/// Compiles an expression with the standard function library.
pub fn compile(source: &str) -> Result<Program, ParseError> {
    compile_with(source, Arc::new(StandardFunctions::new()))
}

/// Compiles an expression with a custom function registry.
pub fn compile_with(source: &str, functions: Arc<dyn Functions>) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source)?;
    Ok(Program::new(parser.parse()?, functions))
}

/// Parses and evaluates an expression in one step.
///
/// Equivalent to `compile(source)?.evaluate(variables)`; prefer
/// [`compile`] when the same expression is evaluated repeatedly.
///
/// # Examples
///
/// ```
/// use cel_lang::{eval, Environment, Value};
///
/// let mut env = Environment::new();
/// env.insert("x".to_string(), Value::Int(10));
/// env.insert("y".to_string(), Value::Int(5));
///
/// assert_eq!(eval("x * 2 + y", &env).unwrap(), Value::Int(25));
/// ```
pub fn eval(source: &str, variables: &Environment) -> Result<Value, Error> {
    Ok(compile(source)?.evaluate(variables)?)
}

/// Parses and evaluates an expression with a custom function registry.
pub fn eval_with(
    source: &str,
    variables: &Environment,
    functions: Arc<dyn Functions>,
) -> Result<Value, Error> {
    Ok(compile_with(source, functions)?.evaluate(variables)?)
}
