//! # Abstract Syntax Tree
//!
//! This module defines the token and expression types produced by the lexer
//! and parser for the Common Expression Language (CEL).
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[operators]** - Binary and unary operators
//! - **[expressions]** - Expression nodes, map entries, field initializers,
//!   and the generalized comprehension form
//!
//! ## Core Concepts
//!
//! Expressions form a sealed sum type over which the interpreter matches
//! exhaustively. Every node is immutable after construction: a parsed
//! expression can be shared across threads and evaluated any number of
//! times against different environments.
//!
//! Macro calls (`list.map(x, expr)` and friends) are ordinary [`Expr::Call`]
//! nodes with `is_macro` set; their first argument is always an
//! [`Expr::Identifier`] naming the iteration variable.

pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Comprehension, Expr, FieldInit, Literal, MapEntry};
pub use operators::{BinaryOp, UnaryOp};
pub use tokens::{Token, TokenKind};
