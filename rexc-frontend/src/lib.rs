//! REX Compiler - Frontend
//!
//! This crate provides the frontend components for the REX compiler:
//! - Lexer: tokenizes REX source code
//! - Parser: builds AST from tokens
//! - AST: abstract syntax tree definitions and the textual AST dump
//!
//! The REX language is deliberately small: extern declarations, function
//! definitions, `parallel` blocks, counted `for` loops, and calls. The
//! IR core consumes the AST produced here; it never sees source text.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    Expression, ExpressionKind, ExternDecl, FunctionDef, Item, ParamType, Program, Statement,
    StatementKind,
};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;

use rexc_common::CompilerError;

/// Parse REX source code into an AST.
///
/// `filename` is threaded into every source location for diagnostics.
pub fn parse_source(source: &str, filename: &str) -> Result<Program, CompilerError> {
    let mut lexer = Lexer::new(source, filename);
    let tokens = lexer.tokenize()?;

    let mut parser = Parser::new(tokens);
    parser.parse_program()
}
