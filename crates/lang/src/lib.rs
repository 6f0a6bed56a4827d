//! The scriptwarden agent-script DSL: lexer, parser, and line-tracked AST.
//!
//! The grammar is small enough that the safety layer's node-kind switch can
//! stay exhaustive. The surface still includes the syntax the validator must
//! reject (backtick literals, constants, globals); parsing something is not
//! the same as permitting it.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};

use thiserror::Error;

/// A lex or parse failure. The validator converts this into a single
/// `syntax_error` violation; unparseable input is treated as unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Lex and parse a script into a program AST.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}
