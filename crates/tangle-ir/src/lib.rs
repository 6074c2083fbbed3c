//! Front end for the rule DSL: parenthesized `kind` and `rule` statements.
//!
//! The DSL drives the rule compiler in `tangle-net`. This crate only turns
//! source text into a statement list; name resolution and arity checking
//! happen during rule compilation.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{lex, Token, TokenKind};

use thiserror::Error;
pub use miette::SourceSpan;

/// Errors raised while reading DSL text.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { span: SourceSpan, message: String },

    #[error("Parser error at {span:?}: {message}")]
    Parser { span: SourceSpan, message: String },
}

impl IrError {
    /// The source location the error points at.
    pub fn span(&self) -> SourceSpan {
        match self {
            IrError::Lexer { span, .. } | IrError::Parser { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            IrError::Lexer { message, .. } | IrError::Parser { message, .. } => message,
        }
    }
}

/// Result type for DSL front-end operations.
pub type IrResult<T> = std::result::Result<T, IrError>;

/// Parses a whole DSL source into its statement list.
pub fn parse(input: &str) -> IrResult<Vec<Statement<'_>>> {
    let tokens = lexer::lex(input)?;
    parser::Parser::new(&tokens).parse_program()
}
