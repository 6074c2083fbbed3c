use std::path::PathBuf;

use miette::{Diagnostic, SourceSpan};
use tangle_ir::IrError;
use tangle_net::{NetError, RuleError};
use thiserror::Error;

/// CLI-specific error type that provides rich diagnostics.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read {path}")]
    #[diagnostic(code(tangle::cli::io_error))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule syntax error: {message}")]
    #[diagnostic(code(tangle::cli::dsl_error))]
    Dsl {
        #[source_code]
        src: String,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
        #[source]
        source: IrError,
    },

    #[error("rule compilation failed")]
    #[diagnostic(code(tangle::cli::rule_error))]
    Rules {
        #[source]
        source: RuleError,
    },

    #[error("net load failed")]
    #[diagnostic(code(tangle::cli::net_error))]
    Net {
        #[source]
        source: NetError,
    },
}

/// Converts a DSL front-end error, carrying the source text so the span
/// renders as an annotated snippet.
pub fn convert_ir_error(error: IrError, source: &str) -> CliError {
    CliError::Dsl {
        src: source.to_string(),
        span: error.span(),
        message: error.message().to_string(),
        source: error,
    }
}

pub fn convert_io_error(error: std::io::Error, path: PathBuf) -> CliError {
    CliError::Io {
        path,
        source: error,
    }
}

impl From<RuleError> for CliError {
    fn from(source: RuleError) -> Self {
        CliError::Rules { source }
    }
}

impl From<NetError> for CliError {
    fn from(source: NetError) -> Self {
        CliError::Net { source }
    }
}
