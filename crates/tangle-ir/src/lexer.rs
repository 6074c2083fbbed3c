use crate::{IrError, IrResult};
use logos::Logos;
use miette::SourceSpan;

/// A token spans from `start` to `end` within the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: SourceSpan,
}

/// All possible tokens in the rule DSL.
#[derive(Debug, Logos, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // Statement heads, kind names and wire variables, including the
    // `<N` / `N>` external forms.
    #[regex(r"[a-zA-Z0-9_<>\-]+")]
    Atom,

    // Whitespace (to be skipped)
    #[regex(r"[ \t\n\r]+", logos::skip)]
    Whitespace,

    // Catch-all for anything unexpected
    #[error]
    Error,
}

/// Lexes the input string into a vector of tokens.
pub fn lex(input: &str) -> IrResult<Vec<Token<'_>>> {
    let mut lexer = TokenKind::lexer(input);
    let mut tokens = Vec::new();

    while let Some(kind) = lexer.next() {
        let range = lexer.span();
        let lexeme = &input[range.clone()];
        let span = SourceSpan::new(range.start.into(), range.len());

        match kind {
            TokenKind::Error => {
                return Err(IrError::Lexer {
                    span,
                    message: format!("Unrecognized token: '{}'", lexeme),
                });
            }
            _ => {
                tokens.push(Token { kind, lexeme, span });
            }
        }
    }

    Ok(tokens)
}
