use crate::ast::*;
use crate::lexer::{Token, TokenKind};
use crate::{IrError, IrResult};
use miette::SourceSpan;

/// Hand-rolled recursive-descent parser over the token slice.
///
/// The token buffer borrow (`'t`) is kept apart from the source borrow
/// (`'a`): the statements only hold slices of the source, so they outlive
/// the tokens they were parsed from.
pub struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Peek at the current token without consuming it.
    fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos)
    }

    /// Consume and return the current token.
    fn next(&mut self) -> Option<&'t Token<'a>> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    /// Expect the next token to be of a specific kind.
    fn expect(&mut self, expected: TokenKind) -> IrResult<&'t Token<'a>> {
        match self.next() {
            Some(t) if t.kind == expected => Ok(t),
            Some(t) => Err(IrError::Parser {
                span: t.span,
                message: format!("Expected {:?}, found {:?}", expected, t.kind),
            }),
            None => Err(IrError::Parser {
                span: SourceSpan::new(0.into(), 0usize),
                message: format!("Unexpected end of input; expected {:?}", expected),
            }),
        }
    }

    /// Expect an atom and return its lexeme and span.
    fn expect_atom(&mut self) -> IrResult<(&'a str, SourceSpan)> {
        let tok = self.expect(TokenKind::Atom)?;
        Ok((tok.lexeme, tok.span))
    }

    //--------------------------------------------------------------------------
    // Top-level grammar: <Program> ::= <Statement>*
    //--------------------------------------------------------------------------

    pub fn parse_program(&mut self) -> IrResult<Vec<Statement<'a>>> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// <Statement> ::= "(" "kind" <Name> <Arity> ")"
    ///               | "(" "rule" <Name> <Name> <Cell>* ")"
    fn parse_statement(&mut self) -> IrResult<Statement<'a>> {
        self.expect(TokenKind::LParen)?;
        let (head, span) = self.expect_atom()?;

        match head {
            "kind" => {
                let (name, _) = self.expect_atom()?;
                let (arity_str, arity_span) = self.expect_atom()?;
                let arity: u8 = arity_str.parse().map_err(|_| IrError::Parser {
                    span: arity_span,
                    message: format!("Invalid arity: '{}'", arity_str),
                })?;
                self.expect(TokenKind::RParen)?;
                Ok(Statement::Kind(KindDecl { name, arity, span }))
            }
            "rule" => {
                let (left, _) = self.expect_atom()?;
                let (right, _) = self.expect_atom()?;
                let mut cells = Vec::new();
                while matches!(self.peek(), Some(t) if t.kind == TokenKind::LParen) {
                    cells.push(self.parse_cell()?);
                }
                self.expect(TokenKind::RParen)?;
                Ok(Statement::Rule(RuleDecl { left, right, cells, span }))
            }
            _ => Err(IrError::Parser {
                span,
                message: format!("Unknown statement: {}", head),
            }),
        }
    }

    /// <Cell> ::= "(" <KindName> <var>* ")"
    fn parse_cell(&mut self) -> IrResult<CellTemplate<'a>> {
        self.expect(TokenKind::LParen)?;
        let (kind, span) = self.expect_atom()?;
        let mut vars = Vec::new();
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::Atom) {
            let (var, _) = self.expect_atom()?;
            vars.push(var);
        }
        self.expect(TokenKind::RParen)?;
        Ok(CellTemplate { kind, vars, span })
    }
}
