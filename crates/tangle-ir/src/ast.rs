use miette::SourceSpan;

/// A top-level DSL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    Kind(KindDecl<'a>),
    Rule(RuleDecl<'a>),
}

/// `(kind <Name> <Arity>)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDecl<'a> {
    pub name: &'a str,
    pub arity: u8,
    pub span: SourceSpan,
}

/// `(rule <KindA> <KindB> <cellTemplate>...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDecl<'a> {
    pub left: &'a str,
    pub right: &'a str,
    pub cells: Vec<CellTemplate<'a>>,
    pub span: SourceSpan,
}

/// `(<KindName> <var>...)`, one variable per port slot.
///
/// Variable spelling is interpreted by the rule compiler: `<N` and `N>`
/// bind to slot N of the left or right active cell, anything else names
/// an internal wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTemplate<'a> {
    pub kind: &'a str,
    pub vars: Vec<&'a str>,
    pub span: SourceSpan,
}
