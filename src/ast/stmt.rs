//! Statement AST definitions for the Dyre query language.

use super::expr::Expr;
use crate::error::Span;

/// Top-level node: an ordered list of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestStatements {
    pub statements: Vec<Statement>,
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `Name:`
    ColumnLiteral { name: String, span: Span },
    /// `Fn(args):` where `Fn` is a column function (AS, ALIAS, EXCLUDE).
    ColumnFunction {
        function: String,
        arguments: Vec<Expr>,
        span: Span,
    },
    /// `Fn(args):` where `Fn` is a group function (GROUP, COUNT, AVG, SUM, MIN, MAX).
    GroupFunction {
        function: String,
        arguments: Vec<Expr>,
        span: Span,
    },
    /// Any expression terminated by `;` or implicitly.
    Expression { expr: Option<Expr>, span: Span },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::ColumnLiteral { span, .. }
            | Statement::ColumnFunction { span, .. }
            | Statement::GroupFunction { span, .. }
            | Statement::Expression { span, .. } => *span,
        }
    }
}
