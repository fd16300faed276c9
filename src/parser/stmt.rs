//! Top-level statement classification for the Dyre query language.

use super::Parser;
use crate::ast::{RequestStatements, Statement};
use crate::error::Span;
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_request_statements(&mut self) -> RequestStatements {
        let mut statements = Vec::new();

        while !self.is_eof() {
            if matches!(self.peek().kind, TokenKind::Semi) {
                self.advance();
                continue;
            }

            let statement = self.parse_statement();
            tracing::debug!(?statement, "parsed statement");
            statements.push(statement);
        }

        RequestStatements { statements }
    }

    fn parse_statement(&mut self) -> Statement {
        // identifier ':'  => ColumnLiteral
        if let TokenKind::Identifier(_) = &self.peek().kind {
            if matches!(self.peek_nth(1).kind, TokenKind::Colon) {
                return self.parse_column_literal();
            }
        }

        // keyword '(' ... ')' ':' => column or group function
        if let TokenKind::Keyword(kw) = self.peek().kind {
            if matches!(self.peek_nth(1).kind, TokenKind::LParen)
                && (kw.is_column_function() || kw.is_group_function())
            {
                return self.parse_function_statement(kw);
            }
        }

        self.parse_expression_statement()
    }

    fn parse_column_literal(&mut self) -> Statement {
        let token = self.advance();
        let colon = self.advance(); // ':'
        let name = match &token.kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => unreachable!("caller verified identifier"),
        };
        Statement::ColumnLiteral {
            name,
            span: token.span.merge(colon.span),
        }
    }

    fn parse_function_statement(&mut self, kw: Keyword) -> Statement {
        let name_token = self.advance();
        self.advance(); // '('
        let arguments = self.parse_argument_list();
        let close = self.expect_rparen_for_fn(name_token.span);
        let colon_span = if matches!(self.peek().kind, TokenKind::Colon) {
            self.advance().span
        } else {
            close
        };
        let span = name_token.span.merge(colon_span);
        let function = kw.fn_name().to_string();

        if kw.is_group_function() {
            Statement::GroupFunction { function, arguments, span }
        } else {
            Statement::ColumnFunction { function, arguments, span }
        }
    }

    fn expect_rparen_for_fn(&mut self, opened_at: Span) -> Span {
        if matches!(self.peek().kind, TokenKind::RParen) {
            self.advance().span
        } else {
            let found = self.peek().clone();
            self.record(crate::error::Error::parse(
                format!("expected ')' to close '(' at {opened_at}, found {}", found.kind),
                found.span,
            ));
            found.span
        }
    }

    fn parse_expression_statement(&mut self) -> Statement {
        let start = self.peek().span;

        let expr = self.parse_expression();

        let end = if matches!(self.peek().kind, TokenKind::Semi) {
            self.advance().span
        } else {
            expr.span
        };

        Statement::Expression {
            span: start.merge(end),
            expr: Some(*expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;

    fn parse(src: &str) -> RequestStatements {
        let (stmts, errs) = Parser::new(src).parse();
        assert!(errs.is_empty(), "unexpected parse errors: {errs:?}");
        stmts
    }

    #[test]
    fn column_literal() {
        let stmts = parse("Int:");
        assert_eq!(stmts.statements.len(), 1);
        assert!(matches!(
            &stmts.statements[0],
            Statement::ColumnLiteral { name, .. } if name == "Int"
        ));
    }

    #[test]
    fn column_function_as() {
        let stmts = parse("AS('NewName', @('Int')):");
        assert!(matches!(
            &stmts.statements[0],
            Statement::ColumnFunction { function, arguments, .. }
                if function == "AS" && arguments.len() == 2
        ));
    }

    #[test]
    fn group_function_sum() {
        let stmts = parse("GROUP('Str'):SUM('sumInt', @('Int')):");
        assert_eq!(stmts.statements.len(), 2);
        assert!(matches!(&stmts.statements[0], Statement::GroupFunction { function, .. } if function == "GROUP"));
        assert!(matches!(&stmts.statements[1], Statement::GroupFunction { function, .. } if function == "SUM"));
    }

    #[test]
    fn bare_operator_synthesizes_reference() {
        let stmts = parse("Int: > 5 OR < 10");
        assert_eq!(stmts.statements.len(), 2);
        match &stmts.statements[1] {
            Statement::Expression { expr: Some(e), .. } => match &e.kind {
                ExprKind::Infix { left, .. } => {
                    assert!(matches!(left.kind, ExprKind::Infix { .. }));
                }
                other => panic!("expected top-level infix, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn grouping_exclusivity_is_not_enforced_by_parser() {
        // mixing ColumnLiteral and GroupFunction parses fine at the syntax
        // level; the evaluator is the one that rejects this (see eval tests).
        let stmts = parse("Int: GROUP('Str'):");
        assert_eq!(stmts.statements.len(), 2);
    }
}
