//! Expression parsing: a Pratt parser over the DSL's operator set.

use super::{Parser, Precedence};
use crate::ast::{Expr, ExprKind};
use crate::error::{Error, Span};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    /// Parse a full expression at the lowest precedence.
    pub(super) fn parse_expression(&mut self) -> Box<Expr> {
        self.parse_expression_prec(Precedence::Lowest)
    }

    fn parse_expression_prec(&mut self, min_prec: Precedence) -> Box<Expr> {
        let left = self.parse_prefix();
        self.parse_infix_chain(left, min_prec)
    }

    fn parse_infix_chain(&mut self, mut left: Box<Expr>, min_prec: Precedence) -> Box<Expr> {
        loop {
            let (prec, operator) = match self.infix_operator() {
                Some(pair) => pair,
                None => break,
            };
            if prec < min_prec {
                break;
            }

            self.advance();
            let right = self.parse_expression_prec(Self::next_precedence(prec));
            let span = left.span.merge(right.span);
            left = Expr::boxed(
                ExprKind::Infix {
                    left,
                    operator,
                    right,
                },
                span,
            );
        }
        left
    }

    fn next_precedence(prec: Precedence) -> Precedence {
        match prec {
            Precedence::Lowest => Precedence::Condition,
            Precedence::Condition => Precedence::Equals,
            Precedence::Equals => Precedence::LessGreater,
            Precedence::LessGreater => Precedence::Sum,
            Precedence::Sum => Precedence::Product,
            Precedence::Product => Precedence::Prefix,
            Precedence::Prefix => Precedence::Call,
            Precedence::Call => Precedence::Call,
        }
    }

    fn infix_operator(&mut self) -> Option<(Precedence, String)> {
        match &self.peek().kind {
            TokenKind::Keyword(Keyword::And) => Some((Precedence::Condition, "AND".to_string())),
            TokenKind::Keyword(Keyword::Or) => Some((Precedence::Condition, "OR".to_string())),
            TokenKind::Eq => Some((Precedence::Equals, "==".to_string())),
            TokenKind::NotEq => Some((Precedence::Equals, "!=".to_string())),
            TokenKind::Lt => Some((Precedence::LessGreater, "<".to_string())),
            TokenKind::LtEq => Some((Precedence::LessGreater, "<=".to_string())),
            TokenKind::Gt => Some((Precedence::LessGreater, ">".to_string())),
            TokenKind::GtEq => Some((Precedence::LessGreater, ">=".to_string())),
            TokenKind::Plus => Some((Precedence::Sum, "+".to_string())),
            TokenKind::Minus => Some((Precedence::Sum, "-".to_string())),
            TokenKind::Star => Some((Precedence::Product, "*".to_string())),
            TokenKind::Slash => Some((Precedence::Product, "/".to_string())),
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> Box<Expr> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                Expr::boxed(ExprKind::Integer(*n), token.span)
            }
            TokenKind::String(s) => {
                self.advance();
                Expr::boxed(ExprKind::String(s.clone()), token.span)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Expr::boxed(ExprKind::Boolean(true), token.span)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Expr::boxed(ExprKind::Boolean(false), token.span)
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Expr::boxed(ExprKind::Null, token.span)
            }
            TokenKind::Keyword(Keyword::Asc) => {
                self.advance();
                Expr::boxed(ExprKind::Order { ascending: true }, token.span)
            }
            TokenKind::Keyword(Keyword::Desc) => {
                self.advance();
                Expr::boxed(ExprKind::Order { ascending: false }, token.span)
            }
            TokenKind::Bang => {
                self.advance();
                let right = self.parse_expression_prec(Precedence::Prefix);
                let span = token.span.merge(right.span);
                Expr::boxed(
                    ExprKind::Prefix {
                        operator: "!".to_string(),
                        right,
                    },
                    span,
                )
            }
            TokenKind::Minus => {
                self.advance();
                let right = self.parse_expression_prec(Precedence::Prefix);
                let span = token.span.merge(right.span);
                Expr::boxed(
                    ExprKind::Prefix {
                        operator: "-".to_string(),
                        right,
                    },
                    span,
                )
            }
            TokenKind::Illegal(b) => {
                self.advance();
                self.record(Error::lex(format!("illegal byte {b:#x}"), token.span));
                Expr::boxed(ExprKind::Null, token.span)
            }
            TokenKind::At => self.parse_reference(),
            TokenKind::Eq | TokenKind::NotEq | TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
                self.parse_column_prefix_expression()
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if matches!(self.peek().kind, TokenKind::LParen) {
                    self.parse_call(name.clone(), token.span)
                } else {
                    Expr::boxed(ExprKind::Identifier(name.clone()), token.span)
                }
            }
            other => {
                self.advance();
                self.record(Error::parse(
                    format!("expected expression, found {other}"),
                    token.span,
                ));
                Expr::boxed(ExprKind::Null, token.span)
            }
        }
    }

    /// The bare-operator column expression rule: a comparison operator
    /// found anywhere an expression is expected is treated as an infix
    /// expression whose left operand is an implicit `@` (`> 5` parses the
    /// same as `@ > 5`, including after `AND`/`OR`).
    fn parse_column_prefix_expression(&mut self) -> Box<Expr> {
        let (prec, operator) = self.infix_operator().expect("called only on comparison tokens");
        let op_token = self.advance();
        let reference = Expr::boxed(ExprKind::Reference { argument: None }, op_token.span);
        let right = self.parse_expression_prec(Self::next_precedence(prec));
        let span = reference.span.merge(right.span);
        Expr::boxed(
            ExprKind::Infix {
                left: reference,
                operator,
                right,
            },
            span,
        )
    }

    fn parse_reference(&mut self) -> Box<Expr> {
        let at = self.advance();
        if !matches!(self.peek().kind, TokenKind::LParen) {
            return Expr::boxed(ExprKind::Reference { argument: None }, at.span);
        }
        self.advance(); // consume '('
        let arg_token = self.peek().clone();
        let argument = match &arg_token.kind {
            TokenKind::String(s) => {
                self.advance();
                Some(Expr::boxed(ExprKind::String(s.clone()), arg_token.span))
            }
            _ => {
                self.record(Error::parse(
                    "reference argument must be a string literal",
                    arg_token.span,
                ));
                None
            }
        };
        let close = self.expect_rparen(at.span);
        let span = at.span.merge(close);
        Expr::boxed(ExprKind::Reference { argument }, span)
    }

    fn parse_call(&mut self, function: String, start: Span) -> Box<Expr> {
        self.advance(); // consume '('
        let arguments = self.parse_argument_list();
        let close = self.expect_rparen(start);
        let span = start.merge(close);
        Expr::boxed(ExprKind::Call { function, arguments }, span)
    }

    /// Parses a comma-separated argument list, used by both calls and
    /// column/group function statements.
    pub(super) fn parse_argument_list(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if matches!(self.peek().kind, TokenKind::RParen) {
            return args;
        }
        loop {
            let expr = self.parse_expression();
            args.push(*expr);
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        args
    }

    fn expect_rparen(&mut self, opened_at: Span) -> Span {
        if matches!(self.peek().kind, TokenKind::RParen) {
            let t = self.advance();
            t.span
        } else {
            let found = self.peek().clone();
            self.record(Error::parse(
                format!("expected ')' to close '(' at {opened_at}, found {}", found.kind),
                found.span,
            ));
            found.span
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Parser;
    use crate::ast::ExprKind;

    fn parse_expr(src: &str) -> crate::ast::Expr {
        let mut p = Parser::new(src);
        *p.parse_expression()
    }

    #[test]
    fn precedence_and_before_equals() {
        let e = parse_expr("1 == 2 AND 3 == 4");
        match e.kind {
            ExprKind::Infix { operator, .. } => assert_eq!(operator, "AND"),
            other => panic!("expected AND at top, got {other:?}"),
        }
    }

    #[test]
    fn product_binds_tighter_than_sum() {
        let e = parse_expr("1 + 2 * 3");
        match e.kind {
            ExprKind::Infix { operator, right, .. } => {
                assert_eq!(operator, "+");
                assert!(matches!(right.kind, ExprKind::Infix { .. }));
            }
            other => panic!("expected '+' at top, got {other:?}"),
        }
    }

    #[test]
    fn reference_with_string_argument() {
        let e = parse_expr("@('Name')");
        match e.kind {
            ExprKind::Reference { argument: Some(arg) } => {
                assert_eq!(arg.kind, ExprKind::String("Name".to_string()));
            }
            other => panic!("expected reference with argument, got {other:?}"),
        }
    }

    #[test]
    fn bare_reference_has_no_argument() {
        let e = parse_expr("@");
        assert_eq!(e.kind, ExprKind::Reference { argument: None });
    }

    #[test]
    fn bare_operator_synthesizes_reference_after_or() {
        // The right side of `OR` is itself a fresh prefix position, so a
        // bare comparison operator there also gets an implicit `@`.
        let e = parse_expr("> 5 OR < 10");
        match e.kind {
            ExprKind::Infix { operator, left, right } => {
                assert_eq!(operator, "OR");
                assert!(matches!(left.kind, ExprKind::Infix { .. }));
                assert!(matches!(right.kind, ExprKind::Infix { .. }));
            }
            other => panic!("expected OR at top, got {other:?}"),
        }
    }

    #[test]
    fn illegal_byte_produces_lex_error() {
        let (_, errors) = Parser::new("$").parse();
        assert!(matches!(errors.as_slice(), [crate::error::Error::Lex { .. }]));
    }

    #[test]
    fn round_trip_pretty_print() {
        let e = parse_expr("1 + 2 * 3");
        let printed = e.to_source_string();
        let reparsed = parse_expr(&printed);
        assert_eq!(reparsed.to_source_string(), printed);
    }
}
