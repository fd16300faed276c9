//! Walks a parsed [`RequestStatements`](crate::ast::RequestStatements) AST
//! against a catalog endpoint, building a [`Query`](crate::ir::Query) IR in
//! place.
//!
//! The public entry point is [`Evaluator`]. A fresh [`Context`] is created
//! per endpoint compile (including once per joined child), carrying the
//! catalog endpoint, the security checker, the IR being built, and the
//! "current select" target that a bare `@` resolves against.

mod builtins;
mod expr;
mod join;
mod statements;

pub use join::JoinBuilder;

use std::sync::Arc;

use crate::ast::Statement;
use crate::catalog::{Endpoint, Field, OnDeny, SecurityChecker, Service};
use crate::error::{Error, Result};
use crate::ir::{OrderByItem, Query, RefLevel, SelectStatement};
use crate::parser::Parser;

/// The outcome of checking a field's effective security policy.
pub(super) enum SecurityOutcome {
    Allow,
    Omit,
}

/// Checks the effective policy for `field` (its own, falling back to the
/// endpoint's) against the context's checker. A `"*"` permission or the
/// absence of a checker/policy always allows.
pub(super) fn eval_field_security(ctx: &Context, field: &Field) -> Result<SecurityOutcome> {
    let policy = match field.security.as_ref().or(ctx.endpoint.security.as_ref()) {
        Some(policy) => policy,
        None => return Ok(SecurityOutcome::Allow),
    };
    if policy.is_wildcard() {
        return Ok(SecurityOutcome::Allow);
    }
    let checker = match &ctx.checker {
        Some(checker) => checker,
        None => return Ok(SecurityOutcome::Allow),
    };
    if checker.allow(&policy.permissions)? {
        return Ok(SecurityOutcome::Allow);
    }
    match policy.on_deny {
        OnDeny::Error => Err(Error::permission(format!(
            "permission denied for field '{}' on endpoint '{}'",
            field.name, ctx.endpoint.name
        ))),
        OnDeny::Omit => {
            tracing::warn!(endpoint = %ctx.endpoint.name, field = %field.name, "omitting field denied by security policy");
            Ok(SecurityOutcome::Omit)
        }
    }
}

/// Where a bare `@` resolves to: either an already-projected select, or a
/// pending one built by `EXCLUDE` that is never appended to the select list.
enum CurrentTarget {
    None,
    Select(usize),
    Pending(SelectStatement),
}

/// Per-Query compilation state threaded through statement and expression
/// evaluation.
struct Context<'a> {
    endpoint: &'a Endpoint,
    checker: Option<Arc<dyn SecurityChecker>>,
    query: Query,
    current: CurrentTarget,
    /// `None` until the first statement establishes grouped/ungrouped mode.
    grouping: Option<bool>,
}

impl<'a> Context<'a> {
    fn current_select(&self) -> Option<&SelectStatement> {
        match &self.current {
            CurrentTarget::None => None,
            CurrentTarget::Select(idx) => self.query.selects.get(*idx),
            CurrentTarget::Pending(select) => Some(select),
        }
    }

    /// Establishes grouped/ungrouped mode on first use; rejects statements
    /// of the other kind afterward.
    fn enter_mode(&mut self, label: &str, grouped: bool) -> Result<()> {
        match self.grouping {
            None => {
                self.grouping = Some(grouped);
                Ok(())
            }
            Some(g) if g == grouped => Ok(()),
            Some(g) => {
                let table_kind = if g { "Grouped" } else { "Non-Grouped" };
                Err(Error::resolution(format!(
                    "Column/Group '{label}' cannot be called on {table_kind} Table '{}'",
                    self.endpoint.name
                )))
            }
        }
    }
}

/// Compiles Dyre query text against a read-only [`Service`] catalog.
pub struct Evaluator<'svc> {
    service: &'svc Service,
}

impl<'svc> Evaluator<'svc> {
    pub fn new(service: &'svc Service) -> Self {
        Self { service }
    }

    /// Compiles `src` against the named endpoint, returning the finished IR
    /// and the post-security-omission list of projected field names.
    pub fn compile(
        &self,
        endpoint_name: &str,
        src: &str,
        checker: Option<Arc<dyn SecurityChecker>>,
    ) -> Result<(Query, Vec<String>)> {
        let endpoint = self
            .service
            .get(endpoint_name)
            .ok_or_else(|| Error::resolution(format!("unknown endpoint '{endpoint_name}'")))?;
        compile_endpoint(self.service, endpoint, src, checker)
    }

    /// Starts a fluent join against a catalog endpoint, which also becomes
    /// the SQL alias the joined subquery is wrapped in
    /// (`ir.inner_join(None, "YZ").on("x", "x").query(&mut q, ep, "z:")`).
    pub fn inner_join(&self, checker: Option<Arc<dyn SecurityChecker>>, endpoint_name: impl Into<String>) -> JoinBuilder<'svc> {
        JoinBuilder::new(self.service, checker, crate::ir::JoinKind::Inner, endpoint_name)
    }

    pub fn left_join(&self, checker: Option<Arc<dyn SecurityChecker>>, endpoint_name: impl Into<String>) -> JoinBuilder<'svc> {
        JoinBuilder::new(self.service, checker, crate::ir::JoinKind::Left, endpoint_name)
    }

    pub fn right_join(&self, checker: Option<Arc<dyn SecurityChecker>>, endpoint_name: impl Into<String>) -> JoinBuilder<'svc> {
        JoinBuilder::new(self.service, checker, crate::ir::JoinKind::Right, endpoint_name)
    }

    pub fn full_join(&self, checker: Option<Arc<dyn SecurityChecker>>, endpoint_name: impl Into<String>) -> JoinBuilder<'svc> {
        JoinBuilder::new(self.service, checker, crate::ir::JoinKind::Full, endpoint_name)
    }

    /// Parses and evaluates an order-by clause against an already-finalized
    /// query, appending `OrderByItem`s in source order.
    pub fn order_by(&self, query: &mut Query, endpoint: &Endpoint, src: &str) -> Result<()> {
        let (statements, errors) = Parser::new(src).parse();
        if !errors.is_empty() {
            return Err(crate::error::join_errors("order-by parse", errors));
        }

        for statement in statements.statements {
            match statement {
                Statement::ColumnLiteral { name, .. } => {
                    let qualified = if query.select_index(&name).is_some() {
                        format!("{}.{}", query.table_alias, query.quote(&name))
                    } else if endpoint.field(&name).is_some() {
                        format!("{}.{}", query.table_alias, query.quote(&name))
                    } else {
                        return Err(Error::resolution(format!(
                            "Requested column {name} not found for {}",
                            endpoint.name
                        )));
                    };
                    query.order_by.push(OrderByItem {
                        name: qualified,
                        ascending: true,
                    });
                }
                Statement::Expression {
                    expr: Some(crate::ast::Expr {
                        kind: crate::ast::ExprKind::Order { ascending },
                        ..
                    }),
                    ..
                } => {
                    let last = query
                        .order_by
                        .last_mut()
                        .ok_or_else(|| Error::parse("ASC/DESC with no preceding order-by column", statement_span()))?;
                    last.ascending = ascending;
                }
                other => {
                    return Err(Error::resolution(format!(
                        "unexpected statement in order-by clause: {other:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn statement_span() -> crate::error::Span {
    crate::error::Span::default()
}

/// Evaluates `src` against `endpoint`, applying endpoint-level security
/// before parsing and walking every statement to completion.
pub(crate) fn compile_endpoint(
    service: &Service,
    endpoint: &Endpoint,
    src: &str,
    checker: Option<Arc<dyn SecurityChecker>>,
) -> Result<(Query, Vec<String>)> {
    tracing::debug!(endpoint = %endpoint.name, "compiling endpoint");
    let mut query = Query::new(
        endpoint.qualified_table(),
        endpoint.name.clone(),
        endpoint.settings.bracketed_columns,
    );

    if let Some(policy) = &endpoint.security {
        if !policy.is_wildcard() {
            if let Some(checker) = &checker {
                if !checker.allow(&policy.permissions)? {
                    match policy.on_deny {
                        crate::catalog::OnDeny::Error => {
                            return Err(Error::permission(format!(
                                "permission denied for endpoint '{}'",
                                endpoint.name
                            )));
                        }
                        crate::catalog::OnDeny::Omit => {
                            tracing::warn!(endpoint = %endpoint.name, "omitting endpoint denied by security policy");
                            query.omitted = true;
                            return Ok((query, Vec::new()));
                        }
                    }
                }
            }
        }
    }

    let (statements, errors) = Parser::new(src).parse();
    if !errors.is_empty() {
        return Err(crate::error::join_errors("parse", errors));
    }

    let mut ctx = Context {
        endpoint,
        checker,
        query,
        current: CurrentTarget::None,
        grouping: None,
    };

    for statement in statements.statements {
        statements::execute(service, &mut ctx, statement)?;
    }

    ctx.query.ref_level = if !ctx.query.group_by_statements.is_empty() {
        RefLevel::Group
    } else if ctx.query.selects.iter().any(SelectStatement::is_expression) {
        RefLevel::Expression
    } else if !ctx.query.selects.is_empty() {
        RefLevel::Field
    } else {
        RefLevel::Literal
    };

    let field_names = ctx.query.field_names();
    tracing::info!(endpoint = %endpoint.name, ref_level = ?ctx.query.ref_level, "endpoint compiled");
    Ok((ctx.query, field_names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn service() -> Service {
        let json = r#"[{"name":"Types","tableName":"Types","schemaName":"dbo","fields":[
            {"name":"Int","type":"int"},
            {"name":"Str","type":"string"},
            {"name":"StrN","type":"string","nullable":true},
            {"name":"Bool","type":"bool"},
            {"name":"DateTimeN","type":"datetime","nullable":true}
        ]}]"#;
        catalog::load(json).unwrap()
    }

    fn compile(src: &str) -> String {
        let service = service();
        let eval = Evaluator::new(&service);
        let (query, _) = eval.compile("Types", src, None).unwrap();
        query.to_sql()
    }

    #[test]
    fn scenario_1_plain_column() {
        assert_eq!(compile("Int:"), "SELECT Types.[Int] FROM dbo.Types");
    }

    #[test]
    fn scenario_2_column_with_equality_filter() {
        assert_eq!(
            compile("Str: @ == 'Hello'"),
            "SELECT Types.[Str] FROM dbo.Types WHERE (Types.[Str] = 'Hello')"
        );
    }

    #[test]
    fn scenario_3_bare_operator_or() {
        assert_eq!(
            compile("Int: > 5 OR < 10"),
            "SELECT Types.[Int] FROM dbo.Types WHERE ((Types.[Int] > 5) OR (Types.[Int] < 10))"
        );
    }

    #[test]
    fn scenario_4_null_comparison() {
        assert_eq!(
            compile("StrN: != NULL"),
            "SELECT Types.[StrN] FROM dbo.Types WHERE (Types.[StrN] IS NOT NULL)"
        );
    }

    #[test]
    fn scenario_5_group_and_aggregate() {
        assert_eq!(
            compile("GROUP('Str'):SUM('sumInt', @('Int')):"),
            "SELECT Types.[Str], SUM(Types.[Int]) AS [sumInt] FROM dbo.Types GROUP BY Types.[Str]"
        );
    }

    #[test]
    fn scenario_6_aliased_expression_wraps_subquery() {
        assert_eq!(
            compile("Str:AS('NewName', @('Int')):>5"),
            "SELECT Types.[Str], Types.[NewName] FROM ( SELECT Types.[Str], (Types.[Int]) AS [NewName] FROM dbo.Types ) AS Types WHERE (Types.[NewName] > 5)"
        );
    }

    #[test]
    fn grouping_exclusivity_is_rejected() {
        let service = service();
        let eval = Evaluator::new(&service);
        let err = eval.compile("Types", "Int: GROUP('Str'):", None).unwrap_err();
        assert!(err.to_string().contains("cannot be called on"));
    }

    #[test]
    fn reissuing_a_column_moves_it_to_the_end() {
        let service = service();
        let eval = Evaluator::new(&service);
        let (query, _) = eval.compile("Types", "Int: Str: Int:", None).unwrap();
        assert_eq!(query.field_names(), vec!["Str".to_string(), "Int".to_string()]);
    }

    #[test]
    fn unknown_column_is_resolution_error() {
        let service = service();
        let eval = Evaluator::new(&service);
        assert!(eval.compile("Types", "Nope:", None).is_err());
    }

    #[test]
    fn order_by_appends_ascending_then_mutates_direction() {
        let service = service();
        let eval = Evaluator::new(&service);
        let (mut query, _) = eval.compile("Types", "Int:", None).unwrap();
        eval.order_by(&mut query, service.get("Types").unwrap(), "Int: DESC").unwrap();
        assert_eq!(query.order_by.len(), 1);
        assert!(!query.order_by[0].ascending);
    }
}
