//! The public compile surface: a single call to turn query text into SQL,
//! plus thin wrappers around the evaluator's join and order-by helpers for
//! callers that don't want to reach into [`eval`](crate::eval) directly.

use std::sync::Arc;

use crate::catalog::{SecurityChecker, Service};
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::ir::Query;

/// A finished compilation: the SQL text and the projected field names
/// (post security-omission, so callers know what actually made it in).
pub struct Compiled {
    pub sql: String,
    pub field_names: Vec<String>,
    query: Query,
}

impl Compiled {
    /// The underlying IR, for callers that want to inspect the select list
    /// or attach joins before re-serializing via [`order_by`] or [`limit`].
    pub fn query(&self) -> &Query {
        &self.query
    }
}

/// Compiles `query_src` against `endpoint_name` in `service`. `checker`
/// gates field- and endpoint-level security; pass `None` to defer to
/// whatever the catalog allows by default.
pub fn compile(
    service: &Service,
    endpoint_name: &str,
    query_src: &str,
    checker: Option<Arc<dyn SecurityChecker>>,
) -> Result<Compiled> {
    let evaluator = Evaluator::new(service);
    let (query, field_names) = evaluator.compile(endpoint_name, query_src, checker)?;
    Ok(Compiled {
        sql: query.to_sql(),
        field_names,
        query,
    })
}

/// Parses and applies an order-by clause to an already-compiled query,
/// returning the re-serialized SQL.
pub fn order_by(service: &Service, endpoint_name: &str, compiled: &mut Compiled, src: &str) -> Result<String> {
    let endpoint = service
        .get(endpoint_name)
        .ok_or_else(|| Error::resolution(format!("unknown endpoint '{endpoint_name}'")))?;
    let evaluator = Evaluator::new(service);
    evaluator.order_by(&mut compiled.query, endpoint, src)?;
    compiled.sql = compiled.query.to_sql();
    Ok(compiled.sql.clone())
}

/// Sets (or clears) the row cap on an already-compiled query and
/// re-serializes. `n <= 0` means "no limit", matching the convention a
/// caller-supplied row count uses elsewhere in this ecosystem.
pub fn limit(compiled: &mut Compiled, n: i64) -> String {
    compiled.query.limit = if n > 0 { Some(n) } else { None };
    compiled.sql = compiled.query.to_sql();
    compiled.sql.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn service() -> Service {
        catalog::load(r#"[{"name":"Types","tableName":"Types","fields":["Int"]}]"#).unwrap()
    }

    #[test]
    fn compile_returns_sql_and_field_names() {
        let service = service();
        let compiled = compile(&service, "Types", "Int:", None).unwrap();
        assert_eq!(compiled.sql, "SELECT Types.[Int] FROM Types");
        assert_eq!(compiled.field_names, vec!["Int".to_string()]);
    }

    #[test]
    fn order_by_reserializes_with_order_clause() {
        let service = service();
        let mut compiled = compile(&service, "Types", "Int:", None).unwrap();
        let sql = order_by(&service, "Types", &mut compiled, "Int: DESC").unwrap();
        assert!(sql.ends_with("ORDER BY Types.[Int] DESC"));
    }

    #[test]
    fn compile_against_unknown_endpoint_is_resolution_error() {
        let service = service();
        assert!(compile(&service, "Nope", "Int:", None).is_err());
    }

    #[test]
    fn limit_adds_top_clause() {
        let service = service();
        let mut compiled = compile(&service, "Types", "Int:", None).unwrap();
        let sql = limit(&mut compiled, 100);
        assert_eq!(sql, "SELECT TOP 100 Types.[Int] FROM Types");
    }

    #[test]
    fn non_positive_limit_means_no_cap() {
        let service = service();
        let mut compiled = compile(&service, "Types", "Int:", None).unwrap();
        limit(&mut compiled, 100);
        let sql = limit(&mut compiled, -1);
        assert_eq!(sql, "SELECT Types.[Int] FROM Types");
    }
}
