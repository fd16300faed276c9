//! The fluent join planner: `evaluator.inner_join("YZ").on("x", "x").query(&mut parent, endpoint, "z:")`.
//!
//! The name passed to the join constructor resolves directly against the
//! catalog (any endpoint can be joined, independent of an endpoint's own
//! declared `joins` map) and doubles as the SQL alias the joined subquery
//! is wrapped in — mirroring the original join builder, which resolves the
//! target purely by `Service.GetEndpoint(name)` and aliases the subquery
//! with that same name.

use std::sync::Arc;

use crate::catalog::{Endpoint, SecurityChecker, Service};
use crate::error::{Error, Result};
use crate::ir::{JoinKind, JoinStatement, Query, SelectField, SelectStatement};
use crate::types::ValueType;

use super::compile_endpoint;

pub struct JoinBuilder<'svc> {
    service: &'svc Service,
    checker: Option<Arc<dyn SecurityChecker>>,
    kind: JoinKind,
    endpoint_name: String,
}

impl<'svc> JoinBuilder<'svc> {
    pub(super) fn new(
        service: &'svc Service,
        checker: Option<Arc<dyn SecurityChecker>>,
        kind: JoinKind,
        endpoint_name: impl Into<String>,
    ) -> Self {
        Self {
            service,
            checker,
            kind,
            endpoint_name: endpoint_name.into(),
        }
    }

    pub fn on(self, parent_on: impl Into<String>, child_on: impl Into<String>) -> JoinOn<'svc> {
        JoinOn {
            builder: self,
            parent_on: parent_on.into(),
            child_on: child_on.into(),
        }
    }
}

pub struct JoinOn<'svc> {
    builder: JoinBuilder<'svc>,
    parent_on: String,
    child_on: String,
}

impl<'svc> JoinOn<'svc> {
    /// Evaluates `src` against the named endpoint and attaches the
    /// resulting child query to `parent`.
    pub fn query(self, parent: &mut Query, parent_endpoint: &Endpoint, src: &str) -> Result<()> {
        let JoinOn {
            builder: JoinBuilder { service, checker, kind, endpoint_name },
            parent_on,
            child_on,
        } = self;

        if parent_endpoint.field(&parent_on).is_none() {
            return Err(Error::join(format!(
                "No field '{parent_on}' found to join on endpoint '{}'",
                parent_endpoint.name
            )));
        }

        let child_endpoint = service
            .get(&endpoint_name)
            .ok_or_else(|| Error::join(format!("unresolvable join target '{endpoint_name}'")))?;

        let (mut child_query, _) = compile_endpoint(service, child_endpoint, src, checker)?;

        if child_query.select_index(&child_on).is_none() {
            let type_tag = child_endpoint.field(&child_on).map(|f| f.field_type.into()).unwrap_or(ValueType::String);
            child_query.selects.push(SelectStatement::Field(SelectField {
                name: child_on.clone(),
                table: child_endpoint.name.clone(),
                type_tag,
            }));
        }

        for select in &child_query.selects {
            if select.name() == child_on {
                continue;
            }
            let type_tag = match select {
                SelectStatement::Field(f) | SelectStatement::GroupField(f) => f.type_tag,
                _ => ValueType::String,
            };
            parent.selects.push(SelectStatement::Field(SelectField {
                name: select.name().to_string(),
                table: endpoint_name.clone(),
                type_tag,
            }));
        }

        parent.joins.push(JoinStatement {
            kind,
            parent_table_alias: parent.table_alias.clone(),
            child: Box::new(child_query),
            parent_on,
            child_on,
            alias: endpoint_name,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::eval::Evaluator;

    fn service() -> Service {
        let json = r#"[
            {"name":"X","tableName":"X","schemaName":"dbo","fields":["x"]},
            {"name":"YZN","tableName":"YZ","schemaName":"dbo","fields":["x","z"]}
        ]"#;
        catalog::load(json).unwrap()
    }

    #[test]
    fn join_key_is_auto_added_and_not_duplicated_in_parent_projection() {
        let service = service();
        let eval = Evaluator::new(&service);
        let (mut parent, _) = eval.compile("X", "x:", None).unwrap();
        let x_endpoint = service.get("X").unwrap();
        eval.inner_join(None, "YZN")
            .on("x", "x")
            .query(&mut parent, x_endpoint, "z:")
            .unwrap();
        assert_eq!(
            parent.to_sql(),
            "SELECT X.[x], YZN.[z] FROM dbo.X INNER JOIN ( SELECT YZ.[z], YZ.[x] FROM dbo.YZ ) AS YZN ON X.[x] = YZN.[x]"
        );
    }
}
