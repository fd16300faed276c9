//! Turns a finished [`Query`] into a single SQL string.
//!
//! A query serializes in one of three shapes depending on its
//! [`RefLevel`](super::RefLevel):
//!
//! - `Literal`/`Field` — a flat `SELECT ... FROM ... WHERE ...`.
//! - `Expression` — the flat form above becomes a subquery aliased as the
//!   endpoint name, wrapped by an outer `SELECT` that re-projects every
//!   column and applies any WHERE clauses that reference a computed column.
//! - `Group` — a flat form with `GROUP BY` / `HAVING` appended; computed
//!   columns are never wrapped here since aggregates already require their
//!   own subquery-free scope.

use super::{Query, RefLevel, SelectStatement};

impl Query {
    pub fn to_sql(&self) -> String {
        if self.omitted {
            return String::new();
        }
        match self.ref_level {
            RefLevel::Literal | RefLevel::Field => self.render_flat(&self.where_statements, None),
            RefLevel::Group => self.render_group(),
            RefLevel::Expression => self.render_wrapped(),
        }
    }

    fn render_select_list(&self) -> String {
        self.selects
            .iter()
            .map(|s| self.render_select(s))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_select(&self, select: &SelectStatement) -> String {
        match select {
            SelectStatement::Field(f) => format!("{}.{}", f.table, self.quote(&f.name)),
            SelectStatement::Expression(e) => format!("({}) AS {}", e.text, self.quote(&e.name)),
            SelectStatement::GroupField(f) => format!("{}.{}", f.table, self.quote(&f.name)),
            SelectStatement::GroupExpression(e) => {
                if e.function.is_empty() {
                    format!("{} AS {}", e.text, self.quote(&e.name))
                } else {
                    format!("{}({}) AS {}", e.function, e.text, self.quote(&e.name))
                }
            }
        }
    }

    fn render_joins(&self) -> String {
        self.joins
            .iter()
            .map(|j| {
                format!(
                    " {} JOIN ( {} ) AS {} ON {}.{} = {}.{}",
                    j.kind.keyword(),
                    j.child.to_sql(),
                    j.alias,
                    j.parent_table_alias,
                    self.quote(&j.parent_on),
                    j.alias,
                    self.quote(&j.child_on),
                )
            })
            .collect()
    }

    fn render_flat(&self, where_statements: &[String], having: Option<&[String]>) -> String {
        let mut sql = String::from("SELECT ");
        if let Some(limit) = self.limit {
            sql.push_str(&format!("TOP {limit} "));
        }
        sql.push_str(&self.render_select_list());
        sql.push_str(&format!(" FROM {}", self.from));
        sql.push_str(&self.render_joins());
        if !where_statements.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_statements.join(" AND "));
        }
        if !self.group_by_statements.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by_statements.join(", "));
        }
        if let Some(having) = having {
            if !having.is_empty() {
                sql.push_str(" HAVING ");
                sql.push_str(&having.join(" AND "));
            }
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(
                &self
                    .order_by
                    .iter()
                    .map(|o| format!("{} {}", o.name, if o.ascending { "ASC" } else { "DESC" }))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        sql
    }

    fn render_group(&self) -> String {
        self.render_flat(&self.where_statements, Some(&self.having_statements))
    }

    /// Wraps the inner flat query (without its own ORDER BY, which moves to
    /// the outer query once alias WHERE clauses are applied) as a subquery
    /// aliased with the endpoint name, then re-projects every select and
    /// applies WHERE clauses that reference a computed alias.
    fn render_wrapped(&self) -> String {
        let mut inner = self.clone();
        inner.order_by.clear();
        let inner_sql = inner.render_flat(&self.where_statements, None);

        let outer_select = self
            .selects
            .iter()
            .map(|s| format!("{}.{}", self.table_alias, self.quote(s.name())))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT {outer_select} FROM ( {inner_sql} ) AS {}",
            self.table_alias
        );
        if !self.alias_where_statements.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.alias_where_statements.join(" AND "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(
                &self
                    .order_by
                    .iter()
                    .map(|o| format!("{} {}", o.name, if o.ascending { "ASC" } else { "DESC" }))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::super::{JoinKind, JoinStatement, OrderByItem, SelectField, SelectGroupExpression, SelectGroupField};
    use super::*;
    use crate::types::ValueType;

    fn field(name: &str, table: &str) -> SelectStatement {
        SelectStatement::Field(SelectField {
            name: name.to_string(),
            table: table.to_string(),
            type_tag: ValueType::Integer,
        })
    }

    #[test]
    fn flat_query_renders_select_from_where() {
        let mut q = Query::new("dbo.Types", "Types", true);
        q.ref_level = RefLevel::Field;
        q.selects.push(field("Str", "Types"));
        q.where_statements.push("(Types.[Int] > 5)".to_string());
        assert_eq!(
            q.to_sql(),
            "SELECT Types.[Str] FROM dbo.Types WHERE (Types.[Int] > 5)"
        );
    }

    #[test]
    fn expression_query_wraps_as_subquery() {
        let mut q = Query::new("dbo.Types", "Types", true);
        q.ref_level = RefLevel::Expression;
        q.selects.push(field("Str", "Types"));
        q.selects.push(SelectStatement::Expression(super::super::SelectExpression {
            name: "NewName".to_string(),
            text: "Types.[Int]".to_string(),
            nullable: false,
        }));
        q.alias_where_statements.push("(Types.[NewName] > 5)".to_string());
        assert_eq!(
            q.to_sql(),
            "SELECT Types.[Str], Types.[NewName] FROM ( SELECT Types.[Str], (Types.[Int]) AS [NewName] FROM dbo.Types ) AS Types WHERE (Types.[NewName] > 5)"
        );
    }

    #[test]
    fn group_query_appends_group_by_and_having() {
        let mut q = Query::new("dbo.Types", "Types", true);
        q.ref_level = RefLevel::Group;
        q.selects.push(SelectStatement::GroupField(SelectGroupField {
            name: "Str".to_string(),
            table: "Types".to_string(),
            type_tag: ValueType::String,
        }));
        q.selects.push(SelectStatement::GroupExpression(SelectGroupExpression {
            name: "sumInt".to_string(),
            function: "SUM".to_string(),
            text: "Types.[Int]".to_string(),
        }));
        q.group_by_statements.push("Types.[Str]".to_string());
        q.having_statements.push("(SUM(Types.[Int]) > 100)".to_string());
        assert_eq!(
            q.to_sql(),
            "SELECT Types.[Str], SUM(Types.[Int]) AS [sumInt] FROM dbo.Types GROUP BY Types.[Str] HAVING (SUM(Types.[Int]) > 100)"
        );
    }

    #[test]
    fn join_renders_as_nested_subquery_with_on_clause() {
        let mut parent = Query::new("dbo.Parent", "Parent", true);
        parent.ref_level = RefLevel::Field;
        parent.selects.push(field("Id", "Parent"));
        let mut child = Query::new("dbo.Child", "Child", true);
        child.ref_level = RefLevel::Field;
        child.selects.push(field("ParentId", "Child"));
        parent.joins.push(JoinStatement {
            kind: JoinKind::Inner,
            parent_table_alias: "Parent".to_string(),
            child: Box::new(child),
            parent_on: "Id".to_string(),
            child_on: "ParentId".to_string(),
            alias: "Child".to_string(),
        });
        assert_eq!(
            parent.to_sql(),
            "SELECT Parent.[Id] FROM dbo.Parent INNER JOIN ( SELECT Child.[ParentId] FROM dbo.Child ) AS Child ON Parent.[Id] = Child.[ParentId]"
        );
    }

    #[test]
    fn order_by_moves_to_outer_query_when_wrapped() {
        let mut q = Query::new("dbo.Types", "Types", true);
        q.ref_level = RefLevel::Expression;
        q.selects.push(field("Str", "Types"));
        q.order_by.push(OrderByItem {
            name: "Types.[Str]".to_string(),
            ascending: true,
        });
        assert_eq!(
            q.to_sql(),
            "SELECT Types.[Str] FROM ( SELECT Types.[Str] FROM dbo.Types ) AS Types ORDER BY Types.[Str] ASC"
        );
    }
}
