//! The SQL intermediate representation the evaluator builds and the
//! serializer in [`serializer`] turns into a single SQL string.

pub mod serializer;

use crate::types::ValueType;

/// Which of the three serialization shapes a [`Query`] takes (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefLevel {
    Literal,
    Field,
    Expression,
    Group,
}

impl RefLevel {
    /// The higher of two levels; used when merging local reference maps.
    pub fn max(self, other: RefLevel) -> RefLevel {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }

    fn rank(self) -> u8 {
        match self {
            RefLevel::Literal => 0,
            RefLevel::Field => 1,
            RefLevel::Expression => 2,
            RefLevel::Group => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectField {
    pub name: String,
    pub table: String,
    pub type_tag: ValueType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpression {
    pub name: String,
    pub text: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectGroupField {
    pub name: String,
    pub table: String,
    pub type_tag: ValueType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectGroupExpression {
    pub name: String,
    pub function: String,
    pub text: String,
}

/// One element of a Query's projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectStatement {
    Field(SelectField),
    Expression(SelectExpression),
    GroupField(SelectGroupField),
    GroupExpression(SelectGroupExpression),
}

impl SelectStatement {
    pub fn name(&self) -> &str {
        match self {
            SelectStatement::Field(f) => &f.name,
            SelectStatement::Expression(e) => &e.name,
            SelectStatement::GroupField(f) => &f.name,
            SelectStatement::GroupExpression(e) => &e.name,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, SelectStatement::Expression(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, SelectStatement::GroupField(_) | SelectStatement::GroupExpression(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// Case-insensitive; unknown prefixes fall back to INNER.
    pub fn parse(s: &str) -> JoinKind {
        match s.to_ascii_uppercase().as_str() {
            "LEFT" => JoinKind::Left,
            "RIGHT" => JoinKind::Right,
            "FULL" => JoinKind::Full,
            _ => JoinKind::Inner,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub name: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinStatement {
    pub kind: JoinKind,
    pub parent_table_alias: String,
    pub child: Box<Query>,
    pub parent_on: String,
    pub child_on: String,
    pub alias: String,
}

/// A structured query plan, mutated in place by the evaluator and turned
/// into SQL text only at the end of compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub ref_level: RefLevel,
    pub limit: Option<i64>,
    pub from: String,
    /// The name selects/joins are qualified with (the endpoint name, not
    /// necessarily the table name).
    pub table_alias: String,
    pub selects: Vec<SelectStatement>,
    pub where_statements: Vec<String>,
    pub alias_where_statements: Vec<String>,
    pub having_statements: Vec<String>,
    pub group_by_statements: Vec<String>,
    pub order_by: Vec<OrderByItem>,
    pub joins: Vec<JoinStatement>,
    pub bracketed: bool,
    /// Set when endpoint creation hit a denied `onDeny: "omit"` security
    /// policy; the serializer short-circuits such a query to an empty
    /// string rather than walking its (possibly incomplete) selects.
    pub omitted: bool,
}

impl Query {
    pub fn new(from: impl Into<String>, table_alias: impl Into<String>, bracketed: bool) -> Self {
        Self {
            ref_level: RefLevel::Literal,
            limit: None,
            from: from.into(),
            table_alias: table_alias.into(),
            selects: Vec::new(),
            where_statements: Vec::new(),
            alias_where_statements: Vec::new(),
            having_statements: Vec::new(),
            group_by_statements: Vec::new(),
            order_by: Vec::new(),
            joins: Vec::new(),
            bracketed,
            omitted: false,
        }
    }

    pub fn quote(&self, name: &str) -> String {
        if self.bracketed {
            format!("[{name}]")
        } else {
            name.to_string()
        }
    }

    pub fn select_index(&self, name: &str) -> Option<usize> {
        self.selects.iter().position(|s| s.name() == name)
    }

    /// Appends a select, or if one already exists with the same name, moves
    /// it to the end (re-issuing a column reorders it).
    pub fn upsert_select(&mut self, select: SelectStatement) -> usize {
        if let Some(idx) = self.select_index(select.name()) {
            self.selects.remove(idx);
        }
        self.selects.push(select);
        self.selects.len() - 1
    }

    pub fn field_names(&self) -> Vec<String> {
        self.selects.iter().map(|s| s.name().to_string()).collect()
    }
}
