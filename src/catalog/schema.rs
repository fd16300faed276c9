//! Endpoint catalog schema: the read-only graph of endpoints, fields, and
//! joins that a compile session is bound against.
//!
//! Back-references (field → endpoint, join → parent/child endpoint) are
//! modeled as index lookups into [`Service`] rather than owning pointers,
//! so the graph has no reference cycles and no two-phase "patch the
//! back-pointer after load" step.

use std::collections::BTreeMap;

/// The declared SQL type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    String,
    Date,
    DateTime,
    Null,
}

impl FieldType {
    pub fn from_str(s: &str) -> Option<FieldType> {
        match s.to_ascii_uppercase().as_str() {
            "STRING" => Some(FieldType::String),
            "BOOL" | "BOOLEAN" => Some(FieldType::Boolean),
            "INT" | "INTEGER" => Some(FieldType::Integer),
            "FLOAT" => Some(FieldType::Float),
            "DATE" => Some(FieldType::Date),
            "DATETIME" => Some(FieldType::DateTime),
            _ => None,
        }
    }
}

/// How a denied permission check should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDeny {
    Error,
    Omit,
}

/// A permission policy attached to an endpoint or a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    pub permissions: Vec<String>,
    pub on_deny: OnDeny,
}

impl SecurityPolicy {
    pub fn new(permissions: Vec<String>, on_deny: OnDeny) -> Self {
        Self { permissions, on_deny }
    }

    /// True if `"*"` appears among the declared permissions.
    pub fn is_wildcard(&self) -> bool {
        self.permissions.iter().any(|p| p == "*")
    }
}

/// A single declared column on an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub endpoint_id: EndpointId,
    pub security: Option<SecurityPolicy>,
}

/// A declared join from a parent endpoint to a named child endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub parent_id: EndpointId,
    pub child_endpoint_name: String,
    pub child_id: Option<EndpointId>,
    pub parent_on: String,
    pub child_on: String,
}

/// Per-endpoint settings bag.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSettings {
    pub bracketed_columns: bool,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            bracketed_columns: true,
        }
    }
}

/// Opaque index into [`Service`]'s endpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointId(pub usize);

/// A logical table in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub id: EndpointId,
    pub name: String,
    pub table_name: String,
    pub schema_name: Option<String>,
    pub field_names: Vec<String>,
    pub fields: BTreeMap<String, Field>,
    pub joins: BTreeMap<String, Join>,
    pub security: Option<SecurityPolicy>,
    pub settings: EndpointSettings,
}

impl Endpoint {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// The qualified `schema.table` the SQL serializer projects FROM.
    pub fn qualified_table(&self) -> String {
        match &self.schema_name {
            Some(schema) => format!("{schema}.{}", self.table_name),
            None => self.table_name.clone(),
        }
    }

    /// Quotes a column name per this endpoint's bracketing setting.
    pub fn quote(&self, column: &str) -> String {
        if self.settings.bracketed_columns {
            format!("[{column}]")
        } else {
            column.to_string()
        }
    }
}

/// The full catalog: an ordered map from endpoint name to [`Endpoint`].
#[derive(Debug, Clone, Default)]
pub struct Service {
    pub order: Vec<String>,
    pub endpoints: BTreeMap<String, Endpoint>,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn by_id(&self, id: EndpointId) -> Option<&Endpoint> {
        self.order
            .get(id.0)
            .and_then(|name| self.endpoints.get(name))
    }

    pub fn insert(&mut self, endpoint: Endpoint) {
        self.order.push(endpoint.name.clone());
        self.endpoints.insert(endpoint.name.clone(), endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_lookup_is_case_insensitive() {
        assert_eq!(FieldType::from_str("integer"), Some(FieldType::Integer));
        assert_eq!(FieldType::from_str("BOOL"), Some(FieldType::Boolean));
        assert_eq!(FieldType::from_str("nonsense"), None);
    }

    #[test]
    fn wildcard_permission_detection() {
        let p = SecurityPolicy::new(vec!["*".to_string()], OnDeny::Error);
        assert!(p.is_wildcard());
        let p = SecurityPolicy::new(vec!["read".to_string()], OnDeny::Error);
        assert!(!p.is_wildcard());
    }

    #[test]
    fn qualified_table_includes_schema_when_present() {
        let mut endpoint = sample_endpoint();
        endpoint.schema_name = Some("dbo".to_string());
        assert_eq!(endpoint.qualified_table(), "dbo.Types");
    }

    fn sample_endpoint() -> Endpoint {
        Endpoint {
            id: EndpointId(0),
            name: "Types".to_string(),
            table_name: "Types".to_string(),
            schema_name: None,
            field_names: vec![],
            fields: BTreeMap::new(),
            joins: BTreeMap::new(),
            security: None,
            settings: EndpointSettings::default(),
        }
    }
}
