//! Catalog JSON loader.
//!
//! Parses the catalog JSON shape described in the external interfaces into a
//! [`Service`], validating keys and shapes the way `endpoint/enpoint_parser.go`
//! does: accumulate errors per endpoint/field/join, join them, then resolve
//! join targets in a second pass once every endpoint is known.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use super::schema::{
    Endpoint, EndpointId, EndpointSettings, Field, FieldType, Join, OnDeny, SecurityPolicy, Service,
};
use crate::error::{join_errors, Error, Result};

const ENDPOINT_KEYS: &[&str] = &["name", "tableName", "schemaName", "fields", "joins", "security"];
const FIELD_KEYS: &[&str] = &["name", "type", "nullable", "security"];
const JOIN_KEYS: &[&str] = &["endpoint", "on"];

/// Parses a top-level JSON array of endpoint objects into a [`Service`].
pub fn load(json_text: &str) -> Result<Service> {
    let raw: Vec<Json> = serde_json::from_str(json_text)
        .map_err(|e| Error::catalog(format!("invalid catalog JSON: {e}")))?;

    let mut service = Service::new();
    let mut errors = Vec::new();

    for (index, entry) in raw.into_iter().enumerate() {
        match parse_endpoint(&entry, index, service.order.len()) {
            Ok(endpoint) => {
                if service.endpoints.contains_key(&endpoint.name) {
                    errors.push(Error::catalog(format!(
                        "duplicate endpoint name '{}'",
                        endpoint.name
                    )));
                    continue;
                }
                service.insert(endpoint);
            }
            Err(e) => errors.push(e),
        }
    }

    resolve_joins(&mut service, &mut errors);

    if errors.is_empty() {
        tracing::debug!(endpoints = service.order.len(), "catalog loaded");
        Ok(service)
    } else {
        let err = join_errors("catalog load failed", errors);
        tracing::error!(%err, "catalog load failed");
        Err(err)
    }
}

fn resolve_joins(service: &mut Service, errors: &mut Vec<Error>) {
    let names: BTreeMap<String, EndpointId> = service
        .endpoints
        .values()
        .map(|e| (e.name.clone(), e.id))
        .collect();

    for endpoint in service.endpoints.values_mut() {
        for join in endpoint.joins.values_mut() {
            match names.get(&join.child_endpoint_name) {
                Some(id) => join.child_id = Some(*id),
                None => errors.push(Error::catalog(format!(
                    "endpoint '{}', join '{}': child endpoint not found",
                    endpoint.name, join.child_endpoint_name
                ))),
            }
        }
    }
}

fn parse_endpoint(value: &Json, index: usize, id: usize) -> Result<Endpoint> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::catalog(format!("endpoint at index {index} is not an object")))?;

    let name = required_string(obj, "name")
        .map_err(|_| Error::catalog(format!("endpoint at index {index} has no name")))?;
    let table_name = required_string(obj, "tableName").map_err(|_| {
        Error::catalog(format!("endpoint '{name}' at index {index} has no tableName"))
    })?;
    let schema_name = optional_string(obj, "schemaName");

    let mut errors = Vec::new();

    let endpoint_id = EndpointId(id);

    let (field_names, fields) = match obj.get("fields") {
        Some(Json::Array(items)) => match parse_fields(items, endpoint_id) {
            Ok(v) => v,
            Err(e) => {
                errors.push(e);
                (Vec::new(), BTreeMap::new())
            }
        },
        Some(_) => {
            errors.push(Error::catalog(format!("endpoint '{name}': 'fields' must be an array")));
            (Vec::new(), BTreeMap::new())
        }
        None => (Vec::new(), BTreeMap::new()),
    };

    if fields.is_empty() {
        errors.push(Error::catalog(format!("endpoint '{name}' has no fields")));
    }

    let joins = match obj.get("joins") {
        Some(Json::Array(items)) => match parse_joins(items, endpoint_id) {
            Ok(v) => v,
            Err(e) => {
                errors.push(e);
                BTreeMap::new()
            }
        },
        Some(_) => {
            errors.push(Error::catalog(format!("endpoint '{name}': 'joins' must be an array")));
            BTreeMap::new()
        }
        None => BTreeMap::new(),
    };

    let security = match obj.get("security") {
        Some(v) => match parse_security(v) {
            Ok(p) => Some(p),
            Err(e) => {
                errors.push(e);
                None
            }
        },
        None => None,
    };

    for key in obj.keys() {
        if !ENDPOINT_KEYS.contains(&key.as_str()) {
            errors.push(Error::catalog(format!("endpoint '{name}': unexpected key '{key}'")));
        }
    }

    if !errors.is_empty() {
        return Err(join_errors(&format!("endpoint '{name}' at index {index}"), errors));
    }

    Ok(Endpoint {
        id: endpoint_id,
        name,
        table_name,
        schema_name,
        field_names,
        fields,
        joins,
        security,
        settings: EndpointSettings::default(),
    })
}

fn parse_fields(
    items: &[Json],
    endpoint_id: EndpointId,
) -> Result<(Vec<String>, BTreeMap<String, Field>)> {
    let mut names = Vec::new();
    let mut fields = BTreeMap::new();
    let mut errors = Vec::new();

    for item in items {
        match parse_field(item, endpoint_id) {
            Ok(field) => {
                if fields.contains_key(&field.name) {
                    errors.push(Error::catalog(format!("duplicate field '{}'", field.name)));
                    continue;
                }
                names.push(field.name.clone());
                fields.insert(field.name.clone(), field);
            }
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(join_errors("fields", errors));
    }
    Ok((names, fields))
}

fn parse_field(value: &Json, endpoint_id: EndpointId) -> Result<Field> {
    match value {
        Json::String(name) => Ok(Field {
            name: name.clone(),
            field_type: FieldType::String,
            nullable: true,
            endpoint_id,
            security: None,
        }),
        Json::Object(obj) => {
            let name = required_string(obj, "name")?;
            let mut errors = Vec::new();

            let field_type = match obj.get("type") {
                Some(Json::String(s)) => FieldType::from_str(s).unwrap_or_else(|| {
                    errors.push(Error::catalog(format!("field '{name}': unknown type '{s}'")));
                    FieldType::String
                }),
                Some(_) => {
                    errors.push(Error::catalog(format!("field '{name}': 'type' must be a string")));
                    FieldType::String
                }
                None => FieldType::String,
            };

            let nullable = match obj.get("nullable") {
                Some(Json::Bool(b)) => *b,
                Some(_) => {
                    errors.push(Error::catalog(format!(
                        "field '{name}': 'nullable' must be a boolean"
                    )));
                    true
                }
                None => true,
            };

            let security = match obj.get("security") {
                Some(v) => match parse_security(v) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                },
                None => None,
            };

            for key in obj.keys() {
                if !FIELD_KEYS.contains(&key.as_str()) {
                    errors.push(Error::catalog(format!("field '{name}': unexpected key '{key}'")));
                }
            }

            if !errors.is_empty() {
                return Err(join_errors(&format!("field '{name}'"), errors));
            }

            Ok(Field {
                name,
                field_type,
                nullable,
                endpoint_id,
                security,
            })
        }
        other => Err(Error::catalog(format!("field JSON type invalid, got {other}"))),
    }
}

fn parse_joins(
    items: &[Json],
    parent_id: EndpointId,
) -> Result<BTreeMap<String, Join>> {
    let mut joins = BTreeMap::new();
    let mut errors = Vec::new();

    for item in items {
        match parse_join(item, parent_id) {
            Ok(join) => {
                if joins.contains_key(&join.child_endpoint_name) {
                    errors.push(Error::catalog(format!(
                        "duplicate join '{}'",
                        join.child_endpoint_name
                    )));
                    continue;
                }
                joins.insert(join.child_endpoint_name.clone(), join);
            }
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(join_errors("joins", errors));
    }
    Ok(joins)
}

fn parse_join(value: &Json, parent_id: EndpointId) -> Result<Join> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::catalog(format!("invalid 'join' JSON type {value}")))?;

    let child_endpoint_name = required_string(obj, "endpoint")?;
    let mut errors = Vec::new();

    let (parent_on, child_on) = match obj.get("on") {
        Some(Json::String(s)) => (s.clone(), s.clone()),
        Some(Json::Array(items)) if items.len() == 2 => {
            match (items[0].as_str(), items[1].as_str()) {
                (Some(p), Some(c)) => (p.to_string(), c.to_string()),
                _ => {
                    errors.push(Error::catalog("'on' array elements must be strings"));
                    (String::new(), String::new())
                }
            }
        }
        Some(Json::Array(items)) => {
            errors.push(Error::catalog(format!(
                "'on' array length is not two, got {}",
                items.len()
            )));
            (String::new(), String::new())
        }
        Some(_) => {
            errors.push(Error::catalog("invalid 'on' JSON type"));
            (String::new(), String::new())
        }
        None => {
            errors.push(Error::catalog("missing 'on'"));
            (String::new(), String::new())
        }
    };

    for key in obj.keys() {
        if !JOIN_KEYS.contains(&key.as_str()) {
            errors.push(Error::catalog(format!("unexpected key '{key}'")));
        }
    }

    if !errors.is_empty() {
        return Err(join_errors(&format!("join '{child_endpoint_name}'"), errors));
    }

    Ok(Join {
        parent_id,
        child_endpoint_name,
        child_id: None,
        parent_on,
        child_on,
    })
}

fn parse_security(value: &Json) -> Result<SecurityPolicy> {
    match value {
        Json::String(s) => Ok(SecurityPolicy::new(vec![s.clone()], OnDeny::Error)),
        Json::Array(items) => {
            let permissions = items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::catalog("security array elements must be strings"))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(SecurityPolicy::new(permissions, OnDeny::Error))
        }
        Json::Object(obj) => {
            let permissions = match obj.get("permissions") {
                Some(Json::Array(items)) => items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| Error::catalog("permissions elements must be strings"))
                    })
                    .collect::<Result<Vec<_>>>()?,
                Some(_) => return Err(Error::catalog("'permissions' must be an array")),
                None => return Err(Error::catalog("security object missing 'permissions'")),
            };
            let on_deny = match obj.get("onDeny") {
                Some(Json::String(s)) if s == "error" => OnDeny::Error,
                Some(Json::String(s)) if s == "omit" => OnDeny::Omit,
                Some(Json::String(s)) => {
                    return Err(Error::catalog(format!("'onDeny' must be 'error' or 'omit', got '{s}'")))
                }
                Some(_) => return Err(Error::catalog("'onDeny' must be a string")),
                None => OnDeny::Error,
            };
            for key in obj.keys() {
                if key != "permissions" && key != "onDeny" {
                    return Err(Error::catalog(format!("security object: unexpected key '{key}'")));
                }
            }
            Ok(SecurityPolicy::new(permissions, on_deny))
        }
        other => Err(Error::catalog(format!("invalid 'security' JSON type {other}"))),
    }
}

fn required_string(obj: &serde_json::Map<String, Json>, key: &str) -> Result<String> {
    match obj.get(key) {
        Some(Json::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::catalog(format!("'{key}' not string, got {other}"))),
        None => Err(Error::catalog(format!("missing '{key}'"))),
    }
}

fn optional_string(obj: &serde_json::Map<String, Json>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_simple_endpoint() {
        let json = r#"[
            {"name":"Types","tableName":"Types","schemaName":"dbo",
             "fields":["Int",{"name":"Str","type":"string","nullable":false}]}
        ]"#;
        let service = load(json).unwrap();
        let ep = service.get("Types").unwrap();
        assert_eq!(ep.table_name, "Types");
        assert_eq!(ep.fields.len(), 2);
        assert!(!ep.fields["Str"].nullable);
    }

    #[test]
    fn rejects_unexpected_endpoint_key() {
        let json = r#"[{"name":"X","tableName":"X","fields":["a"],"bogus":1}]"#;
        let err = load(json).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn rejects_unexpected_field_key_but_allows_security() {
        let json = r#"[{"name":"X","tableName":"X","fields":[{"name":"a","security":"read","bogus":1}]}]"#;
        let err = load(json).unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert!(!err.to_string().contains("security"));
    }

    #[test]
    fn resolves_join_child_endpoint() {
        let json = r#"[
            {"name":"X","tableName":"X","fields":["x"],
             "joins":[{"endpoint":"YZ","on":"x"}]},
            {"name":"YZ","tableName":"YZ","fields":["x","z"]}
        ]"#;
        let service = load(json).unwrap();
        let join = &service.get("X").unwrap().joins["YZ"];
        assert_eq!(join.child_id, Some(EndpointId(1)));
        assert_eq!(join.parent_on, "x");
        assert_eq!(join.child_on, "x");
    }

    #[test]
    fn join_on_array_sets_distinct_sides() {
        let json = r#"[
            {"name":"X","tableName":"X","fields":["x"],
             "joins":[{"endpoint":"YZ","on":["x","yx"]}]},
            {"name":"YZ","tableName":"YZ","fields":["yx"]}
        ]"#;
        let service = load(json).unwrap();
        let join = &service.get("X").unwrap().joins["YZ"];
        assert_eq!(join.parent_on, "x");
        assert_eq!(join.child_on, "yx");
    }

    #[test]
    fn unresolvable_join_target_is_an_error() {
        let json = r#"[{"name":"X","tableName":"X","fields":["x"],"joins":[{"endpoint":"Nope","on":"x"}]}]"#;
        let err = load(json).unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }
}
