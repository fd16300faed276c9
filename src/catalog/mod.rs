//! The endpoint catalog: a read-only schema of tables (endpoints), typed
//! fields, joins, and security policies that compilation is bound against.
//!
//! ```
//! use dyre::catalog;
//!
//! let json = r#"[{"name":"Types","tableName":"Types","fields":["Int"]}]"#;
//! let service = catalog::load(json).unwrap();
//! assert!(service.get("Types").is_some());
//! ```

mod loader;
mod schema;
pub mod security;

pub use loader::load;
pub use schema::{
    Endpoint, EndpointId, EndpointSettings, Field, FieldType, Join, OnDeny, SecurityPolicy, Service,
};
pub use security::{PermissiveChecker, RoleChecker, SecurityChecker, StaticChecker};
