//! # Dyre
//!
//! Compiles the Dyre query language into SQL against a declared endpoint
//! catalog.
//!
//! This library provides a complete pipeline — lexer, parser, evaluator,
//! and SQL serializer — that turns a small column/filter DSL into a SQL
//! string scoped to one catalog endpoint, enforcing per-field and
//! per-endpoint security policies along the way.
//!
//! ## Quick Start
//!
//! ```rust
//! use dyre::catalog;
//! use dyre::compile::compile;
//!
//! let service = catalog::load(r#"[{"name":"Widgets","tableName":"Widgets","fields":["Id"]}]"#).unwrap();
//! let compiled = compile(&service, "Widgets", "Id:", None).unwrap();
//! assert_eq!(compiled.sql, "SELECT Widgets.[Id] FROM Widgets");
//! ```
//!
//! ## Extensibility
//!
//! A [`catalog::SecurityChecker`] gates fields and endpoints whose catalog
//! entry declares a `security` policy. The crate ships [`catalog::StaticChecker`]
//! (a fixed grant set), [`catalog::RoleChecker`] (a callback), and
//! [`catalog::PermissiveChecker`] (allow-all) — or implement the trait
//! against your own authorization layer.
//!
//! ## SQL Dialect
//!
//! The serializer targets bracketed-identifier T-SQL: `[col]` quoting,
//! `TOP N`, `CONVERT`/`DATEPART`/`DATEADD`, `AT TIME ZONE`, `LIKE`,
//! `IS NULL`/`IS NOT NULL`, and booleans rendered as `1`/`0`.

pub mod ast;
pub mod catalog;
pub mod compile;
pub mod error;
pub mod eval;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod types;

pub use compile::{compile as compile_query, Compiled};
pub use error::{Error, Result};
pub use eval::{Evaluator, JoinBuilder};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
