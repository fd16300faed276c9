//! Abstract syntax tree for the Dyre query language.
//!
//! A query compiles to a [`RequestStatements`]: an ordered list of
//! statements, each either a column reference, a column/group function
//! call, or a boolean expression that narrows the preceding column.

mod expr;
mod stmt;

pub use expr::{Expr, ExprKind};
pub use stmt::{RequestStatements, Statement};
