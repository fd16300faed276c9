//! Expression evaluation: walks an [`Expr`] tree, producing a [`Value`] and
//! recording, for every reference encountered, which [`RefLevel`] it
//! touched.

use crate::ast::{Expr, ExprKind};
use crate::catalog::Field;
use crate::error::{Error, Result};
use crate::ir::{RefLevel, SelectStatement};
use crate::types::{Value, ValueType};

use super::{eval_field_security, Context, SecurityOutcome};

/// Evaluates `expr`, pushing the reference level of every `@` it touches
/// onto `touches`.
pub(super) fn eval_expr(ctx: &mut Context, expr: &Expr, touches: &mut Vec<RefLevel>) -> Result<Value> {
    match &expr.kind {
        ExprKind::Identifier(name) => Ok(Value::Builtin(name.clone())),
        ExprKind::Integer(n) => Ok(Value::Integer(*n)),
        ExprKind::String(s) => Ok(Value::String(s.clone())),
        ExprKind::Boolean(b) => Ok(Value::Boolean(*b)),
        ExprKind::Null => Ok(Value::Null),
        ExprKind::Order { .. } => Err(Error::parse("ASC/DESC is only valid in an order-by clause", expr.span)),
        ExprKind::Prefix { operator, right } => eval_prefix(ctx, operator, right, touches),
        ExprKind::Infix { left, operator, right } => eval_infix(ctx, left, operator, right, touches),
        ExprKind::Call { function, arguments } => {
            let mut args = Vec::with_capacity(arguments.len());
            for arg in arguments {
                args.push(eval_expr(ctx, arg, touches)?);
            }
            super::builtins::call(function, &args)
        }
        ExprKind::Reference { argument } => eval_reference(ctx, argument.as_deref(), touches),
    }
}

fn eval_prefix(ctx: &mut Context, operator: &str, right: &Expr, touches: &mut Vec<RefLevel>) -> Result<Value> {
    let value = eval_expr(ctx, right, touches)?;
    match operator {
        "!" => match value {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            Value::Expression { text, nullable, .. } => Ok(Value::Expression {
                type_tag: ValueType::Boolean,
                text: format!("NOT ({text})"),
                nullable,
            }),
            other => Err(Error::type_error(format!("'!' requires a boolean operand, got {}", other.type_tag()))),
        },
        "-" => match value {
            Value::Integer(n) => Ok(Value::Integer(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Expression { type_tag, text, nullable } => Ok(Value::Expression {
                type_tag,
                text: format!("-{text}"),
                nullable,
            }),
            other => Err(Error::type_error(format!("unary '-' requires a numeric operand, got {}", other.type_tag()))),
        },
        other => Err(Error::type_error(format!("unknown prefix operator '{other}'"))),
    }
}

fn eval_infix(ctx: &mut Context, left: &Expr, operator: &str, right: &Expr, touches: &mut Vec<RefLevel>) -> Result<Value> {
    let lhs = eval_expr(ctx, left, touches)?;
    let rhs = eval_expr(ctx, right, touches)?;

    if matches!(lhs, Value::Null) && matches!(rhs, Value::Null) {
        return Err(Error::type_error("NULL compared to NULL"));
    }
    if let Some(text) = null_comparison(operator, &lhs, &rhs) {
        return Ok(Value::Expression {
            type_tag: ValueType::Boolean,
            text,
            nullable: false,
        });
    }

    let sql_op = match operator {
        "==" => "=",
        "!=" => "<>",
        other => other,
    };
    let is_boolean = matches!(operator, "==" | "!=" | "<" | "<=" | ">" | ">=" | "AND" | "OR");
    let type_tag = if is_boolean {
        ValueType::Boolean
    } else {
        numeric_result_type(&lhs, &rhs)
    };
    let nullable = lhs.is_nullable() || rhs.is_nullable();
    let text = format!("({} {sql_op} {})", lhs.render(), rhs.render());
    Ok(Value::Expression { type_tag, text, nullable })
}

fn null_comparison(operator: &str, lhs: &Value, rhs: &Value) -> Option<String> {
    let (operand, null_is_left) = match (lhs, rhs) {
        (Value::Null, other) => (other, true),
        (other, Value::Null) => (other, false),
        _ => return None,
    };
    let _ = null_is_left;
    match operator {
        "==" => Some(format!("({} IS NULL)", operand.render())),
        "!=" => Some(format!("({} IS NOT NULL)", operand.render())),
        _ => None,
    }
}

fn numeric_result_type(lhs: &Value, rhs: &Value) -> ValueType {
    if lhs.type_tag() == ValueType::Float || rhs.type_tag() == ValueType::Float {
        ValueType::Float
    } else {
        ValueType::Integer
    }
}

fn eval_reference(ctx: &mut Context, argument: Option<&Expr>, touches: &mut Vec<RefLevel>) -> Result<Value> {
    match argument {
        None => {
            let select = ctx
                .current_select()
                .ok_or_else(|| Error::resolution("'@' has no current column to reference"))?
                .clone();
            let (level, type_tag, text, nullable) = describe_select(ctx, &select);
            touches.push(level);
            Ok(Value::Expression { type_tag, text, nullable })
        }
        Some(arg) => {
            let name = match &arg.kind {
                ExprKind::String(s) => s.clone(),
                _ => return Err(Error::parse("reference argument must be a string literal", arg.span)),
            };
            let field = ctx
                .endpoint
                .field(&name)
                .cloned()
                .ok_or_else(|| Error::resolution(format!("Requested column {name} not found for {}", ctx.endpoint.name)))?;

            match eval_field_security(ctx, &field)? {
                SecurityOutcome::Allow => {}
                SecurityOutcome::Omit => {
                    return Err(Error::permission(format!(
                        "permission denied for field '{name}' on endpoint '{}'",
                        ctx.endpoint.name
                    )));
                }
            }

            touches.push(RefLevel::Field);
            Ok(Value::Expression {
                type_tag: field.field_type.into(),
                text: format!("{}.{}", ctx.endpoint.name, ctx.query.quote(&name)),
                nullable: field.nullable,
            })
        }
    }
}

/// Renders the `@`-target text for the current select, and the level it
/// counts as for clause placement.
fn describe_select(ctx: &Context, select: &SelectStatement) -> (RefLevel, ValueType, String, bool) {
    match select {
        SelectStatement::Field(f) => {
            let nullable = ctx.endpoint.field(&f.name).map(|field: &Field| field.nullable).unwrap_or(false);
            (
                RefLevel::Field,
                f.type_tag,
                format!("{}.{}", f.table, ctx.query.quote(&f.name)),
                nullable,
            )
        }
        SelectStatement::Expression(e) => (
            RefLevel::Expression,
            ValueType::String,
            format!("{}.{}", ctx.query.table_alias, ctx.query.quote(&e.name)),
            e.nullable,
        ),
        SelectStatement::GroupField(f) => {
            let nullable = ctx.endpoint.field(&f.name).map(|field: &Field| field.nullable).unwrap_or(false);
            (
                RefLevel::Group,
                f.type_tag,
                format!("{}.{}", f.table, ctx.query.quote(&f.name)),
                nullable,
            )
        }
        SelectStatement::GroupExpression(e) => (
            RefLevel::Group,
            ValueType::Float,
            if e.function.is_empty() {
                e.text.clone()
            } else {
                format!("{}({})", e.function, e.text)
            },
            true,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::eval::Evaluator;

    fn service() -> crate::catalog::Service {
        catalog::load(r#"[{"name":"Types","tableName":"Types","fields":[{"name":"Int","type":"int"},{"name":"StrN","type":"string","nullable":true}]}]"#).unwrap()
    }

    #[test]
    fn null_equality_becomes_type_error() {
        let service = service();
        let eval = Evaluator::new(&service);
        assert!(eval.compile("Types", "StrN: @ == NULL", None).is_err());
    }

    #[test]
    fn comparison_against_null_uses_is_null() {
        let service = service();
        let eval = Evaluator::new(&service);
        let (q, _) = eval.compile("Types", "StrN: @ != NULL", None).unwrap();
        assert_eq!(
            q.to_sql(),
            "SELECT Types.[StrN] FROM Types WHERE (Types.[StrN] IS NOT NULL)"
        );
    }
}
