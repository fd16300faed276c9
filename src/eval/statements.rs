//! Statement-level evaluation: dispatches each parsed [`Statement`] to the
//! column-function, group-function, or plain-expression handling described
//! in the evaluator design.

use crate::ast::Statement;
use crate::catalog::Service;
use crate::error::{Error, Result};
use crate::ir::{RefLevel, SelectExpression, SelectField, SelectGroupExpression, SelectGroupField, SelectStatement};

use super::expr::eval_expr;
use super::{eval_field_security, Context, CurrentTarget, SecurityOutcome};

pub(super) fn execute(_service: &Service, ctx: &mut Context, statement: Statement) -> Result<()> {
    match statement {
        Statement::ColumnLiteral { name, .. } => column_literal(ctx, &name),
        Statement::ColumnFunction { function, arguments, .. } => column_function(ctx, &function, arguments),
        Statement::GroupFunction { function, arguments, .. } => group_function(ctx, &function, arguments),
        Statement::Expression { expr: Some(expr), .. } => expression_statement(ctx, &expr),
        Statement::Expression { expr: None, .. } => Ok(()),
    }
}

fn column_literal(ctx: &mut Context, name: &str) -> Result<()> {
    ctx.enter_mode(name, false)?;

    let field = ctx
        .endpoint
        .field(name)
        .cloned()
        .ok_or_else(|| Error::resolution(format!("Requested column {name} not found for {}", ctx.endpoint.name)))?;

    match eval_field_security(ctx, &field)? {
        SecurityOutcome::Allow => {}
        SecurityOutcome::Omit => return Ok(()),
    }

    let idx = ctx.query.upsert_select(SelectStatement::Field(SelectField {
        name: name.to_string(),
        table: ctx.endpoint.name.clone(),
        type_tag: field.field_type.into(),
    }));
    ctx.current = CurrentTarget::Select(idx);
    Ok(())
}

fn column_function(ctx: &mut Context, function: &str, arguments: Vec<crate::ast::Expr>) -> Result<()> {
    ctx.enter_mode(function, false)?;

    match function {
        "AS" | "ALIAS" => {
            arity(&arguments, 2, function)?;
            let alias = string_literal(&arguments[0])?;
            if ctx.query.select_index(&alias).is_some() {
                return Err(Error::resolution(format!("alias '{alias}' already defined")));
            }
            let mut touches = Vec::new();
            let value = eval_expr(ctx, &arguments[1], &mut touches)?;
            ctx.query.selects.push(SelectStatement::Expression(SelectExpression {
                name: alias,
                text: value.render(),
                nullable: value.is_nullable(),
            }));
            ctx.current = CurrentTarget::Select(ctx.query.selects.len() - 1);
            Ok(())
        }
        "EXCLUDE" => {
            arity(&arguments, 1, function)?;
            let name = string_literal(&arguments[0])?;
            let field = ctx
                .endpoint
                .field(&name)
                .cloned()
                .ok_or_else(|| Error::resolution(format!("Requested column {name} not found for {}", ctx.endpoint.name)))?;
            match eval_field_security(ctx, &field)? {
                SecurityOutcome::Allow => {}
                SecurityOutcome::Omit => {
                    ctx.current = CurrentTarget::None;
                    return Ok(());
                }
            }
            ctx.current = CurrentTarget::Pending(SelectStatement::Field(SelectField {
                name,
                table: ctx.endpoint.name.clone(),
                type_tag: field.field_type.into(),
            }));
            Ok(())
        }
        other => Err(Error::resolution(format!("unknown column function '{other}'"))),
    }
}

fn group_function(ctx: &mut Context, function: &str, arguments: Vec<crate::ast::Expr>) -> Result<()> {
    ctx.enter_mode(function, true)?;

    match function {
        "GROUP" if arguments.len() == 1 => {
            let name = string_literal(&arguments[0])?;
            let field = ctx
                .endpoint
                .field(&name)
                .cloned()
                .ok_or_else(|| Error::resolution(format!("Requested column {name} not found for {}", ctx.endpoint.name)))?;
            match eval_field_security(ctx, &field)? {
                SecurityOutcome::Allow => {}
                SecurityOutcome::Omit => return Ok(()),
            }
            let text = format!("{}.{}", ctx.endpoint.name, ctx.query.quote(&name));
            let idx = ctx.query.upsert_select(SelectStatement::GroupField(SelectGroupField {
                name: name.clone(),
                table: ctx.endpoint.name.clone(),
                type_tag: field.field_type.into(),
            }));
            ctx.query.group_by_statements.push(text);
            ctx.current = CurrentTarget::Select(idx);
            Ok(())
        }
        "GROUP" => {
            arity(&arguments, 2, function)?;
            let alias = string_literal(&arguments[0])?;
            if ctx.query.select_index(&alias).is_some() {
                return Err(Error::resolution(format!("alias '{alias}' already defined")));
            }
            let mut touches = Vec::new();
            let value = eval_expr(ctx, &arguments[1], &mut touches)?;
            ctx.query.group_by_statements.push(value.render());
            ctx.query.selects.push(SelectStatement::GroupExpression(SelectGroupExpression {
                name: alias,
                function: String::new(),
                text: value.render(),
            }));
            ctx.current = CurrentTarget::Select(ctx.query.selects.len() - 1);
            Ok(())
        }
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" => {
            arity(&arguments, 2, function)?;
            let alias = string_literal(&arguments[0])?;
            if ctx.query.select_index(&alias).is_some() {
                return Err(Error::resolution(format!("alias '{alias}' already defined")));
            }
            let mut touches = Vec::new();
            let value = eval_expr(ctx, &arguments[1], &mut touches)?;
            ctx.query.selects.push(SelectStatement::GroupExpression(SelectGroupExpression {
                name: alias,
                function: function.to_string(),
                text: value.render(),
            }));
            ctx.current = CurrentTarget::Select(ctx.query.selects.len() - 1);
            Ok(())
        }
        other => Err(Error::resolution(format!("unknown group function '{other}'"))),
    }
}

fn expression_statement(ctx: &mut Context, expr: &crate::ast::Expr) -> Result<()> {
    let mut touches = Vec::new();
    let value = eval_expr(ctx, expr, &mut touches)?;

    if !matches!(value.type_tag(), crate::types::ValueType::Boolean) {
        return Err(Error::type_error("expression statement must evaluate to a boolean"));
    }

    let distinct: std::collections::HashSet<RefLevel> = touches.into_iter().collect();
    if distinct.len() > 1 {
        return Err(Error::type_error("Not all references are the same type"));
    }
    let level = distinct.into_iter().next().unwrap_or(RefLevel::Literal);
    let text = value.render();

    match level {
        RefLevel::Literal | RefLevel::Field => ctx.query.where_statements.push(text),
        RefLevel::Expression => ctx.query.alias_where_statements.push(text),
        RefLevel::Group => ctx.query.having_statements.push(text),
    }
    Ok(())
}

fn string_literal(expr: &crate::ast::Expr) -> Result<String> {
    match &expr.kind {
        crate::ast::ExprKind::String(s) => Ok(s.clone()),
        other => Err(Error::type_error(format!("expected a string literal argument, got {other:?}"))),
    }
}

fn arity(args: &[crate::ast::Expr], want: usize, name: &str) -> Result<()> {
    if args.len() != want {
        return Err(Error::type_error(format!(
            "wrong number of arguments. got={}, want={want} for '{name}'",
            args.len()
        )));
    }
    Ok(())
}
