//! SQL scalar built-in functions, registered under lowercase keys — the
//! deliberate case asymmetry against the uppercase column/group function
//! tables (see [`statements`](super::statements)).

use crate::error::{Error, Result};
use crate::types::{Value, ValueType};

/// Renders a call to one of the registered scalar built-ins, or an error if
/// `name` is not a registered key. Arguments are already-evaluated values;
/// this only renders SQL text, it never executes anything.
pub fn call(name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "len" => arity(args, 1, name).map(|_| expr(ValueType::Integer, format!("LEN({})", render(&args[0])), false))?,
        "date" => arity(args, 1, name).map(|_| expr(ValueType::Date, format!("CONVERT(date, {}, 23)", render(&args[0])), args[0].is_nullable()))?,
        "datetime" => arity(args, 1, name).map(|_| expr(ValueType::DateTime, format!("CONVERT(datetime, {})", render(&args[0])), args[0].is_nullable()))?,
        "datepart" => {
            arity(args, 2, name)?;
            Ok(expr(ValueType::Integer, format!("DATEPART({}, {})", render(&args[0]), render(&args[1])), args[1].is_nullable()))
        }
        "dateadd" => {
            arity(args, 3, name)?;
            Ok(expr(
                ValueType::DateTime,
                format!("DATEADD({}, {}, {})", render(&args[0]), render(&args[1]), render(&args[2])),
                args[2].is_nullable(),
            ))
        }
        "cast" => {
            arity(args, 2, name)?;
            Ok(expr(ValueType::String, format!("CAST({} AS {})", render(&args[0]), render(&args[1])), args[0].is_nullable()))
        }
        "convert" => {
            arity(args, 2, name)?;
            Ok(expr(ValueType::String, format!("CONVERT({}, {})", render(&args[1]), render(&args[0])), args[0].is_nullable()))
        }
        "timezone" => {
            arity(args, 2, name)?;
            Ok(expr(
                ValueType::DateTime,
                format!("{} AT TIME ZONE {}", render(&args[0]), render(&args[1])),
                args[0].is_nullable(),
            ))
        }
        "like" => {
            arity(args, 2, name)?;
            Ok(expr(ValueType::Boolean, format!("{} LIKE {}", render(&args[0]), render(&args[1])), false))
        }
        _ => Err(Error::resolution(format!("unknown built-in '{name}'"))),
    }
}

fn render(v: &Value) -> String {
    v.render()
}

fn expr(type_tag: ValueType, text: String, nullable: bool) -> Value {
    Value::Expression { type_tag, text, nullable }
}

fn arity(args: &[Value], want: usize, name: &str) -> Result<()> {
    if args.len() != want {
        return Err(Error::type_error(format!(
            "wrong number of arguments. got={}, want={want} for '{name}'",
            args.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_wraps_argument() {
        let v = call("len", &[Value::Expression { type_tag: ValueType::String, text: "Types.[Str]".into(), nullable: false }]).unwrap();
        assert_eq!(v.render(), "LEN(Types.[Str])");
    }

    #[test]
    fn date_renders_with_style_23() {
        let v = call("date", &[Value::Expression { type_tag: ValueType::String, text: "Types.[Str]".into(), nullable: true }]).unwrap();
        assert_eq!(v.render(), "CONVERT(date, Types.[Str], 23)");
    }

    #[test]
    fn len_is_never_nullable() {
        let v = call("len", &[Value::Expression { type_tag: ValueType::String, text: "Types.[Str]".into(), nullable: true }]).unwrap();
        assert!(!v.is_nullable());
    }

    #[test]
    fn unknown_builtin_is_resolution_error() {
        assert!(call("nope", &[]).is_err());
    }

    #[test]
    fn wrong_arity_is_type_error() {
        assert!(call("len", &[]).is_err());
    }

    #[test]
    fn like_renders_infix_keyword() {
        let v = call(
            "like",
            &[
                Value::Expression { type_tag: ValueType::String, text: "Types.[Str]".into(), nullable: false },
                Value::String("%a%".into()),
            ],
        )
        .unwrap();
        assert_eq!(v.render(), "Types.[Str] LIKE '%a%'");
    }
}
