//! Built-in functions available to every expression.
//!
//! Built-ins shadow registered resolvers of the same name. `fresh` is not
//! listed here: the parser turns it into its own expression node.

use std::ops::RangeInclusive;

use serde_json::{Number, Value};

use crate::interpreter::EvalError;
use crate::interpreter::plural::plural_category;
use crate::types::{Context, ValueExt};

/// Built-in function signature: evaluated arguments plus the effective
/// request context.
pub(crate) type BuiltinFn = fn(&[Value], &Context) -> Result<Value, EvalError>;

#[derive(Clone, Copy)]
pub(crate) struct Builtin {
    pub name: &'static str,
    arity: (usize, usize),
    f: BuiltinFn,
}

impl Builtin {
    fn arity(&self) -> RangeInclusive<usize> {
        self.arity.0..=self.arity.1
    }

    pub fn call(&self, args: &[Value], context: &Context) -> Result<Value, EvalError> {
        if !self.arity().contains(&args.len()) {
            let (min, max) = self.arity;
            return Err(EvalError::Arity {
                name: self.name.to_string(),
                expected: if min == max {
                    min.to_string()
                } else {
                    format!("{min}-{max}")
                },
                got: args.len(),
            });
        }
        (self.f)(args, context)
    }
}

const BUILTINS: &[Builtin] = &[
    Builtin { name: "int", arity: (1, 1), f: int },
    Builtin { name: "float", arity: (1, 1), f: float },
    Builtin { name: "bool", arity: (1, 1), f: boolean },
    Builtin { name: "json", arity: (1, 1), f: json },
    Builtin { name: "str", arity: (1, 1), f: string },
    Builtin { name: "len", arity: (1, 1), f: len },
    Builtin { name: "upper", arity: (1, 1), f: upper },
    Builtin { name: "lower", arity: (1, 1), f: lower },
    Builtin { name: "cap", arity: (1, 1), f: cap },
    Builtin { name: "plural", arity: (1, 2), f: plural },
];

/// Look up a built-in by name.
pub(crate) fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Names of every built-in, including `fresh`.
pub fn builtin_names() -> Vec<&'static str> {
    BUILTINS
        .iter()
        .map(|b| b.name)
        .chain(["fresh"])
        .collect()
}

fn coercion(builtin: &str, value: &Value) -> EvalError {
    EvalError::Coercion {
        builtin: builtin.to_string(),
        value: value.to_string(),
    }
}

/// Whole part of `f`, if it fits an `i64`.
fn truncate(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let whole = f.trunc();
    (whole >= -LIMIT && whole < LIMIT).then_some(whole as i64)
}

fn int(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    let value = &args[0];
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    parsed.map(Value::from).ok_or_else(|| coercion("int", value))
}

fn float(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    let value = &args[0];
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| coercion("float", value))
}

fn boolean(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    let result = match &args[0] {
        Value::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "false" | "0"),
        other => other.truthy(),
    };
    Ok(Value::Bool(result))
}

fn json(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    match &args[0] {
        Value::String(s) => serde_json::from_str(s).map_err(|_| coercion("json", &args[0])),
        other => Ok(other.clone()),
    }
}

fn string(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].render()))
}

fn len(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    let count = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        other => {
            return Err(EvalError::Type {
                message: format!("len() of {}", other.kind()),
            });
        }
    };
    Ok(Value::from(count))
}

fn upper(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].render().to_uppercase()))
}

fn lower(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].render().to_lowercase()))
}

/// Uppercase the first character.
fn cap(args: &[Value], _: &Context) -> Result<Value, EvalError> {
    let text = args[0].render();
    let mut chars = text.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    Ok(Value::String(capitalized))
}

/// CLDR plural category of an integer, in the given or requested language.
fn plural(args: &[Value], context: &Context) -> Result<Value, EvalError> {
    let n = args[0].as_i64().ok_or_else(|| coercion("plural", &args[0]))?;
    let lang = match args.get(1) {
        Some(Value::String(lang)) => lang.as_str(),
        Some(other) => return Err(coercion("plural", other)),
        None => context.language().unwrap_or("en"),
    };
    Ok(Value::String(plural_category(lang, n).to_string()))
}
