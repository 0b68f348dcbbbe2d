// crates/bcl/src/evaluator/builtins.rs

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;

use super::errors::RegistryError;
use super::ops::{Number, to_number};
use crate::value::Value;

/// A callable exposed to documents. Errors are plain messages; the call
/// site wraps them into the `[value, error]` result tuple.
pub type BuiltinFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Name to callable map, keyed case-insensitively. The lock is held only
/// for the map access itself, never across a call.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, BuiltinFn>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every builtin installed.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        {
            let mut map = registry.functions.write();
            for (name, f) in default_builtins() {
                map.insert(name.to_lowercase(), f);
            }
        }
        registry
    }

    /// Fails on an empty name or one that is already taken; nothing is
    /// silently replaced.
    pub fn register<F>(&self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register_arc(name, Arc::new(f))
    }

    pub fn register_arc(&self, name: &str, f: BuiltinFn) -> Result<(), RegistryError> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut map = self.functions.write();
        if map.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        map.insert(key, f);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinFn> {
        self.functions.read().get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(&name.to_lowercase())
    }

    /// Returns whether anything was removed.
    pub fn unregister(&self, name: &str) -> bool {
        self.functions.write().remove(&name.to_lowercase()).is_some()
    }

    /// Registered names, lowercased and sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }
}

//------------------------------------------------------------------------------
// Builtins
//------------------------------------------------------------------------------

fn builtin(f: fn(&[Value]) -> Result<Value, String>) -> BuiltinFn {
    Arc::new(f)
}

/// Return the default builtins.
pub fn default_builtins() -> Vec<(&'static str, BuiltinFn)> {
    vec![
        ("isDefined", builtin(builtin_is_defined)),
        ("isNull", builtin(builtin_is_null)),
        ("isEmpty", builtin(builtin_is_empty)),
        ("upper", builtin(builtin_upper)),
        ("lower", builtin(builtin_lower)),
        ("trim", builtin(builtin_trim)),
        ("replace", builtin(builtin_replace)),
        ("reverse", builtin(builtin_reverse)),
        ("substring", builtin(builtin_substring)),
        ("split", builtin(builtin_split)),
        ("join", builtin(builtin_join)),
        ("length", builtin(builtin_length)),
        ("len", builtin(builtin_length)),
        ("index", builtin(builtin_index)),
        ("startsWith", builtin(builtin_starts_with)),
        ("endsWith", builtin(builtin_ends_with)),
        ("repeat", builtin(builtin_repeat)),
        ("matches", builtin(builtin_matches)),
        ("toString", builtin(builtin_to_string)),
        ("toNumber", builtin(builtin_to_number)),
    ]
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}-{}", min, max)
        };
        return Err(format!(
            "{} expects {} argument(s), got {}",
            name,
            expected,
            args.len()
        ));
    }
    Ok(())
}

/// Non-string arguments are coerced through their printed form.
fn text(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn integer(name: &str, v: &Value) -> Result<i64, String> {
    to_number(v)
        .map(Number::as_i64)
        .ok_or_else(|| format!("{}: expected a number, got {}", name, v.type_name()))
}

fn builtin_is_defined(args: &[Value]) -> Result<Value, String> {
    arity("isDefined", args, 1, 1)?;
    Ok(Value::Bool(!args[0].is_undefined()))
}

fn builtin_is_null(args: &[Value]) -> Result<Value, String> {
    arity("isNull", args, 1, 1)?;
    Ok(Value::Bool(args[0].is_nullish()))
}

fn builtin_is_empty(args: &[Value]) -> Result<Value, String> {
    arity("isEmpty", args, 1, 1)?;
    let empty = match &args[0] {
        Value::Undefined | Value::Null => true,
        Value::Str(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Map(m) => m.is_empty(),
        _ => false,
    };
    Ok(Value::Bool(empty))
}

fn builtin_upper(args: &[Value]) -> Result<Value, String> {
    arity("upper", args, 1, 1)?;
    Ok(Value::Str(text(&args[0]).to_uppercase()))
}

fn builtin_lower(args: &[Value]) -> Result<Value, String> {
    arity("lower", args, 1, 1)?;
    Ok(Value::Str(text(&args[0]).to_lowercase()))
}

fn builtin_trim(args: &[Value]) -> Result<Value, String> {
    arity("trim", args, 1, 1)?;
    Ok(Value::Str(text(&args[0]).trim().to_string()))
}

fn builtin_replace(args: &[Value]) -> Result<Value, String> {
    arity("replace", args, 3, 3)?;
    let from = text(&args[1]);
    if from.is_empty() {
        return Err("replace: search string must not be empty".into());
    }
    Ok(Value::Str(text(&args[0]).replace(&from, &text(&args[2]))))
}

fn builtin_reverse(args: &[Value]) -> Result<Value, String> {
    arity("reverse", args, 1, 1)?;
    match &args[0] {
        Value::List(items) => Ok(Value::List(items.iter().rev().cloned().collect())),
        other => Ok(Value::Str(text(other).chars().rev().collect())),
    }
}

/// `substring(s, start[, end])` over characters; `end` is exclusive and
/// clamped to the length.
fn builtin_substring(args: &[Value]) -> Result<Value, String> {
    arity("substring", args, 2, 3)?;
    let chars: Vec<char> = text(&args[0]).chars().collect();
    let start = integer("substring", &args[1])?;
    let end = match args.get(2) {
        Some(v) => integer("substring", v)?,
        None => chars.len() as i64,
    };
    if start < 0 || end < start {
        return Err(format!("substring: invalid range {}..{}", start, end));
    }
    let start = (start as usize).min(chars.len());
    let end = (end as usize).min(chars.len());
    Ok(Value::Str(chars[start..end].iter().collect()))
}

fn builtin_split(args: &[Value]) -> Result<Value, String> {
    arity("split", args, 2, 2)?;
    let s = text(&args[0]);
    let sep = text(&args[1]);
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(Value::str).collect()
    };
    Ok(Value::List(parts))
}

fn builtin_join(args: &[Value]) -> Result<Value, String> {
    arity("join", args, 1, 2)?;
    let sep = args.get(1).map(text).unwrap_or_default();
    match &args[0] {
        Value::List(items) => Ok(Value::Str(
            items.iter().map(text).collect::<Vec<_>>().join(&sep),
        )),
        other => Ok(Value::Str(text(other))),
    }
}

fn builtin_length(args: &[Value]) -> Result<Value, String> {
    arity("length", args, 1, 1)?;
    let n = match &args[0] {
        Value::List(items) => items.len(),
        Value::Map(m) => m.len(),
        Value::Undefined | Value::Null => 0,
        other => text(other).chars().count(),
    };
    Ok(Value::Int(n as i64))
}

/// Character index of the first occurrence, or -1.
fn builtin_index(args: &[Value]) -> Result<Value, String> {
    arity("index", args, 2, 2)?;
    let s = text(&args[0]);
    let needle = text(&args[1]);
    let idx = s
        .find(&needle)
        .map(|byte| s[..byte].chars().count() as i64)
        .unwrap_or(-1);
    Ok(Value::Int(idx))
}

fn builtin_starts_with(args: &[Value]) -> Result<Value, String> {
    arity("startsWith", args, 2, 2)?;
    Ok(Value::Bool(text(&args[0]).starts_with(&text(&args[1]))))
}

fn builtin_ends_with(args: &[Value]) -> Result<Value, String> {
    arity("endsWith", args, 2, 2)?;
    Ok(Value::Bool(text(&args[0]).ends_with(&text(&args[1]))))
}

fn builtin_repeat(args: &[Value]) -> Result<Value, String> {
    arity("repeat", args, 2, 2)?;
    let n = integer("repeat", &args[1])?;
    let n = usize::try_from(n).map_err(|_| format!("repeat: negative count {}", n))?;
    Ok(Value::Str(text(&args[0]).repeat(n)))
}

fn builtin_matches(args: &[Value]) -> Result<Value, String> {
    arity("matches", args, 2, 2)?;
    let re = Regex::new(&text(&args[1])).map_err(|e| format!("matches: {}", e))?;
    Ok(Value::Bool(re.is_match(&text(&args[0]))))
}

fn builtin_to_string(args: &[Value]) -> Result<Value, String> {
    arity("toString", args, 1, 1)?;
    Ok(Value::Str(text(&args[0])))
}

fn builtin_to_number(args: &[Value]) -> Result<Value, String> {
    arity("toNumber", args, 1, 1)?;
    to_number(&args[0])
        .map(Number::into_value)
        .ok_or_else(|| format!("toNumber: cannot convert {} '{}'", args[0].type_name(), args[0]))
}
