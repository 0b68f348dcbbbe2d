// crates/bcl/src/value.rs

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub type Map = BTreeMap<String, Value>;

/// Reserved key naming a block's type.
pub const TYPE_KEY: &str = "__type";
/// Reserved key naming a block's label.
pub const LABEL_KEY: &str = "__label";
/// Reserved key holding a block's evaluated properties.
pub const PROPS_KEY: &str = "props";

/// Runtime value produced by evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Result of looking up a name that does not exist. Never equal to `Null`.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Map),
    /// `[value, error]` pair produced by function calls; `error` is `Null`
    /// on success, otherwise the error message.
    Tuple(Vec<Value>),
    /// What the bare identifier `env` evaluates to.
    EnvMarker,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Builds the internal block shape `{__type, __label, props}`.
    pub fn block(kind: &str, label: &str, props: Map) -> Self {
        let mut m = Map::new();
        m.insert(TYPE_KEY.to_string(), Value::str(kind));
        m.insert(LABEL_KEY.to_string(), Value::str(label));
        m.insert(PROPS_KEY.to_string(), Value::Map(props));
        Value::Map(m)
    }

    /// Builds a function-call result tuple.
    pub fn call_result(result: Result<Value, String>) -> Self {
        match result {
            Ok(v) => Value::Tuple(vec![v, Value::Null]),
            Err(e) => Value::Tuple(vec![Value::Null, Value::Str(e)]),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(m) if is_block_map(m) => "block",
            Value::Map(_) => "map",
            Value::Tuple(_) => "tuple",
            Value::EnvMarker => "env",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `null` and `Undefined` both count as missing for `??` and `isNull`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Value::Map(m) if is_block_map(m))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Dotted lookup through maps and block `props`, for callers walking an
    /// evaluated document: `doc.get_path("server.main.port")`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut cur = self;
        for seg in path.split('.') {
            let map = cur.as_map()?;
            cur = match map.get(seg) {
                Some(v) => v,
                None if is_block_map(map) => map.get(PROPS_KEY)?.as_map()?.get(seg)?,
                None => return None,
            };
        }
        Some(cur)
    }

    /// Plain document view: `__`-prefixed keys are dropped, block `props`
    /// are flattened into the block itself, tuples collapse to their value.
    pub fn to_document(&self) -> Value {
        match self {
            Value::Map(m) if is_block_map(m) => {
                let mut out = Map::new();
                if let Some(Value::Map(props)) = m.get(PROPS_KEY) {
                    for (k, v) in props {
                        if !k.starts_with("__") {
                            out.insert(k.clone(), v.to_document());
                        }
                    }
                }
                Value::Map(out)
            }
            Value::Map(m) => Value::Map(
                m.iter()
                    .filter(|(k, _)| !k.starts_with("__"))
                    .map(|(k, v)| (k.clone(), v.to_document()))
                    .collect(),
            ),
            Value::List(items) => Value::List(items.iter().map(Value::to_document).collect()),
            Value::Tuple(items) => items.first().map(Value::to_document).unwrap_or(Value::Null),
            Value::Undefined | Value::EnvMarker => Value::Null,
            other => other.clone(),
        }
    }
}

pub fn is_block_map(m: &Map) -> bool {
    m.contains_key(TYPE_KEY)
}

/// Prints floats the short way: `3` for `3.0`, `2.5` for `2.5`.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// The printed form used by interpolation and string concatenation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => Ok(()),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) | Value::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::EnvMarker => write!(f, "env"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null | Value::EnvMarker => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_block() -> Value {
        let mut props = Map::new();
        props.insert("port".into(), Value::Int(8080));
        props.insert("name".into(), Value::str("main"));
        Value::block("server", "main", props)
    }

    #[test]
    fn test_undefined_is_not_null() {
        assert_ne!(Value::Undefined, Value::Null);
        assert!(Value::Undefined.is_nullish());
        assert!(Value::Null.is_nullish());
        assert!(!Value::Int(0).is_nullish());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Undefined.to_string(), "");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::str("a")]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn test_get_path_through_props() {
        let mut bucket = Map::new();
        bucket.insert("main".into(), sample_block());
        let mut root = Map::new();
        root.insert("server".into(), Value::Map(bucket));
        let doc = Value::Map(root);
        assert_eq!(doc.get_path("server.main.port"), Some(&Value::Int(8080)));
        assert_eq!(doc.get_path("server.other.port"), None);
    }

    #[test]
    fn test_to_document_flattens_blocks() {
        let doc = sample_block().to_document();
        let mut expected = Map::new();
        expected.insert("port".into(), Value::Int(8080));
        expected.insert("name".into(), Value::str("main"));
        assert_eq!(doc, Value::Map(expected));
    }

    #[test]
    fn test_serialize_shape() {
        let json = serde_json::to_value(&sample_block()).unwrap();
        assert_eq!(json["__type"], "server");
        assert_eq!(json["props"]["port"], 8080);
        let tuple = Value::call_result(Ok(Value::Int(1)));
        assert_eq!(serde_json::to_string(&tuple).unwrap(), "[1,null]");
    }
}
