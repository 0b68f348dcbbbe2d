// crates/bcl/src/evaluator/env.rs

use crate::value::{Map, Value};

/// A lexical scope. Children hold a shared reference to their parent for
/// lookup only; writes always land in the scope they are made on.
#[derive(Debug, Default, Clone)]
pub struct Environment<'p> {
    pub vars: Map,
    parent: Option<&'p Environment<'p>>,
}

impl<'p> Environment<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(vars: Map) -> Self {
        Environment { vars, parent: None }
    }

    /// A fresh scope whose lookups fall back to `self`.
    pub fn child(&self) -> Environment<'_> {
        Environment {
            vars: Map::new(),
            parent: Some(self),
        }
    }

    pub fn parent(&self) -> Option<&Environment<'p>> {
        self.parent
    }

    /// Walks the parent chain; a missing name is `Undefined`, never an error.
    pub fn lookup(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Undefined)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(v) = env.vars.get(name) {
                return Some(v);
            }
            scope = env.parent;
        }
        None
    }

    /// This scope's own table only.
    pub fn get_local(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn extend(&mut self, vars: &Map) {
        for (k, v) in vars {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    pub fn into_vars(self) -> Map {
        self.vars
    }
}
