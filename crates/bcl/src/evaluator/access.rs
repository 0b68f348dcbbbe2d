// crates/bcl/src/evaluator/access.rs

//! `left.member` resolution over the shapes evaluation produces.

use super::core::Evaluator;
use super::env::Environment;
use super::errors::{EvalError, EvalResult};
use crate::ast::Node;
use crate::value::{LABEL_KEY, Map, PROPS_KEY, Value, is_block_map};

fn props_get(block: &Map, member: &str) -> Value {
    block
        .get(PROPS_KEY)
        .and_then(Value::as_map)
        .and_then(|props| props.get(member))
        .cloned()
        .unwrap_or(Value::Undefined)
}

impl Evaluator<'_> {
    pub(super) fn eval_dot_access(
        &self,
        left: &Node,
        member: &str,
        env: &mut Environment<'_>,
    ) -> EvalResult<Value> {
        let target = self.eval_value(left, env)?;
        resolve_member(&target, member, env, |name| self.env_var(name))
    }
}

/// A variable of the current scope wins over a map's entry of the same name.
fn local_value(env: &Environment<'_>, name: &str) -> Option<Value> {
    env.get_local(name).cloned()
}

pub(super) fn resolve_member(
    target: &Value,
    member: &str,
    env: &Environment<'_>,
    env_var: impl Fn(&str) -> Option<String>,
) -> EvalResult<Value> {
    match target {
        Value::EnvMarker => {
            let (name, default) = match member.split_once(':') {
                Some((name, default)) => (name, default),
                None => (member, ""),
            };
            Ok(Value::Str(env_var(name).unwrap_or_else(|| default.to_string())))
        }
        Value::Map(m) => {
            if let Some(direct) = m.get(member) {
                return Ok(local_value(env, member).unwrap_or_else(|| direct.clone()));
            }
            if is_block_map(m) {
                return Ok(props_get(m, member));
            }
            if m.len() == 1 {
                if let Some(Value::Map(inner)) = m.values().next() {
                    if is_block_map(inner) {
                        return Ok(props_get(inner, member));
                    }
                }
            }
            Ok(Value::Undefined)
        }
        Value::List(items) if items.iter().any(Value::is_block) => {
            let found = items.iter().filter_map(Value::as_map).find(|block| {
                is_block_map(block)
                    && block.get(LABEL_KEY).and_then(Value::as_str) == Some(member)
            });
            Ok(match found {
                Some(block) => local_value(env, member).unwrap_or_else(|| {
                    block.get(PROPS_KEY).cloned().unwrap_or(Value::Undefined)
                }),
                None => Value::Undefined,
            })
        }
        Value::Undefined => Ok(Value::Undefined),
        other => Err(EvalError::DotAccess(other.type_name())),
    }
}
