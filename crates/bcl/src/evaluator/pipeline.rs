// crates/bcl/src/evaluator/pipeline.rs

use log::trace;

use super::core::Evaluator;
use super::env::Environment;
use super::errors::{EvalError, EvalResult};
use crate::ast::{Node, Pipeline};
use crate::value::Value;

/// Execution order for a pipeline. Without edges the steps run as written.
/// With edges the path starts at the first edge whose source is never a
/// target (or the first edge's source) and follows `source -> target`.
pub(super) fn step_order<'a>(
    steps: &[&'a str],
    edges: &[(&'a str, &'a str)],
) -> EvalResult<Vec<&'a str>> {
    if edges.is_empty() {
        return Ok(steps.to_vec());
    }
    for (source, target) in edges {
        for name in [source, target] {
            if !steps.contains(name) {
                return Err(EvalError::Pipeline(format!("unknown step '{}'", name)));
            }
        }
    }
    let start = edges
        .iter()
        .find(|(source, _)| !edges.iter().any(|(_, t)| t == source))
        .unwrap_or(&edges[0])
        .0;

    let mut order = vec![start];
    let mut current = start;
    while let Some(&(_, next)) = edges
        .iter()
        .find(|(s, t)| *s == current && !order.contains(t))
    {
        order.push(next);
        current = next;
    }
    Ok(order)
}

impl Evaluator<'_> {
    pub(super) fn eval_pipeline(
        &self,
        pipeline: &Pipeline,
        env: &mut Environment<'_>,
    ) -> EvalResult<Value> {
        let mut steps: Vec<(&str, &Node)> = Vec::new();
        let mut edges: Vec<(&str, &str)> = Vec::new();
        for node in &pipeline.body {
            match node {
                Node::Assignment(a) => steps.push((a.name.as_str(), a.value.as_ref())),
                Node::Arrow(arrow) => edges.push((arrow.source.as_str(), arrow.target.as_str())),
                _ => {}
            }
        }
        let names: Vec<&str> = steps.iter().map(|(name, _)| *name).collect();
        let order = step_order(&names, &edges)?;

        let mut scope = env.child();
        let mut output = Value::Null;
        for name in order {
            let Some((_, expr)) = steps.iter().find(|(n, _)| *n == name) else {
                continue;
            };
            trace!("pipeline step {}", name);
            let value = match self.eval(expr, &mut scope)? {
                Value::Tuple(mut items) if items.len() == 2 => {
                    let err = items.pop().unwrap_or(Value::Null);
                    if !err.is_nullish() {
                        return Err(EvalError::Pipeline(format!(
                            "step '{}' failed: {}",
                            name, err
                        )));
                    }
                    items.pop().unwrap_or(Value::Null)
                }
                other => other,
            };
            scope.set(name, value.clone());
            output = value;
        }
        Ok(output)
    }
}
