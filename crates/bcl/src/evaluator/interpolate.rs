// crates/bcl/src/evaluator/interpolate.rs

use super::core::Evaluator;
use super::env::Environment;
use super::errors::{EvalError, EvalResult};
use crate::parser::parse_expression_str;

/// `IDENT:default` that is not a valid expression falls back to the
/// environment, like a bare `${NAME:default}` outside a string.
fn env_form(inner: &str) -> Option<(&str, &str)> {
    let (name, default) = inner.split_once(':')?;
    let name = name.trim();
    let ident = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.is_empty();
    ident.then_some((name, default))
}

impl Evaluator<'_> {
    /// Replaces every `${expr}` in `text` with the printed value of `expr`
    /// evaluated against `env`.
    pub(super) fn interpolate(&self, text: &str, env: &mut Environment<'_>) -> EvalResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let mut depth = 1usize;
            let mut end = None;
            for (i, c) in after.char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            let Some(end) = end else {
                return Err(EvalError::Interpolation(format!(
                    "unmatched '${{' in \"{}\"",
                    text
                )));
            };
            let inner = after[..end].trim();
            out.push_str(&self.interpolate_one(inner, env)?);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn interpolate_one(&self, inner: &str, env: &mut Environment<'_>) -> EvalResult<String> {
        if inner.is_empty() {
            return Err(EvalError::Interpolation("empty '${}'".into()));
        }
        if let Some(name) = inner.strip_prefix("env.") {
            let (name, default) = name.split_once(':').unwrap_or((name, ""));
            return Ok(self
                .env_var(name.trim())
                .unwrap_or_else(|| default.to_string()));
        }
        let node = match parse_expression_str(inner, self.file()) {
            Ok(node) => node,
            Err(e) => {
                return match env_form(inner) {
                    Some((name, default)) => Ok(self
                        .env_var(name)
                        .unwrap_or_else(|| default.to_string())),
                    None => Err(EvalError::Interpolation(format!(
                        "cannot parse '{}': {}",
                        inner, e.message
                    ))),
                };
            }
        };
        Ok(self.eval_value(&node, env)?.to_string())
    }
}
