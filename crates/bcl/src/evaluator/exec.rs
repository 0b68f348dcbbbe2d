// crates/bcl/src/evaluator/exec.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use super::core::Evaluator;
use super::env::Environment;
use super::errors::{EvalError, EvalResult};
use crate::ast::Exec;
use crate::value::Value;

/// Runs `@exec` commands.
pub trait CommandRunner: Send + Sync {
    /// Returns stdout followed by stderr, or a message on failure.
    fn run(&self, cmd: &str, args: &[String], dir: Option<&Path>) -> Result<String, String>;
}

/// Spawns a real subprocess.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &str, args: &[String], dir: Option<&Path>) -> Result<String, String> {
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        let output = command
            .output()
            .map_err(|e| format!("failed to start '{}': {}", cmd, e))?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(format!(
                "'{}' exited with {}: {}",
                cmd,
                output.status,
                combined.trim_end()
            ));
        }
        Ok(combined)
    }
}

impl Evaluator<'_> {
    pub(super) fn eval_exec(&self, exec: &Exec, env: &mut Environment<'_>) -> EvalResult<Value> {
        if !self.engine().config().allow_exec {
            return Err(EvalError::ExecDisabled);
        }
        let cmd = match self.eval_value(&exec.cmd, env)? {
            Value::Str(s) if !s.trim().is_empty() => s,
            other => {
                return Err(EvalError::Exec(format!(
                    "cmd must be a non-empty string, got {}",
                    other.type_name()
                )));
            }
        };
        let args = match &exec.args {
            None => Vec::new(),
            Some(node) => match self.eval_value(node, env)? {
                Value::List(items) => items.iter().map(|v| v.to_string()).collect(),
                Value::Null | Value::Undefined => Vec::new(),
                other => vec![other.to_string()],
            },
        };
        let dir = match &exec.dir {
            None => None,
            Some(node) => match self.eval_value(node, env)? {
                Value::Str(s) => Some(self.resolve_dir(&s)),
                Value::Null | Value::Undefined => None,
                other => {
                    return Err(EvalError::Exec(format!(
                        "dir must be a string, got {}",
                        other.type_name()
                    )));
                }
            },
        };
        debug!("exec {} {:?} in {:?}", cmd, args, dir);
        self.engine()
            .runner()
            .run(&cmd, &args, dir.as_deref())
            .map(Value::Str)
            .map_err(EvalError::Exec)
    }

    fn resolve_dir(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }
}
