// crates/bcl/src/evaluator/include.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use super::core::Evaluator;
use super::env::Environment;
use super::errors::{EvalError, EvalResult};
use crate::ast::{Include, Node};
use crate::parser::parse_str;
use crate::value::{Map, Value};

/// Parsed include targets, keyed by resolved path or URL. Entries live until
/// `clear`; on-disk changes are not noticed.
#[derive(Default)]
pub struct IncludeCache {
    entries: Mutex<HashMap<String, Arc<Vec<Node>>>>,
}

impl IncludeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<Node>>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, nodes: Arc<Vec<Node>>) {
        self.entries.lock().insert(key.into(), nodes);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Loads include targets.
pub trait IncludeFetcher: Send + Sync {
    fn read_file(&self, path: &Path) -> Result<String, String>;
    fn http_get(&self, url: &str) -> Result<String, String>;
}

/// Local files through `std::fs`, remote targets through `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFetcher;

impl IncludeFetcher for DefaultFetcher {
    fn read_file(&self, path: &Path) -> Result<String, String> {
        fs::read_to_string(path).map_err(|e| e.to_string())
    }

    fn http_get(&self, url: &str) -> Result<String, String> {
        let response = ureq::get(url).call().map_err(|e| e.to_string())?;
        response.into_string().map_err(|e| e.to_string())
    }
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Where an include target was found.
enum Resolved {
    File(PathBuf),
    Url(String),
}

impl Resolved {
    fn key(&self) -> String {
        match self {
            Resolved::File(p) => p.to_string_lossy().into_owned(),
            Resolved::Url(u) => u.clone(),
        }
    }
}

impl Evaluator<'_> {
    pub(super) fn eval_include(
        &self,
        include: &Include,
        env: &mut Environment<'_>,
    ) -> EvalResult<Value> {
        let target = match self.eval_value(&include.target, env)? {
            Value::Str(s) => s,
            other => {
                return Err(EvalError::Include {
                    target: other.to_string(),
                    message: format!("target must be a string, got {}", other.type_name()),
                });
            }
        };
        let resolved = self.resolve_include(&target)?;
        let key = resolved.key();
        if self.include_stack().iter().any(|k| *k == key) {
            return Err(EvalError::CircularInclude(key));
        }
        let nested = self.nested(&resolved_file(&resolved), &key);

        if let Some(nodes) = self.engine().include_cache().get(&key) {
            debug!("include cache hit: {}", key);
            let vars = {
                let mut scope = env.child();
                nested.eval_nodes(&nodes, &mut scope)?;
                scope.into_vars()
            };
            env.extend(&vars);
            return Ok(Value::Map(vars));
        }

        debug!("include cache miss: {}", key);
        let source = match &resolved {
            Resolved::File(path) => self.engine().fetcher().read_file(path),
            Resolved::Url(url) => self.engine().fetcher().http_get(url),
        }
        .map_err(|message| EvalError::Include {
            target: target.clone(),
            message,
        })?;
        let nodes = Arc::new(parse_str(&source, &key)?);

        let mut fresh = Environment::new();
        nested.eval_nodes(&nodes, &mut fresh)?;
        let vars: Map = fresh.into_vars();
        env.extend(&vars);
        self.engine().include_cache().set(key, nodes);
        Ok(Value::Map(vars))
    }

    /// Absolute path, then beside the including file, then `include_paths`.
    fn resolve_include(&self, target: &str) -> EvalResult<Resolved> {
        if is_remote(target) {
            if !self.engine().config().allow_remote_includes {
                return Err(EvalError::Include {
                    target: target.to_string(),
                    message: "remote includes are disabled".into(),
                });
            }
            return Ok(Resolved::Url(target.to_string()));
        }
        let path = Path::new(target);
        let candidates: Vec<PathBuf> = if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            std::iter::once(self.base_dir().join(path))
                .chain(
                    self.engine()
                        .config()
                        .include_paths
                        .iter()
                        .map(|dir| dir.join(path)),
                )
                .collect()
        };
        candidates
            .into_iter()
            .find(|p| p.is_file())
            .map(|p| Resolved::File(fs::canonicalize(&p).unwrap_or(p)))
            .ok_or_else(|| EvalError::Include {
                target: target.to_string(),
                message: "file not found".into(),
            })
    }
}

fn resolved_file(resolved: &Resolved) -> PathBuf {
    match resolved {
        Resolved::File(p) => p.clone(),
        Resolved::Url(u) => PathBuf::from(u),
    }
}
