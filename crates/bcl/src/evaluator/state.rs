// crates/bcl/src/evaluator/state.rs

use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker threads for the parallel front ends; 0 means one per core.
    pub workers: usize,
    /// Capacity of the bounded work channel.
    pub queue_capacity: usize,
    pub allow_exec: bool,
    pub allow_remote_includes: bool,
    /// Searched, in order, when a relative include is not found beside the
    /// including file.
    pub include_paths: Vec<PathBuf>,
    /// Consulted before the process environment for `env.NAME` lookups.
    pub env_overrides: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 64,
            allow_exec: true,
            allow_remote_includes: true,
            include_paths: Vec::new(),
            env_overrides: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Override first, then the process environment. Empty counts as unset.
    pub fn env_var(&self, name: &str) -> Option<String> {
        if let Some(v) = self.env_overrides.get(name) {
            return Some(v.clone()).filter(|v| !v.is_empty());
        }
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}
