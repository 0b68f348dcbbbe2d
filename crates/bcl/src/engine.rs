// crates/bcl/src/engine.rs

//! The engine owns the shared registries. A default instance backs the
//! free functions at the crate root.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;

use crate::ast::Node;
use crate::errors::{BclError, ParseError};
use crate::evaluator::{
    BuiltinFn, CommandRunner, DefaultFetcher, EngineConfig, Environment, EvalResult, Evaluator,
    FunctionRegistry, IncludeCache, IncludeFetcher, RegistryError, SystemRunner,
};
use crate::parser::{Parser, parse_expression_str};
use crate::value::{Map, Value};

pub struct Engine {
    config: EngineConfig,
    functions: FunctionRegistry,
    includes: IncludeCache,
    fetcher: Box<dyn IncludeFetcher>,
    runner: Box<dyn CommandRunner>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            config,
            functions: FunctionRegistry::with_builtins(),
            includes: IncludeCache::new(),
            fetcher: Box::new(DefaultFetcher),
            runner: Box::new(SystemRunner),
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl IncludeFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn include_cache(&self) -> &IncludeCache {
        &self.includes
    }

    pub fn fetcher(&self) -> &dyn IncludeFetcher {
        self.fetcher.as_ref()
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn register_function<F>(&self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.register(name, f)
    }

    pub fn lookup_function(&self, name: &str) -> Option<BuiltinFn> {
        self.functions.lookup(name)
    }

    pub fn clear_include_cache(&self) {
        self.includes.clear();
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(self)
    }

    pub fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError> {
        self.parse_named(source, "<input>")
    }

    /// `name` labels diagnostics only.
    pub fn parse_named(&self, source: &str, name: &str) -> Result<Vec<Node>, ParseError> {
        Parser::new(source, name)?.parse()
    }

    pub fn parse_file(&self, path: &Path) -> Result<Vec<Node>, BclError> {
        let source = read_source(path)?;
        Ok(self.parse_named(&source, &path.display().to_string())?)
    }

    pub fn eval_document(&self, nodes: &[Node]) -> EvalResult<Map> {
        self.evaluator().evaluate_document(nodes)
    }

    /// Parse and evaluate an in-memory document.
    pub fn eval_str(&self, source: &str) -> Result<Map, BclError> {
        let nodes = self.parse(source)?;
        Ok(self.eval_document(&nodes)?)
    }

    /// Parse and evaluate a file; its includes resolve beside it.
    pub fn eval_file(&self, path: &Path) -> Result<Map, BclError> {
        let nodes = self.parse_file(path)?;
        Ok(Evaluator::for_file(self, path).evaluate_document(&nodes)?)
    }

    /// Evaluate one expression in value position against `env`.
    pub fn eval_expression(&self, text: &str, env: &mut Environment<'_>) -> Result<Value, BclError> {
        let node = parse_expression_str(text, "<expr>")?;
        Ok(self.evaluator().eval_value(&node, env)?)
    }
}

pub(crate) fn read_source(path: &Path) -> Result<String, BclError> {
    fs::read_to_string(path).map_err(|source| BclError::Io {
        path: path.to_path_buf(),
        source,
    })
}

lazy_static! {
    static ref DEFAULT_ENGINE: Engine = Engine::default();
}

/// The engine behind the crate-level convenience functions.
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

pub fn parse(source: &str) -> Result<Vec<Node>, ParseError> {
    default_engine().parse(source)
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Node>, BclError> {
    default_engine().parse_file(path.as_ref())
}

pub fn eval_str(source: &str) -> Result<Map, BclError> {
    default_engine().eval_str(source)
}

pub fn eval_document(nodes: &[Node]) -> EvalResult<Map> {
    default_engine().eval_document(nodes)
}

pub fn register_function<F>(name: &str, f: F) -> Result<(), RegistryError>
where
    F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
{
    default_engine().register_function(name, f)
}

pub fn lookup_function(name: &str) -> Option<BuiltinFn> {
    default_engine().lookup_function(name)
}

pub fn clear_include_cache() {
    default_engine().clear_include_cache()
}

pub fn new_environment() -> Environment<'static> {
    Environment::new()
}

impl Node {
    /// Evaluate against `env` with the default engine.
    pub fn eval(&self, env: &mut Environment<'_>) -> EvalResult<Value> {
        default_engine().evaluator().eval(self, env)
    }
}
