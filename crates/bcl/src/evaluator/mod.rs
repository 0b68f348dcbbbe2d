// crates/bcl/src/evaluator/mod.rs

pub mod access;
pub mod builtins;
pub mod core;
pub mod env;
pub mod errors;
pub mod exec;
pub mod include;
pub mod interpolate;
pub mod ops;
pub mod pipeline;
pub mod state;

#[cfg(test)]
mod tests;

pub use builtins::{BuiltinFn, FunctionRegistry, default_builtins};
pub use self::core::Evaluator;
pub use env::Environment;
pub use errors::{EvalError, EvalResult, RegistryError};
pub use exec::{CommandRunner, SystemRunner};
pub use include::{DefaultFetcher, IncludeCache, IncludeFetcher};
pub use state::EngineConfig;
