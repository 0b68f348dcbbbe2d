// crates/bcl/src/lib.rs

//! Block configuration language: lexer, Pratt parser, tree-walking
//! evaluator and parallel front ends.

mod types;
pub use types::*;

pub mod ast;
pub mod concurrent;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::Node;
pub use concurrent::{BatchEvaluator, BatchResult, CancelToken, ConcurrentParser, ParsedDocument};
pub use engine::{
    Engine, clear_include_cache, default_engine, eval_document, eval_str, lookup_function,
    new_environment, parse, parse_file, register_function,
};
pub use errors::{BclError, ConcurrencyError, MultiError, ParseError};
pub use evaluator::{EngineConfig, Environment, EvalError, Evaluator, RegistryError};
pub use lexer::Lexer;
pub use parser::Parser;
pub use value::{Map, Value};
