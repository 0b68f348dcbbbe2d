// crates/bcl/src/evaluator/errors.rs

use thiserror::Error;

use crate::errors::ParseError;
use crate::types::Position;

#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("Type error: {0}")]
    Type(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Logical operator '{op}' requires boolean operands, got {left} and {right}")]
    Logical {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Dot access on non-map type {0}")]
    DotAccess(&'static str),

    #[error("Tuple index {index} out of bounds for length {len}")]
    TupleIndex { index: usize, len: usize },

    #[error("Interpolation error: {0}")]
    Interpolation(String),

    #[error("Function '{name}' failed: {message}")]
    Function { name: String, message: String },

    #[error("Include '{target}' failed: {message}")]
    Include { target: String, message: String },

    #[error("Circular include: {0}")]
    CircularInclude(String),

    #[error("Exec failed: {0}")]
    Exec(String),

    #[error("@exec is disabled")]
    ExecDisabled,

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{file}:{line}:{column}: {source}")]
    At {
        file: String,
        line: usize,
        column: usize,
        source: Box<EvalError>,
    },
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    /// Attach a statement position. Only the innermost position is kept.
    pub fn at(self, file: &str, pos: Position) -> Self {
        match self {
            EvalError::At { .. } | EvalError::Parse(_) => self,
            other => EvalError::At {
                file: file.to_string(),
                line: pos.line,
                column: pos.column,
                source: Box::new(other),
            },
        }
    }

    /// The error without its position wrapper.
    pub fn root(&self) -> &EvalError {
        match self {
            EvalError::At { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<String> for EvalError {
    fn from(s: String) -> Self {
        EvalError::Type(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Function name must not be empty")]
    EmptyName,

    #[error("Function '{0}' is already registered")]
    AlreadyRegistered(String),
}
