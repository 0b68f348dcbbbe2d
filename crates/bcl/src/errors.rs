// crates/bcl/src/errors.rs

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::evaluator::EvalError;

/// A lexing or parsing failure. Parsing never recovers, so one of these
/// aborts the whole document.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// The offending source line, without its newline.
    pub context: String,
}

impl ParseError {
    pub fn new(
        message: impl Into<String>,
        file: &str,
        line: usize,
        column: usize,
        source: &str,
    ) -> Self {
        let context = source
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or("")
            .to_string();
        ParseError {
            message: message.into(),
            file: file.to_string(),
            line,
            column,
            context,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.line, self.column, self.message
        )?;
        if !self.context.is_empty() {
            let caret = " ".repeat(self.column.saturating_sub(1));
            write!(f, "\n    | {}\n    | {}^", self.context, caret)?;
        }
        Ok(())
    }
}

/// Crate-level error returned by the engine's file API and the parallel
/// front ends.
#[derive(Error, Debug)]
pub enum BclError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConcurrencyError {
    #[error("Cancelled before {skipped} item(s) were dispatched")]
    Cancelled { skipped: usize },

    #[error("Not dispatched: the run was cancelled")]
    NotDispatched,

    #[error("Worker panicked while processing {item}")]
    WorkerPanic { item: String },
}

/// Independent failures collected by the parallel front ends, in the order
/// they were drained.
#[derive(Error, Debug, Default)]
pub struct MultiError {
    pub errors: Vec<BclError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: impl Into<BclError>) {
        self.errors.push(err.into());
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BclError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), MultiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) occurred", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            write!(f, "\n  [{}] {}", i + 1, err)?;
        }
        Ok(())
    }
}
