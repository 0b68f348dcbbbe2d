// crates/bcl/src/concurrent.rs

//! Worker-pool front ends: parse many documents or evaluate many
//! expressions in parallel, each on its own environment.
//!
//! A dispatcher feeds a bounded channel, workers drain it and report on an
//! unbounded result channel. Cancellation is checked before each send and
//! before each receive; an item already taken runs to completion.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam::channel;
use log::{info, warn};

use crate::engine::{Engine, read_source};
use crate::errors::{BclError, ConcurrencyError, MultiError};
use crate::evaluator::{Environment, Evaluator};
use crate::parser::parse_str;
use crate::value::{Map, Value};

/// Cooperative cancellation flag shared by clones.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct PoolOutcome<R> {
    /// `(input index, result)` in completion order.
    results: Vec<(usize, R)>,
    /// Input indices that were never handed to a worker.
    skipped: Vec<usize>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs `work` over `items` on `workers` threads. A panicking item becomes
/// `on_panic(index, message)` instead of tearing down the pool.
fn run_pool<T, R, F, P>(
    items: Vec<T>,
    workers: usize,
    capacity: usize,
    cancel: &CancelToken,
    work: F,
    on_panic: P,
) -> PoolOutcome<R>
where
    T: Send,
    R: Send,
    F: Fn(usize, T) -> R + Sync,
    P: Fn(usize, String) -> R + Sync,
{
    let total = items.len();
    let workers = workers.clamp(1, total.max(1));
    let (work_tx, work_rx) = channel::bounded::<(usize, T)>(capacity.max(1));
    let (result_tx, result_rx) = channel::unbounded::<(usize, R)>();

    let dispatched = thread::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let (work, on_panic) = (&work, &on_panic);
            scope.spawn(move || {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Ok((index, item)) = work_rx.recv() else {
                        break;
                    };
                    let result = catch_unwind(AssertUnwindSafe(|| work(index, item)))
                        .unwrap_or_else(|payload| on_panic(index, panic_message(payload.as_ref())));
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);
        drop(work_rx);

        let mut dispatched = 0;
        for (index, item) in items.into_iter().enumerate() {
            if cancel.is_cancelled() || work_tx.send((index, item)).is_err() {
                break;
            }
            dispatched += 1;
        }
        drop(work_tx);
        dispatched
    });

    let results: Vec<(usize, R)> = result_rx.into_iter().collect();
    let mut done = vec![false; total];
    for (index, _) in &results {
        done[*index] = true;
    }
    let skipped: Vec<usize> = (0..total).filter(|i| !done[*i]).collect();
    info!(
        "pool: {} item(s), {} dispatched, {} completed, {} worker(s)",
        total,
        dispatched,
        results.len(),
        workers
    );
    if !skipped.is_empty() {
        warn!("pool cancelled: {} item(s) not processed", skipped.len());
    }
    PoolOutcome { results, skipped }
}

/// A document handled by [`ConcurrentParser`].
#[derive(Debug)]
pub struct ParsedDocument {
    pub name: String,
    pub result: Result<Map, BclError>,
}

/// Parses and evaluates independent documents in parallel.
pub struct ConcurrentParser<'e> {
    engine: &'e Engine,
    cancel: CancelToken,
}

impl<'e> ConcurrentParser<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        ConcurrentParser {
            engine,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// One entry per input: completed documents in completion order, then
    /// anything cancellation kept from being dispatched.
    pub fn parse_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<ParsedDocument> {
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let engine = self.engine;
        let outcome = self.run(
            paths,
            |path: PathBuf| -> Result<Map, BclError> {
                let source = read_source(&path)?;
                let nodes = parse_str(&source, &path.display().to_string())?;
                Ok(Evaluator::for_file(engine, &path).evaluate_document(&nodes)?)
            },
        );
        collect_documents(outcome, &names)
    }

    /// Same as [`parse_files`](Self::parse_files) for in-memory
    /// `(name, source)` pairs.
    pub fn parse_sources(&self, sources: &[(&str, &str)]) -> Vec<ParsedDocument> {
        let names: Vec<String> = sources.iter().map(|(n, _)| n.to_string()).collect();
        let engine = self.engine;
        let outcome = self.run(
            sources.to_vec(),
            |(name, source): (&str, &str)| -> Result<Map, BclError> {
                let nodes = parse_str(source, name)?;
                Ok(engine.evaluator().evaluate_document(&nodes)?)
            },
        );
        collect_documents(outcome, &names)
    }

    /// Unions every document's variables into one map. Any failure, or
    /// cancellation, yields a [`MultiError`] instead.
    pub fn parse_and_merge<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Map, MultiError> {
        merge_documents(self.parse_files(paths))
    }

    pub fn merge_sources(&self, sources: &[(&str, &str)]) -> Result<Map, MultiError> {
        merge_documents(self.parse_sources(sources))
    }

    fn run<T, F>(&self, items: Vec<T>, work: F) -> PoolOutcome<Result<Map, BclError>>
    where
        T: Send,
        F: Fn(T) -> Result<Map, BclError> + Sync,
    {
        let config = self.engine.config();
        run_pool(
            items,
            config.worker_count(),
            config.queue_capacity,
            &self.cancel,
            |_, item| work(item),
            |index, message| {
                Err(BclError::Concurrency(ConcurrencyError::WorkerPanic {
                    item: format!("#{}: {}", index, message),
                }))
            },
        )
    }
}

fn collect_documents(
    outcome: PoolOutcome<Result<Map, BclError>>,
    names: &[String],
) -> Vec<ParsedDocument> {
    let mut docs: Vec<ParsedDocument> = outcome
        .results
        .into_iter()
        .map(|(index, result)| ParsedDocument {
            name: names[index].clone(),
            result,
        })
        .collect();
    docs.extend(outcome.skipped.into_iter().map(|index| ParsedDocument {
        name: names[index].clone(),
        result: Err(ConcurrencyError::NotDispatched.into()),
    }));
    docs
}

fn merge_documents(docs: Vec<ParsedDocument>) -> Result<Map, MultiError> {
    let mut merged = Map::new();
    let mut errors = MultiError::new();
    let mut skipped = 0;
    for doc in docs {
        match doc.result {
            Ok(vars) => merged.extend(vars),
            Err(BclError::Concurrency(ConcurrencyError::NotDispatched)) => skipped += 1,
            Err(e) => errors.push(e),
        }
    }
    if skipped > 0 {
        errors.push(ConcurrencyError::Cancelled { skipped });
    }
    errors.into_result().map(|()| merged)
}

/// Result slot for one expression, at the same index as its input.
#[derive(Debug)]
pub struct BatchResult {
    pub index: usize,
    pub expression: String,
    pub result: Result<Value, BclError>,
}

/// Evaluates independent expressions in parallel, each in its own child of
/// a shared read-only base scope.
pub struct BatchEvaluator<'e> {
    engine: &'e Engine,
    base: Map,
    cancel: CancelToken,
}

impl<'e> BatchEvaluator<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        BatchEvaluator {
            engine,
            base: Map::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Variables every expression can see.
    pub fn with_vars(mut self, vars: Map) -> Self {
        self.base = vars;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// One result per input, ordered by input index.
    pub fn evaluate<S: AsRef<str> + Sync>(&self, expressions: &[S]) -> Vec<BatchResult> {
        let base = Environment::with_vars(self.base.clone());
        let engine = self.engine;
        let config = engine.config();
        let items: Vec<&str> = expressions.iter().map(|e| e.as_ref()).collect();
        let outcome = run_pool(
            items,
            config.worker_count(),
            config.queue_capacity,
            &self.cancel,
            |_, expr: &str| {
                let mut env = base.child();
                engine.eval_expression(expr, &mut env)
            },
            |index, message| {
                Err(BclError::Concurrency(ConcurrencyError::WorkerPanic {
                    item: format!("#{}: {}", index, message),
                }))
            },
        );

        let mut slots: Vec<Option<Result<Value, BclError>>> =
            (0..expressions.len()).map(|_| None).collect();
        for (index, result) in outcome.results {
            slots[index] = Some(result);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| BatchResult {
                index,
                expression: expressions[index].as_ref().to_string(),
                result: slot.unwrap_or_else(|| Err(ConcurrencyError::NotDispatched.into())),
            })
            .collect()
    }

    /// Values in input order, or every failure at once.
    pub fn evaluate_all<S: AsRef<str> + Sync>(
        &self,
        expressions: &[S],
    ) -> Result<Vec<Value>, MultiError> {
        let mut values = Vec::with_capacity(expressions.len());
        let mut errors = MultiError::new();
        let mut skipped = 0;
        for item in self.evaluate(expressions) {
            match item.result {
                Ok(v) => values.push(v),
                Err(BclError::Concurrency(ConcurrencyError::NotDispatched)) => skipped += 1,
                Err(e) => errors.push(e),
            }
        }
        if skipped > 0 {
            errors.push(ConcurrencyError::Cancelled { skipped });
        }
        errors.into_result().map(|()| values)
    }
}
