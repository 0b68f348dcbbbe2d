// crates/bcl/src/evaluator/core.rs

use std::path::{Path, PathBuf};

use log::trace;

use super::env::Environment;
use super::errors::{EvalError, EvalResult};
use super::ops;
use crate::ast::{
    Arrow, Assignment, Block, BlockContainer, BinaryOp, Control, FunctionCall, Node, Primitive,
};
use crate::engine::Engine;
use crate::value::{Map, Value, is_block_map};

/// Evaluates nodes against an environment. One evaluator per source file:
/// it knows where relative includes resolve and which includes are open.
pub struct Evaluator<'e> {
    engine: &'e Engine,
    file: String,
    base_dir: PathBuf,
    include_stack: Vec<String>,
}

impl<'e> Evaluator<'e> {
    /// For in-memory sources; includes resolve against the working directory.
    pub fn new(engine: &'e Engine) -> Self {
        Evaluator {
            engine,
            file: "<input>".to_string(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            include_stack: Vec::new(),
        }
    }

    pub fn for_file(engine: &'e Engine, path: &Path) -> Self {
        let key = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned();
        let mut evaluator = Self::new(engine);
        evaluator.nest_into(path, key);
        evaluator
    }

    /// Evaluator for an included file, with `key` pushed onto the chain.
    pub(super) fn nested(&self, path: &Path, key: &str) -> Evaluator<'e> {
        let mut evaluator = Evaluator {
            engine: self.engine,
            file: self.file.clone(),
            base_dir: self.base_dir.clone(),
            include_stack: self.include_stack.clone(),
        };
        evaluator.nest_into(path, key.to_string());
        evaluator
    }

    fn nest_into(&mut self, path: &Path, key: String) {
        self.file = path.display().to_string();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            self.base_dir = dir.to_path_buf();
        }
        self.include_stack.push(key);
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub(super) fn include_stack(&self) -> &[String] {
        &self.include_stack
    }

    /// Evaluate a document into a fresh root scope and return its variables.
    pub fn evaluate_document(&self, nodes: &[Node]) -> EvalResult<Map> {
        let mut env = Environment::new();
        self.eval_nodes(nodes, &mut env)?;
        Ok(env.into_vars())
    }

    /// Evaluate statements in order; errors carry the failing statement's
    /// position.
    pub fn eval_nodes(&self, nodes: &[Node], env: &mut Environment<'_>) -> EvalResult<()> {
        for node in nodes {
            trace!("eval {}", node.render(0));
            if let Err(e) = self.eval(node, env) {
                return Err(match node.pos() {
                    Some(pos) => e.at(&self.file, pos),
                    None => e,
                });
            }
        }
        Ok(())
    }

    pub fn eval(&self, node: &Node, env: &mut Environment<'_>) -> EvalResult<Value> {
        match node {
            Node::Assignment(a) => self.eval_assignment(a, env).map(Value::Map),
            Node::MultiAssignment(m) => {
                // `a, b = f()` destructures one result: the shared source
                // runs once.
                let mut merged = Map::new();
                let mut shared: Option<(&Node, EvalResult<Value>)> = None;
                for target in &m.targets {
                    let vars = match target.value.as_ref() {
                        Node::TupleExtract { source, index } => {
                            let whole = match &shared {
                                Some((cached, result)) if *cached == source.as_ref() => {
                                    result.clone()
                                }
                                _ => {
                                    let result = self.eval(source, env);
                                    shared = Some((source.as_ref(), result.clone()));
                                    result
                                }
                            };
                            let extracted = whole.and_then(|v| extract(v, *index));
                            self.bind_extracted(target, extracted, env)?
                        }
                        _ => self.eval_assignment(target, env)?,
                    };
                    merged.extend(vars);
                }
                Ok(Value::Map(merged))
            }
            Node::Block(b) => self.eval_block(b, env),
            Node::BlockContainer(c) => self.eval_container(c, env),
            Node::Arrow(a) => self.eval_arrow(a, env),
            Node::Map(m) => self.eval_scope(&m.entries, env).map(Value::Map),
            Node::CombinedMap(m) => {
                let (blocks, entries): (Vec<&Node>, Vec<&Node>) = m
                    .items
                    .iter()
                    .partition(|n| matches!(n, Node::Block(_) | Node::BlockContainer(_)));
                let mut scope = env.child();
                for item in entries.into_iter().chain(blocks) {
                    self.eval(item, &mut scope)?;
                }
                Ok(Value::Map(scope.into_vars()))
            }
            Node::Slice(items) => items
                .iter()
                .map(|item| self.eval_value(item, env))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List),
            Node::Primitive(p) => self.eval_primitive(p, env),
            Node::Identifier(name) if name == "env" => Ok(Value::EnvMarker),
            Node::Identifier(name) => Ok(env.lookup(name)),
            Node::DotAccess { left, member } => self.eval_dot_access(left, member, env),
            Node::Arithmetic { op, left, right } => self.eval_binary(*op, left, right, env),
            Node::Unary { op, operand } => {
                let v = self.eval_value(operand, env)?;
                ops::unary(*op, &v)
            }
            Node::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval(condition, env)?;
                let taken = match &cond {
                    Value::Bool(b) => *b,
                    Value::Tuple(items) | Value::List(items)
                        if items.len() == 2 && matches!(items[0], Value::Bool(_)) =>
                    {
                        items[0] == Value::Bool(true)
                    }
                    other => {
                        return Err(EvalError::Type(format!(
                            "ternary condition must be a boolean, got {}",
                            other.type_name()
                        )));
                    }
                };
                if taken {
                    self.eval_value(then_branch, env)
                } else {
                    self.eval_value(else_branch, env)
                }
            }
            Node::Group(inner) => self.eval(inner, env),
            Node::FunctionCall(call) => self.eval_call(call, env),
            Node::EnvInterpolation { name, default } => Ok(Value::Str(
                self.env_var(name)
                    .or_else(|| default.clone())
                    .unwrap_or_default(),
            )),
            Node::Include(inc) => self.eval_include(inc, env),
            Node::Comment(_) => Ok(Value::Undefined),
            Node::Control(c) => self.eval_control(c, env),
            Node::Pipeline(p) => self.eval_pipeline(p, env),
            Node::Exec(e) => self.eval_exec(e, env),
            Node::TupleExtract { source, index } => extract(self.eval(source, env)?, *index),
        }
    }

    /// Evaluate in value position: a call result `[v, null]` becomes `v`,
    /// `[_, err]` becomes an error.
    pub fn eval_value(&self, node: &Node, env: &mut Environment<'_>) -> EvalResult<Value> {
        let value = self.eval(node, env)?;
        unwrap_call(node, value)
    }

    pub(super) fn env_var(&self, name: &str) -> Option<String> {
        self.engine.config().env_var(name)
    }

    fn eval_primitive(&self, p: &Primitive, env: &mut Environment<'_>) -> EvalResult<Value> {
        Ok(match p {
            Primitive::Str { value, .. } if value.contains("${") => {
                Value::Str(self.interpolate(value, env)?)
            }
            Primitive::Str { value, .. } => Value::Str(value.clone()),
            Primitive::Int(i) => Value::Int(*i),
            Primitive::Float(f) => Value::Float(*f),
            Primitive::Bool(b) => Value::Bool(*b),
            Primitive::Null => Value::Null,
        })
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        env: &mut Environment<'_>,
    ) -> EvalResult<Value> {
        let l = self.eval_value(left, env)?;
        if op == BinaryOp::Coalesce {
            return if l.is_nullish() {
                self.eval_value(right, env)
            } else {
                Ok(l)
            };
        }
        let r = self.eval_value(right, env)?;
        ops::binary(op, &l, &r)
    }

    fn eval_call(&self, call: &FunctionCall, env: &mut Environment<'_>) -> EvalResult<Value> {
        let args = call
            .args
            .iter()
            .map(|arg| self.eval_value(arg, env))
            .collect::<EvalResult<Vec<_>>>()?;
        let f = self
            .engine
            .functions()
            .lookup(&call.name)
            .ok_or_else(|| EvalError::UnknownFunction(call.name.clone()))?;
        Ok(Value::call_result(f(&args)))
    }

    /// Child statements in a private scope; the scope's variables are the
    /// result.
    fn eval_scope(&self, body: &[Node], env: &Environment<'_>) -> EvalResult<Map> {
        let mut scope = env.child();
        self.eval_nodes(body, &mut scope)?;
        Ok(scope.into_vars())
    }

    fn eval_assignment(&self, a: &Assignment, env: &mut Environment<'_>) -> EvalResult<Map> {
        match a.value.as_ref() {
            Node::TupleExtract { .. } => {
                let extracted = self.eval(&a.value, env);
                self.bind_extracted(a, extracted, env)
            }
            other => {
                let value = self.eval(other, env)?;
                self.bind(a, value, env)
            }
        }
    }

    /// A failed extraction leaves the target unbound.
    fn bind_extracted(
        &self,
        a: &Assignment,
        extracted: EvalResult<Value>,
        env: &mut Environment<'_>,
    ) -> EvalResult<Map> {
        match extracted {
            Ok(value) => self.bind(a, value, env),
            Err(e) => {
                trace!("{} left unbound: {}", a.name, e);
                Ok(Map::new())
            }
        }
    }

    fn bind(&self, a: &Assignment, mut value: Value, env: &mut Environment<'_>) -> EvalResult<Map> {
        if let Value::Tuple(_) = value {
            value = unwrap_call(&a.value, value)?;
        }
        if value.is_block() {
            let mut wrapped = Map::new();
            wrapped.insert(a.name.clone(), value);
            value = Value::Map(wrapped);
        }
        env.set(a.name.clone(), value.clone());
        let mut result = Map::new();
        result.insert(a.name.clone(), value);
        Ok(result)
    }

    /// Registers the block under `vars[type][label]` and `vars[label]`.
    fn eval_block(&self, b: &Block, env: &mut Environment<'_>) -> EvalResult<Value> {
        let label = b.effective_label();
        let mut props = self.eval_scope(&b.body, env)?;
        props
            .entry("name".to_string())
            .or_insert_with(|| Value::str(label));
        let block = Value::block(&b.kind, label, props);

        let mut bucket = match env.get_local(&b.kind) {
            Some(Value::Map(m)) if !is_block_map(m) => m.clone(),
            _ => Map::new(),
        };
        bucket.insert(label.to_string(), block.clone());
        env.set(b.kind.clone(), Value::Map(bucket));
        env.set(label, block.clone());
        Ok(block)
    }

    fn eval_container(&self, c: &BlockContainer, env: &mut Environment<'_>) -> EvalResult<Value> {
        let vars = self.eval_scope(&c.body, env)?;
        env.set(c.kind.clone(), Value::Map(vars.clone()));
        Ok(Value::Map(vars))
    }

    /// Appends `{type, props}` to the list kept under the relation name.
    fn eval_arrow(&self, a: &Arrow, env: &mut Environment<'_>) -> EvalResult<Value> {
        let mut props = self.eval_scope(&a.body, env)?;
        props.insert("source".to_string(), Value::str(&a.source));
        props.insert("target".to_string(), Value::str(&a.target));
        let relation = a.relation();
        let mut record = Map::new();
        record.insert("type".to_string(), Value::str(relation));
        record.insert("props".to_string(), Value::Map(props));
        let record = Value::Map(record);

        let mut edges = match env.get_local(relation) {
            Some(Value::List(items)) => items.clone(),
            _ => Vec::new(),
        };
        edges.push(record.clone());
        env.set(relation, Value::List(edges));
        Ok(record)
    }

    /// Runs the first branch whose condition holds, in the current scope.
    fn eval_control(&self, c: &Control, env: &mut Environment<'_>) -> EvalResult<Value> {
        let mut link = Some(c);
        while let Some(control) = link {
            let taken = match &control.condition {
                None => true,
                Some(cond) => match self.eval_value(cond, env)? {
                    Value::Bool(b) => b,
                    other => {
                        return Err(EvalError::Type(format!(
                            "IF condition must be a boolean, got {}",
                            other.type_name()
                        )));
                    }
                },
            };
            if taken {
                self.eval_nodes(&control.body, env)?;
                return Ok(Value::Undefined);
            }
            link = control.else_branch.as_deref();
        }
        Ok(Value::Undefined)
    }
}

/// Element `index` of a tuple or list; any other value is its own element 0.
fn extract(value: Value, index: usize) -> EvalResult<Value> {
    match value {
        Value::Tuple(items) | Value::List(items) => {
            let len = items.len();
            items
                .into_iter()
                .nth(index)
                .ok_or(EvalError::TupleIndex { index, len })
        }
        other if index == 0 => Ok(other),
        _ => Err(EvalError::TupleIndex { index, len: 1 }),
    }
}

/// `[v, null]` from a call is `v`; a non-null error half is raised.
pub(super) fn unwrap_call(node: &Node, value: Value) -> EvalResult<Value> {
    match value {
        Value::Tuple(mut items) if items.len() == 2 => {
            let err = items.pop().unwrap_or(Value::Null);
            let v = items.pop().unwrap_or(Value::Null);
            if err.is_nullish() {
                Ok(v)
            } else {
                let name = match node {
                    Node::FunctionCall(call) => call.name.clone(),
                    _ => "call".to_string(),
                };
                Err(EvalError::Function {
                    name,
                    message: err.to_string(),
                })
            }
        }
        other => Ok(other),
    }
}
