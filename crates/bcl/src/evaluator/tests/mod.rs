// crates/bcl/src/evaluator/tests/mod.rs
mod test_access;
mod test_eval;
