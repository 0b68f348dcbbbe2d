// crates/bcl/src/evaluator/tests/test_access.rs

use super::test_utils::{eval_doc, eval_err, eval_expr, get};
use crate::engine::Engine;
use crate::evaluator::{EngineConfig, EvalError};
use crate::value::Value;
use pretty_assertions::assert_eq;

const SERVERS: &str = "server \"main\" { port = 8080 }\nserver \"backup\" { port = 9090 }\n";

#[test]
fn test_labeled_block_reachable_by_type_and_label() {
    let vars = eval_doc(&format!(
        "{SERVERS}a = server.main.port\nb = main.port\nc = server.backup.port"
    ));
    assert_eq!(vars["a"], Value::Int(8080));
    assert_eq!(vars["b"], Value::Int(8080));
    assert_eq!(vars["c"], Value::Int(9090));
    assert_eq!(get(&vars, "server.main.port"), &Value::Int(8080));
}

#[test]
fn test_map_member() {
    let vars = eval_doc("m = { a = { b = 2 } }\nv = m.a.b\nw = m.nope");
    assert_eq!(vars["v"], Value::Int(2));
    assert_eq!(vars["w"], Value::Undefined);
}

#[test]
fn test_environment_value_wins_over_map_entry() {
    let vars = eval_doc("a = { main = 1 }\nserver \"main\" { port = 1 }\nn = a.main.name");
    assert_eq!(vars["n"], Value::str("main"));

    let vars = eval_doc("a = { x = 1 }\nx = 2\nv = a.x");
    assert_eq!(vars["v"], Value::Int(2));

    let vars = eval_doc("a = { main = 1 }\nv = a.main");
    assert_eq!(vars["v"], Value::Int(1));
}

#[test]
fn test_single_entry_wrapper_reaches_block_props() {
    let vars = eval_doc(&format!("{SERVERS}x = main\np = x.port"));
    assert!(vars["x"].as_map().is_some_and(|m| m.contains_key("x")));
    assert_eq!(vars["p"], Value::Int(8080));
}

#[test]
fn test_list_of_blocks_by_label() {
    let vars = eval_doc(&format!(
        "{SERVERS}all = [main, backup]\np = all.backup.port\nq = all.other"
    ));
    assert_eq!(vars["p"], Value::Int(9090));
    assert_eq!(vars["q"], Value::Undefined);
}

#[test]
fn test_undefined_chains_stay_undefined() {
    assert_eq!(eval_expr("missing.x"), Value::Undefined);
    assert_eq!(eval_expr("missing.x.y"), Value::Undefined);
    assert_eq!(eval_expr("missing.x ?? 3"), Value::Int(3));
}

#[test]
fn test_dot_on_scalars_is_an_error() {
    assert!(matches!(
        eval_err("n = 1\nv = n.x").root(),
        EvalError::DotAccess("int")
    ));
    assert!(matches!(
        eval_err("l = [1, 2]\nv = l.x").root(),
        EvalError::DotAccess("list")
    ));
}

#[test]
fn test_env_marker_member_with_default() {
    let mut config = EngineConfig::default();
    config.env_overrides.insert("BCL_ACCESS_SET".into(), "yes".into());
    let engine = Engine::new(config);
    let vars = engine
        .eval_str(
            "a = env.BCL_ACCESS_SET\n\
             b = env.\"BCL_ACCESS_UNSET:fallback\"\n\
             c = env.BCL_ACCESS_UNSET",
        )
        .unwrap();
    assert_eq!(vars["a"], Value::str("yes"));
    assert_eq!(vars["b"], Value::str("fallback"));
    assert_eq!(vars["c"], Value::str(""));
}
