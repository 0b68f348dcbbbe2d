// crates/bcl/src/evaluator/tests/test_eval.rs

use super::test_utils::{eval_doc, eval_err, eval_expr, expr_err};
use crate::engine::Engine;
use crate::evaluator::{EngineConfig, EvalError, Environment};
use crate::value::Value;
use pretty_assertions::assert_eq;

#[test]
fn test_precedence() {
    assert_eq!(eval_expr("2 + 3 * 4"), Value::Int(14));
    assert_eq!(eval_expr("(2 + 3) * 4"), Value::Int(20));
    assert_eq!(eval_expr("10 - 2 - 3"), Value::Int(5));
    assert_eq!(eval_expr("2 multiply 3 add 1"), Value::Int(7));
}

#[test]
fn test_division() {
    assert_eq!(eval_expr("10 / 4"), Value::Float(2.5));
    assert_eq!(eval_expr("10 / 5"), Value::Int(2));
    assert!(matches!(expr_err("10 / 0"), EvalError::DivisionByZero));
    assert!(matches!(expr_err("10 % 0"), EvalError::DivisionByZero));
}

#[test]
fn test_undefined_is_not_null() {
    assert_eq!(eval_expr("nothing"), Value::Undefined);
    assert_eq!(eval_expr("null"), Value::Null);
    assert_ne!(eval_expr("nothing"), eval_expr("null"));
    assert_eq!(eval_expr("isDefined(nothing)"), Value::Bool(false));
    assert_eq!(eval_expr("isDefined(null)"), Value::Bool(true));
}

#[test]
fn test_ternary_and_coalescing() {
    assert_eq!(eval_expr("false ? 1 : 2"), Value::Int(2));
    assert_eq!(eval_expr("true ? 1 : 2"), Value::Int(1));
    assert_eq!(eval_expr("null ?? 5"), Value::Int(5));
    assert_eq!(eval_expr("3 ?? 5"), Value::Int(3));
    assert_eq!(eval_expr("missing ?? \"d\""), Value::str("d"));
    assert!(matches!(expr_err("1 ? 2 : 3"), EvalError::Type(_)));
}

#[test]
fn test_coalesce_right_side_is_lazy() {
    assert_eq!(eval_expr("1 ?? (1 / 0)"), Value::Int(1));
}

#[test]
fn test_logical_operators_are_strict() {
    assert_eq!(eval_expr("true && !false"), Value::Bool(true));
    assert!(matches!(expr_err("1 || true"), EvalError::Logical { .. }));
    assert!(matches!(expr_err("!1"), EvalError::Type(_)));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_expr("\"v\" + 1 + 2"), Value::str("v12"));
    assert_eq!(eval_expr("1 + 2 + \"v\""), Value::str("3v"));
    assert!(matches!(expr_err("[1] + \"x\""), EvalError::Type(_)));
}

#[test]
fn test_interpolation() {
    let vars = eval_doc("name = \"X\"\ngreeting = \"hi ${name}\"\nsum = \"${1+2}\"");
    assert_eq!(vars["greeting"], Value::str("hi X"));
    assert_eq!(vars["sum"], Value::str("3"));
}

#[test]
fn test_interpolation_sees_live_scope_and_calls() {
    let vars = eval_doc(
        "user = \"ada\"\nmsg = \"${upper(user)}: ${missing}${user == \"ada\" ? \"!\" : \"?\"}\"",
    );
    assert_eq!(vars["msg"], Value::str("ADA: !"));
}

#[test]
fn test_interpolation_errors() {
    assert!(matches!(
        eval_err("x = \"${1 +}\""),
        EvalError::At { .. }
    ));
    assert!(matches!(
        eval_err("x = \"${1 +}\"").root(),
        EvalError::Interpolation(_)
    ));
    assert!(matches!(
        eval_err("x = <<E\n${open\nE\n").root(),
        EvalError::Interpolation(_)
    ));
}

#[test]
fn test_env_lookups_use_overrides() {
    let mut config = EngineConfig::default();
    config
        .env_overrides
        .insert("BCL_TEST_HOME".into(), "/home/test".into());
    let engine = Engine::new(config);
    let vars = engine
        .eval_str(
            "a = env.BCL_TEST_HOME\n\
             b = ${BCL_TEST_UNSET_VAR:fallback}\n\
             c = \"${env.BCL_TEST_HOME}/bin\"\n\
             d = \"${env.BCL_TEST_UNSET_VAR:none}\"",
        )
        .unwrap();
    assert_eq!(vars["a"], Value::str("/home/test"));
    assert_eq!(vars["b"], Value::str("fallback"));
    assert_eq!(vars["c"], Value::str("/home/test/bin"));
    assert_eq!(vars["d"], Value::str("none"));
}

#[test]
fn test_function_call_results() {
    let vars = eval_doc("a = upper(\"x\")\nn = length([1, 2, 3])\nr, e = toNumber(\"nope\")");
    assert_eq!(vars["a"], Value::str("X"));
    assert_eq!(vars["n"], Value::Int(3));
    assert_eq!(vars["r"], Value::Null);
    assert!(matches!(&vars["e"], Value::Str(msg) if msg.contains("toNumber")));
}

#[test]
fn test_raw_call_value_is_a_tuple() {
    let engine = Engine::default();
    let node = crate::parser::parse_expression_str("trim(\" a \")", "<test>").unwrap();
    let mut env = Environment::new();
    let raw = engine.evaluator().eval(&node, &mut env).unwrap();
    assert_eq!(raw, Value::Tuple(vec![Value::str("a"), Value::Null]));
}

#[test]
fn test_function_errors_surface_in_operators_and_assignment() {
    assert!(matches!(
        expr_err("1 + toNumber(\"x\")"),
        EvalError::Function { ref name, .. } if name == "toNumber"
    ));
    assert!(matches!(
        eval_err("x = toNumber(\"x\")").root(),
        EvalError::Function { .. }
    ));
}

#[test]
fn test_unknown_function() {
    assert!(matches!(
        expr_err("frobnicate(1)"),
        EvalError::UnknownFunction(ref n) if n == "frobnicate"
    ));
}

#[test]
fn test_custom_function_is_case_insensitive() {
    let engine = Engine::default();
    engine
        .register_function("Twice", |args| {
            Ok(Value::str(format!("{0}{0}", args.first().cloned().unwrap_or_default())))
        })
        .unwrap();
    let vars = engine.eval_str("x = TWICE(\"ab\")\ny = twice(3)").unwrap();
    assert_eq!(vars["x"], Value::str("abab"));
    assert_eq!(vars["y"], Value::str("33"));
}

#[test]
fn test_slices_evaluate_in_current_scope() {
    let vars = eval_doc("a = 1\nitems = [a, a + 1, upper(\"z\"), []]");
    assert_eq!(
        vars["items"],
        Value::List(vec![
            Value::Int(1),
            Value::Int(2),
            Value::str("Z"),
            Value::List(vec![]),
        ])
    );
}

#[test]
fn test_unary_minus() {
    assert_eq!(eval_expr("-(2 + 3)"), Value::Int(-5));
    assert_eq!(eval_expr("-\"2.5\""), Value::Float(-2.5));
}

#[test]
fn test_error_position_is_attached() {
    let err = eval_err("a = 1\nb = a / 0");
    let EvalError::At { line, column, .. } = &err else {
        panic!("expected a positioned error, got {:?}", err);
    };
    assert_eq!((*line, *column), (2, 1));
    assert!(matches!(err.root(), EvalError::DivisionByZero));
    assert!(err.to_string().contains("<input>:2:1"));
}

#[test]
fn test_node_eval_uses_default_engine() {
    let nodes = crate::parse("x = 40 + 2").unwrap();
    let mut env = crate::new_environment();
    nodes[0].eval(&mut env).unwrap();
    assert_eq!(env.lookup("x"), Value::Int(42));
}
