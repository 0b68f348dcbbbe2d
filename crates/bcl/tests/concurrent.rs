// crates/bcl/tests/concurrent.rs

mod common;

use bcl::{
    BatchEvaluator, BclError, CancelToken, ConcurrencyError, ConcurrentParser, Engine,
    EngineConfig, EvalError, Map, Value,
};
use common::{Workspace, documents, init_logging};
use pretty_assertions::assert_eq;

fn small_queue_engine() -> Engine {
    Engine::new(EngineConfig {
        workers: 4,
        queue_capacity: 2,
        ..Default::default()
    })
}

fn sequential_merge(engine: &Engine, docs: &[(String, String)]) -> Map {
    let mut merged = Map::new();
    for (_, source) in docs {
        merged.extend(engine.eval_str(source).unwrap());
    }
    merged
}

#[test]
fn test_merge_sources_matches_sequential() {
    init_logging();
    let engine = small_queue_engine();
    let docs = documents(16);
    let sources: Vec<(&str, &str)> = docs
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();

    let merged = ConcurrentParser::new(&engine)
        .merge_sources(&sources)
        .unwrap();
    assert_eq!(merged, sequential_merge(&engine, &docs));
    assert_eq!(merged["value_7"], Value::Int(70));
    assert_eq!(
        merged["svc_3"].get_path("port"),
        Some(&Value::Int(8003))
    );
}

#[test]
fn test_parse_and_merge_files_matches_sequential() {
    init_logging();
    let ws = Workspace::new();
    let docs = documents(10);
    let paths: Vec<_> = docs.iter().map(|(n, s)| ws.write(n, s)).collect();
    let engine = small_queue_engine();

    let parallel = ConcurrentParser::new(&engine).parse_and_merge(&paths).unwrap();

    let mut sequential = Map::new();
    for path in &paths {
        sequential.extend(engine.eval_file(path).unwrap());
    }
    assert_eq!(parallel, sequential);
}

#[test]
fn test_parse_files_reports_every_document() {
    let ws = Workspace::new();
    let good = ws.write("good.bcl", "a = 1");
    let bad = ws.write("bad.bcl", "a = = 1");
    let missing = ws.dir.path().join("missing.bcl");
    let engine = Engine::default();

    let docs = ConcurrentParser::new(&engine).parse_files(&[&good, &bad, &missing]);
    assert_eq!(docs.len(), 3);
    let find = |name: &std::path::Path| {
        docs.iter()
            .find(|d| d.name == name.display().to_string())
            .unwrap_or_else(|| panic!("no result for {}", name.display()))
    };
    assert!(find(good.as_path()).result.is_ok());
    assert!(matches!(find(bad.as_path()).result, Err(BclError::Parse(_))));
    assert!(matches!(find(missing.as_path()).result, Err(BclError::Io { .. })));
}

#[test]
fn test_failures_are_collected_not_fatal() {
    let engine = small_queue_engine();
    let sources = [
        ("ok.bcl", "a = 1"),
        ("parse.bcl", "b = (1"),
        ("eval.bcl", "c = 1 / 0"),
        ("ok2.bcl", "d = 2"),
    ];
    let err = ConcurrentParser::new(&engine)
        .merge_sources(&sources)
        .unwrap_err();
    assert_eq!(err.len(), 2);
    assert!(err.iter().any(|e| matches!(e, BclError::Parse(_))));
    assert!(err.iter().any(|e| matches!(
        e,
        BclError::Eval(inner) if matches!(inner.root(), EvalError::DivisionByZero)
    )));
    assert!(err.to_string().starts_with("2 error(s) occurred"));
}

#[test]
fn test_shared_include_cache_across_workers() {
    init_logging();
    let ws = Workspace::new();
    ws.write("common.bcl", "base = 100");
    let paths: Vec<_> = (0..8)
        .map(|i| {
            ws.write(
                &format!("main_{i}.bcl"),
                &format!("@include \"common.bcl\"\nv_{i} = base + {i}"),
            )
        })
        .collect();
    let engine = small_queue_engine();

    let merged = ConcurrentParser::new(&engine).parse_and_merge(&paths).unwrap();
    assert_eq!(merged["v_5"], Value::Int(105));
    assert_eq!(engine.include_cache().len(), 1);
}

#[test]
fn test_cancelled_parser_dispatches_nothing() {
    let engine = Engine::default();
    let cancel = CancelToken::new();
    cancel.cancel();
    let parser = ConcurrentParser::new(&engine).with_cancel(cancel);

    let docs = parser.parse_sources(&[("a", "a = 1"), ("b", "b = 2")]);
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| matches!(
        d.result,
        Err(BclError::Concurrency(ConcurrencyError::NotDispatched))
    )));

    let err = parser
        .merge_sources(&[("a", "a = 1"), ("b", "b = 2")])
        .unwrap_err();
    assert_eq!(err.len(), 1);
    assert!(matches!(
        err.errors[0],
        BclError::Concurrency(ConcurrencyError::Cancelled { skipped: 2 })
    ));
}

#[test]
fn test_batch_results_keep_input_order() {
    init_logging();
    let engine = small_queue_engine();
    let expressions: Vec<String> = (0..50).map(|i| format!("{} * 2", i)).collect();

    let results = BatchEvaluator::new(&engine).evaluate(&expressions);
    assert_eq!(results.len(), 50);
    for (i, item) in results.iter().enumerate() {
        assert_eq!(item.index, i);
        assert_eq!(item.expression, expressions[i]);
        assert_eq!(item.result.as_ref().unwrap(), &Value::Int(i as i64 * 2));
    }
}

#[test]
fn test_batch_shares_a_read_only_base_scope() {
    let engine = Engine::default();
    let base = engine
        .eval_str("x = 41\nserver \"main\" { port = 8080 }")
        .unwrap();
    let values = BatchEvaluator::new(&engine)
        .with_vars(base)
        .evaluate_all(&["x + 1", "main.port", "upper(\"ok\")", "missing"])
        .unwrap();
    assert_eq!(
        values,
        vec![
            Value::Int(42),
            Value::Int(8080),
            Value::str("OK"),
            Value::Undefined,
        ]
    );
}

#[test]
fn test_batch_collects_errors() {
    let engine = Engine::default();
    let results = BatchEvaluator::new(&engine).evaluate(&["1", "1 / 0", "nope(1)", "(2"]);
    assert!(results[0].result.is_ok());
    assert!(matches!(results[3].result, Err(BclError::Parse(_))));

    let err = BatchEvaluator::new(&engine)
        .evaluate_all(&["1", "1 / 0", "nope(1)"])
        .unwrap_err();
    assert_eq!(err.len(), 2);
}

#[test]
fn test_cancelled_batch() {
    let engine = Engine::default();
    let cancel = CancelToken::new();
    let batch = BatchEvaluator::new(&engine).with_cancel(cancel.clone());
    cancel.cancel();
    assert!(batch.cancel_token().is_cancelled());

    let err = batch.evaluate_all(&["1", "2", "3"]).unwrap_err();
    assert!(matches!(
        err.errors.as_slice(),
        [BclError::Concurrency(ConcurrencyError::Cancelled { skipped: 3 })]
    ));
}

#[test]
fn test_worker_panic_is_isolated() {
    let engine = Engine::default();
    engine
        .register_function("explode", |_| panic!("kaboom"))
        .unwrap();
    let results = BatchEvaluator::new(&engine).evaluate(&["explode()", "1 + 1"]);
    assert!(matches!(
        &results[0].result,
        Err(BclError::Concurrency(ConcurrencyError::WorkerPanic { item })) if item.contains("kaboom")
    ));
    assert_eq!(results[1].result.as_ref().unwrap(), &Value::Int(2));
}
