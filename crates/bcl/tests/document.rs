// crates/bcl/tests/document.rs

mod common;

use bcl::ast::render::render_document;
use bcl::{BclError, Engine, Value};
use common::{Workspace, init_logging};
use pretty_assertions::assert_eq;
use serde_json::json;

const SAMPLE: &str = r#"
# deployment
app = "shop"
replicas = 2 * 3
server "main" {
    port = 8080
    host = "${app}.internal"
}
server "backup" { port = 8081 }
database { engine = "pg" }
Dependency main -> database { required = true }
debug
"#;

#[test]
fn test_rendered_document_evaluates_the_same() {
    let engine = Engine::default();
    let nodes = engine.parse(SAMPLE).unwrap();
    let reparsed = engine.parse(&render_document(&nodes)).unwrap();
    assert_eq!(
        engine.eval_document(&nodes).unwrap(),
        engine.eval_document(&reparsed).unwrap()
    );
}

#[test]
fn test_evaluation_is_deterministic() {
    let engine = Engine::default();
    assert_eq!(engine.eval_str(SAMPLE).unwrap(), engine.eval_str(SAMPLE).unwrap());
}

#[test]
fn test_serialized_shape_keeps_block_metadata() {
    let vars = Engine::default().eval_str(SAMPLE).unwrap();
    let json = serde_json::to_value(&vars["main"]).unwrap();
    assert_eq!(
        json,
        json!({
            "__type": "server",
            "__label": "main",
            "props": { "name": "main", "port": 8080, "host": "shop.internal" }
        })
    );
}

#[test]
fn test_plain_document_view() {
    let vars = Engine::default().eval_str(SAMPLE).unwrap();
    let doc = Value::Map(vars).to_document();
    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(json["server"]["backup"], json!({ "name": "backup", "port": 8081 }));
    assert_eq!(json["database"], json!({ "name": "database", "engine": "pg" }));
    assert_eq!(json["replicas"], json!(6));
    assert_eq!(json["debug"], json!(true));
    assert_eq!(
        json["Dependency"],
        json!([{
            "type": "Dependency",
            "props": { "required": true, "source": "main", "target": "database" }
        }])
    );
}

#[test]
fn test_undefined_and_tuples_serialize() {
    let vars = Engine::default().eval_str("u = nothing\nn = null").unwrap();
    assert_eq!(serde_json::to_value(&vars).unwrap(), json!({ "u": null, "n": null }));
    let tuple = Value::Tuple(vec![Value::Int(1), Value::Null]);
    assert_eq!(serde_json::to_value(&tuple).unwrap(), json!([1, null]));
}

#[test]
fn test_convenience_api() {
    let nodes = bcl::parse("a = 1 + 1").unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(bcl::eval_str("a = 1 + 1").unwrap()["a"], Value::Int(2));
    assert_eq!(bcl::eval_document(&nodes).unwrap()["a"], Value::Int(2));

    let mut env = bcl::new_environment();
    nodes[0].eval(&mut env).unwrap();
    assert_eq!(env.lookup("a"), Value::Int(2));
}

#[test]
fn test_default_engine_registry() {
    bcl::register_function("documentTestDouble", |args| match args {
        [Value::Int(i)] => Ok(Value::Int(i * 2)),
        _ => Err("documentTestDouble expects one int".to_string()),
    })
    .unwrap();
    assert!(bcl::lookup_function("DOCUMENTTESTDOUBLE").is_some());
    assert!(bcl::register_function("documenttestdouble", |_| Ok(Value::Null)).is_err());
    assert_eq!(
        bcl::eval_str("x = documentTestDouble(21)").unwrap()["x"],
        Value::Int(42)
    );
    assert!(bcl::lookup_function("isDefined").is_some());
}

#[test]
fn test_file_api() {
    init_logging();
    let ws = Workspace::new();
    ws.write("net.bcl", "subnet = \"10.0.0.0/24\"");
    let main = ws.write("main.bcl", "@include \"net.bcl\"\ncidr = subnet");

    let nodes = bcl::parse_file(&main).unwrap();
    assert_eq!(nodes.len(), 2);
    let vars = Engine::default().eval_file(&main).unwrap();
    assert_eq!(vars["cidr"], Value::str("10.0.0.0/24"));

    let missing = ws.dir.path().join("absent.bcl");
    assert!(matches!(
        Engine::default().eval_file(&missing),
        Err(BclError::Io { .. })
    ));
}

#[test]
fn test_parse_error_points_at_source() {
    let err = bcl::parse("a = 1\nb = [1, 2").unwrap_err();
    assert_eq!(err.line, 2);
    let shown = err.to_string();
    assert!(shown.starts_with("<input>:2:"), "{}", shown);
    assert!(shown.contains("b = [1, 2"));
}
