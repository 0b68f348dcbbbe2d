// crates/bcl/src/parser/tests.rs

use crate::ast::{BinaryOp, Node, Primitive, UnaryOp};
use crate::parser::{parse_expression_str, parse_str};

fn parse(src: &str) -> Vec<Node> {
    parse_str(src, "<test>").expect("parse failed")
}

fn expr(src: &str) -> Node {
    parse_expression_str(src, "<test>").expect("parse failed")
}

fn int(i: i64) -> Node {
    Node::Primitive(Primitive::Int(i))
}

fn ident(name: &str) -> Node {
    Node::Identifier(name.to_string())
}

#[test]
fn test_empty_input() {
    assert!(parse("").is_empty());
    assert!(parse("  \n ; ").is_empty());
}

#[test]
fn test_precedence_climbing() {
    let node = expr("2 + 3 * 4");
    let Node::Arithmetic { op, left, right } = node else {
        panic!("expected arithmetic");
    };
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(*left, int(2));
    assert!(matches!(*right, Node::Arithmetic { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_left_associativity() {
    let node = expr("10 - 2 - 3");
    let Node::Arithmetic { left, right, .. } = node else {
        panic!("expected arithmetic");
    };
    assert_eq!(*right, int(3));
    assert!(matches!(*left, Node::Arithmetic { op: BinaryOp::Sub, .. }));
}

#[test]
fn test_logical_binds_loosest() {
    let node = expr("a == 1 && b < 2");
    assert!(matches!(node, Node::Arithmetic { op: BinaryOp::And, .. }));
}

#[test]
fn test_word_operators() {
    assert!(matches!(
        expr("6 multiply 7"),
        Node::Arithmetic { op: BinaryOp::Mul, .. }
    ));
    // A word on the next line starts a new statement.
    let nodes = parse("x = 1\nadd = 2");
    assert_eq!(nodes.len(), 2);
}

#[test]
fn test_unary_recurses() {
    let node = expr("!!flag");
    let Node::Unary { op, operand } = node else {
        panic!("expected unary");
    };
    assert_eq!(op, UnaryOp::Not);
    assert!(matches!(*operand, Node::Unary { op: UnaryOp::Not, .. }));
}

#[test]
fn test_ternary() {
    let node = expr("a > 1 ? \"big\" : \"small\"");
    let Node::Ternary { condition, .. } = node else {
        panic!("expected ternary");
    };
    assert!(matches!(*condition, Node::Arithmetic { op: BinaryOp::Gt, .. }));
    assert!(parse_expression_str("a ? 1", "<test>").is_err());
}

#[test]
fn test_dot_access_member_must_be_a_name() {
    let node = expr("server.\"main\".port");
    let Node::DotAccess { left, member } = node else {
        panic!("expected dot access");
    };
    assert_eq!(member, "port");
    assert!(matches!(*left, Node::DotAccess { ref member, .. } if member == "main"));
    assert!(parse_expression_str("a.(b)", "<test>").is_err());
}

#[test]
fn test_function_call_requires_same_line_paren() {
    let Node::FunctionCall(call) = expr("upper(name, 1)") else {
        panic!("expected call");
    };
    assert_eq!(call.name, "upper");
    assert_eq!(call.args, vec![ident("name"), int(1)]);
}

#[test]
fn test_assignment_forms() {
    let nodes = parse("a = 1\nb: 2\nflag");
    let [Node::Assignment(a), Node::Assignment(b), Node::Assignment(flag)] = nodes.as_slice()
    else {
        panic!("expected three assignments: {:?}", nodes);
    };
    assert_eq!(a.name, "a");
    assert!(b.colon);
    assert!(flag.implicit);
    assert_eq!(*flag.value, Node::Primitive(Primitive::Bool(true)));
}

#[test]
fn test_multi_assignment() {
    let nodes = parse("a, b = 1, 2");
    let [Node::MultiAssignment(m)] = nodes.as_slice() else {
        panic!("expected multi assignment");
    };
    assert_eq!(m.targets.len(), 2);
    assert_eq!(*m.targets[1].value, int(2));

    let nodes = parse("v, err = toNumber(x)");
    let [Node::MultiAssignment(m)] = nodes.as_slice() else {
        panic!("expected multi assignment");
    };
    assert!(matches!(*m.targets[1].value, Node::TupleExtract { index: 1, .. }));

    assert!(parse_str("a, b = 1, 2, 3", "<test>").is_err());
}

#[test]
fn test_bare_names_separated_by_commas_are_flags() {
    let nodes = parse("opts = { debug, verbose }");
    let [Node::Assignment(a)] = nodes.as_slice() else {
        panic!("expected assignment");
    };
    let Node::Map(m) = a.value.as_ref() else {
        panic!("expected map literal");
    };
    assert_eq!(m.entries.len(), 2);
}

#[test]
fn test_blocks_and_containers() {
    let nodes = parse(
        "server \"main\" { port = 8080 }\n\
         database { host = \"db\" }\n\
         services {\n  api { port = 1 }\n  web { port = 2 }\n}",
    );
    let [Node::Block(server), Node::Block(db), Node::BlockContainer(services)] = nodes.as_slice()
    else {
        panic!("unexpected shapes: {:?}", nodes);
    };
    assert_eq!(server.label.as_deref(), Some("main"));
    assert_eq!(db.label, None);
    assert_eq!(db.effective_label(), "database");
    assert_eq!(services.body.len(), 2);
}

#[test]
fn test_label_must_share_the_type_line() {
    let nodes = parse("enabled\nserver { port = 1 }");
    assert!(matches!(nodes[0], Node::Assignment(ref a) if a.implicit));
    assert!(matches!(nodes[1], Node::Block(_)));
}

#[test]
fn test_arrows() {
    let nodes = parse("Dependency api -> db { weight = 2 }\nweb -> api");
    let [Node::Arrow(typed), Node::Arrow(plain)] = nodes.as_slice() else {
        panic!("expected arrows");
    };
    assert_eq!(typed.relation(), "Dependency");
    assert_eq!(typed.body.len(), 1);
    assert_eq!(plain.relation(), "Edge");
    assert_eq!((plain.source.as_str(), plain.target.as_str()), ("web", "api"));
}

#[test]
fn test_control_chain() {
    let nodes = parse(
        "IF (x > 1) { a = 1 } ELSEIF (x > 0) { a = 2 } ELSE { a = 3 }\n# trailing",
    );
    assert_eq!(nodes.len(), 2);
    let Node::Control(c) = &nodes[0] else {
        panic!("expected control");
    };
    let elseif = c.else_branch.as_ref().expect("elseif");
    assert!(elseif.condition.is_some());
    let last = elseif.else_branch.as_ref().expect("else");
    assert!(last.condition.is_none());
    assert!(matches!(nodes[1], Node::Comment(_)));
}

#[test]
fn test_else_without_if() {
    let err = parse_str("ELSE { a = 1 }", "<test>").unwrap_err();
    assert!(err.message.contains("without"));
}

#[test]
fn test_directives() {
    let nodes = parse(
        "@include \"common.bcl\"\n\
         out = @exec(cmd=\"echo\", args=[\"hi\"])\n\
         result = @pipeline { a = 1\n b = a + 1\n a -> b }",
    );
    assert!(matches!(nodes[0], Node::Include(_)));
    let Node::Assignment(out) = &nodes[1] else {
        panic!("expected assignment");
    };
    let Node::Exec(exec) = out.value.as_ref() else {
        panic!("expected exec");
    };
    assert!(exec.args.is_some() && exec.dir.is_none());
    let Node::Assignment(result) = &nodes[2] else {
        panic!("expected assignment");
    };
    let Node::Pipeline(p) = result.value.as_ref() else {
        panic!("expected pipeline");
    };
    assert_eq!(p.body.len(), 3);
}

#[test]
fn test_exec_requires_cmd() {
    assert!(parse_str("x = @exec(args=[])", "<test>").is_err());
    assert!(parse_str("x = @exec(cmd=\"ls\", shell=true)", "<test>").is_err());
}

#[test]
fn test_unknown_directive() {
    let err = parse_str("@frobnicate", "<test>").unwrap_err();
    assert!(err.message.contains("@frobnicate"));
}

#[test]
fn test_map_literal_kinds() {
    let Node::Map(m) = expr("{ a = 1, b: 2 }") else {
        panic!("expected map");
    };
    assert_eq!(m.entries.len(), 2);
    assert!(matches!(
        expr("{ a = 1\n inner \"x\" { b = 2 } }"),
        Node::CombinedMap(_)
    ));
}

#[test]
fn test_slice_and_trailing_comma() {
    let Node::Slice(items) = expr("[1, 2,\n 3,]") else {
        panic!("expected slice");
    };
    assert_eq!(items, vec![int(1), int(2), int(3)]);
}

#[test]
fn test_env_interpolation_node() {
    assert_eq!(
        expr("${env.HOME:/tmp}"),
        Node::EnvInterpolation {
            name: "HOME".into(),
            default: Some("/tmp".into()),
        }
    );
}

#[test]
fn test_heredoc_value() {
    let nodes = parse("text = <<EOT\nline ${x}\nEOT\ny = 1");
    let Node::Assignment(a) = &nodes[0] else {
        panic!("expected assignment");
    };
    assert!(matches!(
        a.value.as_ref(),
        Node::Primitive(Primitive::Str { heredoc: Some(tag), value, .. })
            if tag == "EOT" && value == "line ${x}"
    ));
    assert_eq!(nodes.len(), 2);
}

#[test]
fn test_error_carries_position_and_context() {
    let err = parse_str("a = 1\nb = = 2", "conf.bcl").unwrap_err();
    assert_eq!(err.file, "conf.bcl");
    assert_eq!((err.line, err.column), (2, 5));
    assert_eq!(err.context, "b = = 2");
    let shown = err.to_string();
    assert!(shown.starts_with("conf.bcl:2:5:"));
}

#[test]
fn test_unclosed_block() {
    let err = parse_str("server {\n port = 1\n", "<test>").unwrap_err();
    assert!(err.message.contains("Unclosed"));
}
