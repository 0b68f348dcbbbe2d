// crates/bcl/src/ast/render.rs

//! Source reconstruction. Rendering a parsed tree and parsing the result
//! again yields a tree that evaluates to the same document; comments inside
//! expressions are not preserved.

use super::{Control, MultiAssignment, Node, Primitive};

const INDENT: &str = "    ";

fn pad(indent: usize) -> String {
    INDENT.repeat(indent)
}

/// Render a whole document, one top-level statement per line.
pub fn render_document(nodes: &[Node]) -> String {
    let mut out = nodes
        .iter()
        .map(|n| n.render(0))
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

/// Identifiers are written bare, anything else as a double-quoted string.
pub fn render_name(name: &str) -> String {
    let mut chars = name.chars();
    let ident_like = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    let reserved = matches!(name, "true" | "false" | "null" | "IF" | "ELSEIF" | "ELSE");
    if ident_like && !reserved {
        name.to_string()
    } else {
        format!("\"{}\"", escape_string(name, '"'))
    }
}

/// Escape a string body for `quote`, leaving `${...}` regions verbatim so
/// the lexer reads them back unchanged.
pub fn escape_string(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    let mut depth = 0usize;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if depth > 0 {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            out.push(c);
            continue;
        }
        match c {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push_str("${");
                depth = 1;
            }
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn render_body(body: &[Node], indent: usize) -> String {
    if body.is_empty() {
        return "{}".to_string();
    }
    let inner = pad(indent + 1);
    let mut out = String::from("{\n");
    for node in body {
        out.push_str(&inner);
        out.push_str(&node.render(indent + 1));
        out.push('\n');
    }
    out.push_str(&pad(indent));
    out.push('}');
    out
}

fn render_list(items: &[Node], indent: usize) -> String {
    if items.iter().all(|n| matches!(n, Node::Primitive(_))) {
        let parts: Vec<String> = items.iter().map(|n| n.render(indent)).collect();
        return format!("[{}]", parts.join(", "));
    }
    let inner = pad(indent + 1);
    let mut out = String::from("[\n");
    for item in items {
        out.push_str(&inner);
        out.push_str(&item.render(indent + 1));
        out.push_str(",\n");
    }
    out.push_str(&pad(indent));
    out.push(']');
    out
}

fn render_primitive(p: &Primitive) -> String {
    match p {
        Primitive::Str {
            value,
            heredoc: Some(tag),
            ..
        } => format!("<<{tag}\n{value}\n{tag}\n"),
        Primitive::Str { value, quote, .. } => {
            format!("{quote}{}{quote}", escape_string(value, *quote))
        }
        Primitive::Int(i) => i.to_string(),
        Primitive::Float(f) => format!("{:?}", f),
        Primitive::Bool(b) => b.to_string(),
        Primitive::Null => "null".to_string(),
    }
}

fn render_multi(multi: &MultiAssignment, indent: usize) -> String {
    let names: Vec<&str> = multi.targets.iter().map(|t| t.name.as_str()).collect();
    // `a, b = f()` parses into one extract per target over a shared source.
    let shared = match multi.targets.first().map(|t| t.value.as_ref()) {
        Some(Node::TupleExtract { source, .. }) => {
            let all_same = multi.targets.iter().enumerate().all(|(i, t)| {
                matches!(t.value.as_ref(),
                    Node::TupleExtract { source: s, index } if s == source && *index == i)
            });
            all_same.then(|| source.render(indent))
        }
        _ => None,
    };
    let rhs = shared.unwrap_or_else(|| {
        multi
            .targets
            .iter()
            .map(|t| t.value.render(indent))
            .collect::<Vec<_>>()
            .join(", ")
    });
    format!("{} = {}", names.join(", "), rhs)
}

fn render_control(control: &Control, indent: usize, keyword: &str) -> String {
    let mut out = match &control.condition {
        Some(cond) => format!(
            "{keyword} ({}) {}",
            cond.render(indent),
            render_body(&control.body, indent)
        ),
        None => format!("ELSE {}", render_body(&control.body, indent)),
    };
    if let Some(next) = &control.else_branch {
        out.push(' ');
        out.push_str(&render_control(next, indent, "ELSEIF"));
    }
    out
}

impl Node {
    /// Source text for this node. The first line carries no indentation;
    /// nested lines are indented relative to `indent`.
    pub fn render(&self, indent: usize) -> String {
        match self {
            Node::Assignment(a) if a.implicit => render_name(&a.name),
            Node::Assignment(a) => {
                let sep = if a.colon { ":" } else { " =" };
                format!("{}{} {}", render_name(&a.name), sep, a.value.render(indent))
            }
            Node::MultiAssignment(m) => render_multi(m, indent),
            Node::Block(b) => match &b.label {
                Some(label) => format!(
                    "{} {} {}",
                    render_name(&b.kind),
                    render_name(label),
                    render_body(&b.body, indent)
                ),
                None => format!("{} {}", render_name(&b.kind), render_body(&b.body, indent)),
            },
            Node::BlockContainer(c) => {
                format!("{} {}", render_name(&c.kind), render_body(&c.body, indent))
            }
            Node::Arrow(a) => {
                let mut out = String::new();
                if let Some(kind) = &a.kind {
                    out.push_str(kind);
                    out.push(' ');
                }
                out.push_str(&render_name(&a.source));
                out.push_str(" -> ");
                out.push_str(&render_name(&a.target));
                if !a.body.is_empty() {
                    out.push(' ');
                    out.push_str(&render_body(&a.body, indent));
                }
                out
            }
            Node::Map(m) => render_body(&m.entries, indent),
            Node::CombinedMap(m) => render_body(&m.items, indent),
            Node::Slice(items) => render_list(items, indent),
            Node::Primitive(p) => render_primitive(p),
            Node::Identifier(name) => name.clone(),
            Node::DotAccess { left, member } => {
                format!("{}.{}", left.render(indent), render_name(member))
            }
            Node::Arithmetic { op, left, right } => format!(
                "{} {} {}",
                left.render(indent),
                op.symbol(),
                right.render(indent)
            ),
            Node::Unary { op, operand } => {
                let inner = operand.render(indent);
                if inner.starts_with('-') {
                    format!("{} {}", op.symbol(), inner)
                } else {
                    format!("{}{}", op.symbol(), inner)
                }
            }
            Node::Ternary {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "{} ? {} : {}",
                condition.render(indent),
                then_branch.render(indent),
                else_branch.render(indent)
            ),
            Node::Group(inner) => format!("({})", inner.render(indent)),
            Node::FunctionCall(call) => {
                let args: Vec<String> = call.args.iter().map(|a| a.render(indent)).collect();
                format!("{}({})", call.name, args.join(", "))
            }
            Node::EnvInterpolation { name, default } => match default {
                Some(d) => format!("${{{}:{}}}", name, d),
                None => format!("${{{}}}", name),
            },
            Node::Include(inc) => format!("@include {}", inc.target.render(indent)),
            Node::Comment(text) => text.clone(),
            Node::Control(c) => render_control(c, indent, "IF"),
            Node::Pipeline(p) => format!("@pipeline {}", render_body(&p.body, indent)),
            Node::Exec(e) => {
                let mut parts = vec![format!("cmd={}", e.cmd.render(indent))];
                if let Some(args) = &e.args {
                    parts.push(format!("args={}", args.render(indent)));
                }
                if let Some(dir) = &e.dir {
                    parts.push(format!("dir={}", dir.render(indent)));
                }
                format!("@exec({})", parts.join(", "))
            }
            Node::TupleExtract { source, .. } => source.render(indent),
        }
    }
}
