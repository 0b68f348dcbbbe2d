// crates/bcl/src/ast/mod.rs

//! Node model produced by the parser. Every node owns its children; the
//! tree is immutable once built.

use crate::types::Position;

pub mod render;


/// Relation types that may prefix an arrow statement: `Edge a -> b`.
pub const RELATION_TYPES: &[&str] = &[
    "Edge",
    "Arrow",
    "Connection",
    "Link",
    "Relation",
    "Flow",
    "Dependency",
];

/// Arrow type used when none is written.
pub const DEFAULT_RELATION: &str = "Edge";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Assignment(Assignment),
    MultiAssignment(MultiAssignment),
    Block(Block),
    BlockContainer(BlockContainer),
    Arrow(Arrow),
    Map(MapLiteral),
    CombinedMap(CombinedMap),
    Slice(Vec<Node>),
    Primitive(Primitive),
    Identifier(String),
    DotAccess {
        left: Box<Node>,
        member: String,
    },
    Arithmetic {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Ternary {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },
    Group(Box<Node>),
    FunctionCall(FunctionCall),
    /// `${NAME:default}` outside of a string.
    EnvInterpolation {
        name: String,
        default: Option<String>,
    },
    Include(Include),
    Comment(String),
    Control(Control),
    Pipeline(Pipeline),
    Exec(Exec),
    /// One slot of a destructured call result: the `b` in `a, b = f()`.
    TupleExtract {
        source: Box<Node>,
        index: usize,
    },
}

impl Node {
    /// Source position of statement-level nodes.
    pub fn pos(&self) -> Option<Position> {
        match self {
            Node::Assignment(a) => Some(a.pos),
            Node::MultiAssignment(m) => m.targets.first().map(|t| t.pos),
            Node::Block(b) => Some(b.pos),
            Node::BlockContainer(c) => Some(c.pos),
            Node::Arrow(a) => Some(a.pos),
            Node::FunctionCall(c) => Some(c.pos),
            Node::Include(i) => Some(i.pos),
            Node::Control(c) => Some(c.pos),
            Node::Pipeline(p) => Some(p.pos),
            Node::Exec(e) => Some(e.pos),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Box<Node>,
    pub pos: Position,
    /// Written as `name: value`.
    pub colon: bool,
    /// A bare identifier statement, rendered back without `= true`.
    pub implicit: bool,
}

impl Assignment {
    pub fn new(name: impl Into<String>, value: Node, pos: Position) -> Self {
        Assignment {
            name: name.into(),
            value: Box::new(value),
            pos,
            colon: false,
            implicit: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiAssignment {
    pub targets: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub label: Option<String>,
    pub body: Vec<Node>,
    pub pos: Position,
}

impl Block {
    /// The label, or the block type when no label was written.
    pub fn effective_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.kind)
    }
}

/// `type { block block }`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockContainer {
    pub kind: String,
    pub body: Vec<Node>,
    pub pos: Position,
}

/// Labeled edge `[Type] source -> target { props }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub kind: Option<String>,
    pub source: String,
    pub target: String,
    pub body: Vec<Node>,
    pub pos: Position,
}

impl Arrow {
    pub fn relation(&self) -> &str {
        self.kind.as_deref().unwrap_or(DEFAULT_RELATION)
    }
}

/// `{ k = v, ... }` with only key/value entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLiteral {
    pub entries: Vec<Node>,
}

/// Map literal mixing key/value entries with nested named blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedMap {
    pub items: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Str {
        value: String,
        quote: char,
        /// Heredoc tag when the string was written as `<<TAG`.
        heredoc: Option<String>,
    },
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Primitive {
    pub fn string(value: impl Into<String>) -> Self {
        Primitive::Str {
            value: value.into(),
            quote: '"',
            heredoc: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Node>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub target: Box<Node>,
    pub pos: Position,
}

/// One link of an `IF / ELSEIF / ELSE` chain. `condition` is `None` for
/// the terminal `ELSE`.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub condition: Option<Box<Node>>,
    pub body: Vec<Node>,
    pub else_branch: Option<Box<Control>>,
    pub pos: Position,
}

/// `@pipeline { ... }`: assignment steps plus optional `a -> b` ordering edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub body: Vec<Node>,
    pub pos: Position,
}

/// `@exec(cmd=..., args=[...], dir=...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Exec {
    pub cmd: Box<Node>,
    pub args: Option<Box<Node>>,
    pub dir: Option<Box<Node>>,
    pub pos: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter. Member access (`.`) sits
    /// above all of these at 4 and is handled as a postfix.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 3,
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Shl
            | BinaryOp::Shr => 2,
            BinaryOp::BitAnd
            | BinaryOp::BitXor
            | BinaryOp::BitOr
            | BinaryOp::Or
            | BinaryOp::And
            | BinaryOp::Coalesce => 1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Coalesce => "??",
        }
    }

    /// Spelled-out operators accepted in place of the symbols.
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "add" => Some(BinaryOp::Add),
            "subtract" => Some(BinaryOp::Sub),
            "multiply" => Some(BinaryOp::Mul),
            "divide" => Some(BinaryOp::Div),
            "mod" => Some(BinaryOp::Mod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}
