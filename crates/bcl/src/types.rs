// crates/bcl/src/types.rs

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Str,
    Number,
    Bool,

    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Assign,
    At,

    // Single-character operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Bang,
    Question,
    Amp,
    Pipe,
    Caret,

    // Compound operators
    Eq,
    Ne,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Shl,
    Shr,
    Coalesce,
    Arrow,

    // Keywords
    If,
    ElseIf,
    Else,

    /// `${NAME:default}`; the literal holds the text between the braces.
    EnvVar,
    /// Heredoc body; the literal holds the content, `delimiter` the tag.
    Heredoc,
    Comment,
    Eof,
}

impl TokenKind {
    /// Source spelling for punctuation and operators.
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Assign => "=",
            TokenKind::At => "@",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Bang => "!",
            TokenKind::Question => "?",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Eq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::Coalesce => "??",
            TokenKind::Arrow => "->",
            TokenKind::If => "IF",
            TokenKind::ElseIf => "ELSEIF",
            TokenKind::Else => "ELSE",
            TokenKind::Ident => "identifier",
            TokenKind::Str => "string",
            TokenKind::Number => "number",
            TokenKind::Bool => "boolean",
            TokenKind::EnvVar => "environment reference",
            TokenKind::Heredoc => "heredoc",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of input",
        }
    }
}

/// 1-based line and column of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub column: usize,
    /// Heredoc tag (`EOF` in `<<EOF`), `None` for every other token.
    pub delimiter: Option<String>,
    /// Quote character a string literal was written with.
    pub quote: Option<char>,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            literal: literal.into(),
            line,
            column,
            delimiter: None,
            quote: None,
        }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Human readable form used in "unexpected token" diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Ident | TokenKind::Number | TokenKind::Bool => {
                format!("'{}'", self.literal)
            }
            TokenKind::Str => format!("string \"{}\"", self.literal),
            TokenKind::Eof | TokenKind::Comment | TokenKind::Heredoc | TokenKind::EnvVar => {
                self.kind.symbol().to_string()
            }
            other => format!("'{}'", other.symbol()),
        }
    }
}
