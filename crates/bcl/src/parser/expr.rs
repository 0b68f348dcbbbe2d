// crates/bcl/src/parser/expr.rs

//! Precedence-climbing expression parser.

use super::Parser;
use crate::ast::{BinaryOp, CombinedMap, FunctionCall, MapLiteral, Node, Primitive, UnaryOp};
use crate::errors::ParseError;
use crate::types::TokenKind;

impl Parser<'_> {
    /// Parse one expression, ternary included.
    pub fn parse_expression(&mut self) -> Result<Node, ParseError> {
        let condition = self.parse_binary(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(condition);
        }
        let then_branch = self.parse_expression()?;
        self.expect(TokenKind::Colon, "in ternary expression")?;
        let else_branch = self.parse_expression()?;
        Ok(Node::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Node, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            left = Node::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Word operators only continue an expression on the same line, so a
    /// following statement named `add` is not swallowed.
    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let tok = self.peek();
        let op = match tok.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::AndAnd => BinaryOp::And,
            TokenKind::OrOr => BinaryOp::Or,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Shl => BinaryOp::Shl,
            TokenKind::Shr => BinaryOp::Shr,
            TokenKind::Coalesce => BinaryOp::Coalesce,
            TokenKind::Ident => {
                let same_line = self.previous().is_some_and(|p| p.line == tok.line);
                return BinaryOp::from_word(&tok.literal).filter(|_| same_line);
            }
            _ => return None,
        };
        Some(op)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Node::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_primary()?;
        while self.eat(TokenKind::Dot) {
            let member = self.expect_name("after '.'")?;
            node = Node::DotAccess {
                left: Box::new(node),
                member: member.literal,
            };
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number => {
                self.advance();
                parse_number(&tok.literal)
                    .ok_or_else(|| self.error_at(&tok, format!("Invalid number '{}'", tok.literal)))
            }
            TokenKind::Str => {
                self.advance();
                Ok(Node::Primitive(Primitive::Str {
                    value: tok.literal,
                    quote: tok.quote.unwrap_or('"'),
                    heredoc: None,
                }))
            }
            TokenKind::Heredoc => {
                self.advance();
                Ok(Node::Primitive(Primitive::Str {
                    value: tok.literal,
                    quote: '"',
                    heredoc: tok.delimiter,
                }))
            }
            TokenKind::Bool => {
                self.advance();
                Ok(Node::Primitive(Primitive::Bool(tok.literal == "true")))
            }
            TokenKind::Ident if tok.literal == "null" => {
                self.advance();
                Ok(Node::Primitive(Primitive::Null))
            }
            TokenKind::Ident => {
                self.advance();
                let next = self.peek();
                if next.kind == TokenKind::LParen && next.line == tok.line {
                    let args = self.parse_call_args()?;
                    let pos = tok.pos();
                    return Ok(Node::FunctionCall(FunctionCall {
                        name: tok.literal,
                        args,
                        pos,
                    }));
                }
                Ok(Node::Identifier(tok.literal))
            }
            TokenKind::EnvVar => {
                self.advance();
                Ok(env_interpolation(&tok.literal))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "to close group")?;
                Ok(Node::Group(Box::new(inner)))
            }
            TokenKind::LBracket => self.parse_slice(),
            TokenKind::LBrace => self.parse_map_literal(),
            TokenKind::At => self.parse_directive(),
            _ => Err(self.error_at(
                &tok,
                format!("Expected an expression, found {}", tok.describe()),
            )),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::LParen, "for call arguments")?;
        let mut args = Vec::new();
        loop {
            self.skip_comments();
            if self.eat(TokenKind::RParen) {
                return Ok(args);
            }
            args.push(self.parse_expression()?);
            self.skip_comments();
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "to close call arguments")?;
                return Ok(args);
            }
        }
    }

    fn parse_slice(&mut self) -> Result<Node, ParseError> {
        self.expect(TokenKind::LBracket, "for list")?;
        let mut items = Vec::new();
        loop {
            self.skip_comments();
            if self.eat(TokenKind::RBracket) {
                return Ok(Node::Slice(items));
            }
            items.push(self.parse_expression()?);
            self.skip_comments();
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RBracket, "to close list")?;
                return Ok(Node::Slice(items));
            }
        }
    }

    /// `{ ... }` in expression position. Entries are ordinary statements;
    /// any nested block makes it a combined map.
    fn parse_map_literal(&mut self) -> Result<Node, ParseError> {
        let items = self.parse_body("for map literal")?;
        let has_blocks = items
            .iter()
            .any(|n| matches!(n, Node::Block(_) | Node::BlockContainer(_)));
        if has_blocks {
            Ok(Node::CombinedMap(CombinedMap { items }))
        } else {
            Ok(Node::Map(MapLiteral { entries: items }))
        }
    }
}

fn parse_number(text: &str) -> Option<Node> {
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Node::Primitive(Primitive::Int(i)));
        }
    }
    text.parse::<f64>()
        .ok()
        .map(|f| Node::Primitive(Primitive::Float(f)))
}

/// `NAME`, `NAME:default` or `env.NAME`; `text` is the trimmed inside of
/// `${...}`.
pub(crate) fn env_interpolation(text: &str) -> Node {
    let (name, default) = match text.split_once(':') {
        Some((name, default)) => (name.trim(), Some(default.to_string())),
        None => (text.trim(), None),
    };
    let name = name.strip_prefix("env.").unwrap_or(name);
    Node::EnvInterpolation {
        name: name.to_string(),
        default,
    }
}
