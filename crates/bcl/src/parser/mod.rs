// crates/bcl/src/parser/mod.rs

//! Recursive-descent statement parser. Expressions live in `expr`.

use crate::ast::{
    Arrow, Assignment, Block, BlockContainer, Control, Exec, Include, MultiAssignment, Node,
    Pipeline, Primitive, RELATION_TYPES,
};
use crate::errors::ParseError;
use crate::lexer::Lexer;
use crate::types::{Position, Token, TokenKind};

mod expr;

#[cfg(test)]
mod tests;

/// Parse a whole document.
pub fn parse_str(source: &str, file: &str) -> Result<Vec<Node>, ParseError> {
    Parser::new(source, file)?.parse()
}

/// Parse `text` as a single expression; trailing input is an error.
pub fn parse_expression_str(text: &str, file: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(text, file)?;
    let node = parser.parse_expression()?;
    parser.skip_comments();
    if !parser.check(TokenKind::Eof) {
        let tok = parser.peek().clone();
        return Err(parser.error_at(&tok, format!("Unexpected {} after expression", tok.describe())));
    }
    Ok(node)
}

/// The Parser struct
pub struct Parser<'a> {
    source: &'a str,
    file: String,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Lex `source` up front; lexing errors surface here.
    pub fn new(source: &'a str, file: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source, file).tokenize()?;
        Ok(Parser {
            source,
            file: file.to_string(),
            tokens,
            pos: 0,
        })
    }

    /// Main parse function
    pub fn parse(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::Eof) {
                return Ok(nodes);
            }
            nodes.push(self.parse_statement()?);
        }
    }

    //--------------------------------------------------------------------------
    // Token helpers
    //--------------------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).map(|i| &self.tokens[i])
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_nth(&self, n: usize, kind: TokenKind) -> bool {
        self.peek_nth(n).kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let tok = self.peek().clone();
        Err(self.error_at(
            &tok,
            format!(
                "Expected '{}' {}, found {}",
                kind.symbol(),
                context,
                tok.describe()
            ),
        ))
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        ParseError::new(message, &self.file, token.line, token.column, self.source)
    }

    fn is_name(tok: &Token) -> bool {
        matches!(tok.kind, TokenKind::Ident | TokenKind::Str)
    }

    fn expect_name(&mut self, context: &str) -> Result<Token, ParseError> {
        if Self::is_name(self.peek()) {
            return Ok(self.advance());
        }
        let tok = self.peek().clone();
        Err(self.error_at(
            &tok,
            format!("Expected a name {}, found {}", context, tok.describe()),
        ))
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Semicolon | TokenKind::Comma) {
            self.advance();
        }
    }

    fn skip_comments(&mut self) {
        while self.check(TokenKind::Comment) {
            self.advance();
        }
    }

    //--------------------------------------------------------------------------
    // Statements
    //--------------------------------------------------------------------------

    /// Dispatch order: comment, `@` directive, control keyword, arrow,
    /// block or assignment.
    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Comment => {
                self.advance();
                Ok(Node::Comment(tok.literal))
            }
            TokenKind::At => self.parse_directive(),
            TokenKind::If => Ok(Node::Control(self.parse_control()?)),
            TokenKind::ElseIf | TokenKind::Else => Err(self.error_at(
                &tok,
                format!("'{}' without a preceding IF", tok.literal),
            )),
            TokenKind::Ident | TokenKind::Str => {
                if let Some(arrow) = self.try_arrow()? {
                    return Ok(Node::Arrow(arrow));
                }
                self.parse_block_or_assignment()
            }
            _ => Err(self.error_at(&tok, format!("Unexpected {}", tok.describe()))),
        }
    }

    /// Parses a `{ ... }` statement list.
    fn parse_body(&mut self, context: &str) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::LBrace, context)?;
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            if self.eat(TokenKind::RBrace) {
                return Ok(body);
            }
            if self.check(TokenKind::Eof) {
                let tok = self.peek().clone();
                return Err(self.error_at(&tok, format!("Unclosed '{{' {}", context)));
            }
            body.push(self.parse_statement()?);
        }
    }

    fn try_arrow(&mut self) -> Result<Option<Arrow>, ParseError> {
        let first = self.peek().clone();
        let typed = first.kind == TokenKind::Ident
            && RELATION_TYPES.contains(&first.literal.as_str())
            && Self::is_name(self.peek_nth(1))
            && self.check_nth(2, TokenKind::Arrow);
        let implicit = Self::is_name(&first) && self.check_nth(1, TokenKind::Arrow);
        if !typed && !implicit {
            return Ok(None);
        }

        let kind = if typed {
            Some(self.advance().literal)
        } else {
            None
        };
        let source = self.expect_name("as arrow source")?.literal;
        self.expect(TokenKind::Arrow, "in arrow")?;
        let target = self.expect_name("as arrow target")?.literal;
        let body = if self.check(TokenKind::LBrace) {
            self.parse_body("for arrow properties")?
        } else {
            Vec::new()
        };
        Ok(Some(Arrow {
            kind,
            source,
            target,
            body,
            pos: first.pos(),
        }))
    }

    fn parse_block_or_assignment(&mut self) -> Result<Node, ParseError> {
        let name = self.peek().clone();
        let next = self.peek_nth(1).clone();
        let pos = name.pos();

        if next.kind == TokenKind::LBrace {
            self.advance();
            let body = self.parse_body("for block body")?;
            return Ok(block_or_container(name.literal, None, body, pos));
        }
        if Self::is_name(&next) && next.line == name.line && self.check_nth(2, TokenKind::LBrace)
        {
            self.advance();
            self.advance();
            let body = self.parse_body("for block body")?;
            return Ok(block_or_container(
                name.literal,
                Some(next.literal),
                body,
                pos,
            ));
        }
        if matches!(next.kind, TokenKind::Assign | TokenKind::Colon) {
            self.advance();
            let colon = self.advance().kind == TokenKind::Colon;
            let value = self.parse_expression()?;
            let mut assign = Assignment::new(name.literal, value, pos);
            assign.colon = colon;
            return Ok(Node::Assignment(assign));
        }
        if name.kind == TokenKind::Ident && self.is_multi_assignment() {
            return self.parse_multi_assignment();
        }
        if name.kind == TokenKind::Ident {
            self.advance();
            let mut assign = Assignment::new(
                name.literal,
                Node::Primitive(Primitive::Bool(true)),
                pos,
            );
            assign.implicit = true;
            return Ok(Node::Assignment(assign));
        }
        Err(self.error_at(
            &name,
            format!("Expected a block or assignment after {}", name.describe()),
        ))
    }

    /// `a, b, c =` ahead?
    fn is_multi_assignment(&self) -> bool {
        let mut n = 0;
        loop {
            if !self.check_nth(n, TokenKind::Ident) {
                return false;
            }
            match self.peek_nth(n + 1).kind {
                TokenKind::Comma => n += 2,
                TokenKind::Assign => return n > 0,
                _ => return false,
            }
        }
    }

    fn parse_multi_assignment(&mut self) -> Result<Node, ParseError> {
        let mut names = vec![self.advance()];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect(TokenKind::Ident, "in assignment target list")?);
        }
        let assign_tok = self.expect(TokenKind::Assign, "after assignment targets")?;

        let mut values = vec![self.parse_expression()?];
        while self.check(TokenKind::Comma) && values.len() < names.len() {
            self.advance();
            values.push(self.parse_expression()?);
        }

        let targets = if values.len() == names.len() {
            names
                .into_iter()
                .zip(values)
                .map(|(n, v)| Assignment::new(n.literal.clone(), v, n.pos()))
                .collect()
        } else if values.len() == 1 {
            let source = values.remove(0);
            names
                .into_iter()
                .enumerate()
                .map(|(index, n)| {
                    let extract = Node::TupleExtract {
                        source: Box::new(source.clone()),
                        index,
                    };
                    Assignment::new(n.literal.clone(), extract, n.pos())
                })
                .collect()
        } else {
            return Err(self.error_at(
                &assign_tok,
                format!(
                    "Assignment has {} targets but {} values",
                    names.len(),
                    values.len()
                ),
            ));
        };
        Ok(Node::MultiAssignment(MultiAssignment { targets }))
    }

    fn parse_control(&mut self) -> Result<Control, ParseError> {
        let kw = self.advance();
        let condition = self.parse_condition()?;
        let body = self.parse_body("for IF body")?;
        let else_branch = self.parse_else_chain()?;
        Ok(Control {
            condition: Some(Box::new(condition)),
            body,
            else_branch,
            pos: kw.pos(),
        })
    }

    /// Parentheses around a condition are optional and not kept.
    fn parse_condition(&mut self) -> Result<Node, ParseError> {
        match self.parse_expression()? {
            Node::Group(inner) => Ok(*inner),
            cond => Ok(cond),
        }
    }

    fn parse_else_chain(&mut self) -> Result<Option<Box<Control>>, ParseError> {
        let mut n = 0;
        while self.check_nth(n, TokenKind::Comment) {
            n += 1;
        }
        if !matches!(self.peek_nth(n).kind, TokenKind::ElseIf | TokenKind::Else) {
            return Ok(None);
        }
        self.skip_comments();
        match self.peek().kind {
            TokenKind::ElseIf => Ok(Some(Box::new(self.parse_control()?))),
            TokenKind::Else if self.check_nth(1, TokenKind::If) => {
                self.advance();
                Ok(Some(Box::new(self.parse_control()?)))
            }
            TokenKind::Else => {
                let kw = self.advance();
                let body = self.parse_body("for ELSE body")?;
                Ok(Some(Box::new(Control {
                    condition: None,
                    body,
                    else_branch: None,
                    pos: kw.pos(),
                })))
            }
            _ => Ok(None),
        }
    }

    //--------------------------------------------------------------------------
    // Directives
    //--------------------------------------------------------------------------

    fn parse_directive(&mut self) -> Result<Node, ParseError> {
        let at = self.expect(TokenKind::At, "before directive")?;
        let pos = at.pos();
        let name = self.expect(TokenKind::Ident, "after '@'")?;
        match name.literal.as_str() {
            "include" => {
                let target = self.parse_expression()?;
                Ok(Node::Include(Include {
                    target: Box::new(target),
                    pos,
                }))
            }
            "exec" => self.parse_exec(&at),
            "pipeline" => {
                let body = self.parse_pipeline_body()?;
                Ok(Node::Pipeline(Pipeline {
                    body,
                    pos,
                }))
            }
            other => Err(self.error_at(&name, format!("Unknown directive '@{}'", other))),
        }
    }

    fn parse_exec(&mut self, at: &Token) -> Result<Node, ParseError> {
        let pos = at.pos();
        self.expect(TokenKind::LParen, "after '@exec'")?;
        let mut cmd = None;
        let mut args = None;
        let mut dir = None;
        loop {
            self.skip_comments();
            if self.eat(TokenKind::RParen) {
                break;
            }
            let key = self.expect(TokenKind::Ident, "for @exec argument")?;
            self.expect(TokenKind::Assign, "after @exec argument name")?;
            let value = Box::new(self.parse_expression()?);
            match key.literal.as_str() {
                "cmd" => cmd = Some(value),
                "args" => args = Some(value),
                "dir" => dir = Some(value),
                other => {
                    return Err(self.error_at(&key, format!("Unknown @exec argument '{}'", other)));
                }
            }
            self.skip_comments();
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "to close @exec")?;
                break;
            }
        }
        let Some(cmd) = cmd else {
            return Err(self.error_at(at, "@exec requires a 'cmd' argument"));
        };
        Ok(Node::Exec(Exec {
            cmd,
            args,
            dir,
            pos,
        }))
    }

    /// A pipeline body is a flat list of `name = expr` steps and
    /// `step -> step` ordering edges.
    fn parse_pipeline_body(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::LBrace, "for pipeline body")?;
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(body);
                }
                TokenKind::Comment => {
                    self.advance();
                    body.push(Node::Comment(tok.literal));
                }
                TokenKind::Ident | TokenKind::Str => {
                    if let Some(arrow) = self.try_arrow()? {
                        body.push(Node::Arrow(arrow));
                        continue;
                    }
                    if !matches!(self.peek_nth(1).kind, TokenKind::Assign | TokenKind::Colon) {
                        return Err(self.error_at(
                            &tok,
                            "Pipeline steps must be assignments or arrows",
                        ));
                    }
                    body.push(self.parse_block_or_assignment()?);
                }
                TokenKind::Eof => {
                    return Err(self.error_at(&tok, "Unclosed '{' for pipeline body"));
                }
                _ => {
                    return Err(self.error_at(
                        &tok,
                        format!("Unexpected {} in pipeline", tok.describe()),
                    ));
                }
            }
        }
    }
}

/// `type { ... }` whose body holds only blocks is a container.
fn block_or_container(kind: String, label: Option<String>, body: Vec<Node>, pos: Position) -> Node {
    let only_blocks = body
        .iter()
        .filter(|n| !matches!(n, Node::Comment(_)))
        .all(|n| matches!(n, Node::Block(_) | Node::BlockContainer(_)));
    let has_block = body
        .iter()
        .any(|n| matches!(n, Node::Block(_) | Node::BlockContainer(_)));
    if label.is_none() && only_blocks && has_block {
        Node::BlockContainer(BlockContainer {
            kind,
            body,
            pos,
        })
    } else {
        Node::Block(Block {
            kind,
            label,
            body,
            pos,
        })
    }
}
