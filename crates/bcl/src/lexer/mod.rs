// crates/bcl/src/lexer/mod.rs

use crate::errors::ParseError;
use crate::types::{Token, TokenKind};


/// Returns true if `c` is an ASCII letter or underscore.
fn is_identifier_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

/// Returns true if `c` is an ASCII letter, digit or underscore.
fn is_identifier_continue(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

/// Returns true if `c` is a whitespace character.
fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// The lexer struct. Purely advancing: every call to `next_token` consumes
/// input, lookahead buffering is left to the parser.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    file: String,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer. `file` only feeds diagnostics.
    pub fn new(input: &'a str, file: &str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            column: 1,
            file: file.to_string(),
        }
    }

    /// Lex the whole input, the trailing `Eof` token included.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    /// Advance one character, keeping line/column in step.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Helper: check if the input at the current position starts with string `s`.
    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Consume `s` if the input continues with it.
    fn consume_str(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            for _ in s.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>, line: usize, column: usize) -> ParseError {
        ParseError::new(message, &self.file, line, column, self.input)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !is_whitespace(c) {
                break;
            }
            self.advance();
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let (line, col) = (self.line, self.column);
        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", line, col));
        };

        if ch == '#' || self.starts_with("--") {
            return Ok(self.read_line_comment(line, col));
        }
        if self.starts_with("/*") {
            return self.read_block_comment(line, col);
        }
        if is_identifier_start(ch) {
            return Ok(self.read_identifier(line, col));
        }
        if ch.is_ascii_digit() {
            return Ok(self.read_number(line, col));
        }
        if matches!(ch, '"' | '\'' | '`') {
            return self.read_string(ch, line, col);
        }
        if self.starts_with("${") {
            return self.read_env_var(line, col);
        }
        if self.starts_with("<<") {
            if let Some(token) = self.try_heredoc(line, col)? {
                return Ok(token);
            }
        }

        const COMPOUND: [(&str, TokenKind); 10] = [
            ("==", TokenKind::Eq),
            ("!=", TokenKind::Ne),
            ("<=", TokenKind::Le),
            (">=", TokenKind::Ge),
            ("&&", TokenKind::AndAnd),
            ("||", TokenKind::OrOr),
            ("<<", TokenKind::Shl),
            (">>", TokenKind::Shr),
            ("??", TokenKind::Coalesce),
            ("->", TokenKind::Arrow),
        ];
        for (text, kind) in COMPOUND {
            if self.consume_str(text) {
                return Ok(Token::new(kind, text, line, col));
            }
        }

        let kind = match ch {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '=' => TokenKind::Assign,
            '@' => TokenKind::At,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '!' => TokenKind::Bang,
            '?' => TokenKind::Question,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            other => {
                return Err(self.error(format!("Unexpected character '{}'", other), line, col));
            }
        };
        self.advance();
        Ok(Token::new(kind, ch.to_string(), line, col))
    }

    fn read_line_comment(&mut self, line: usize, col: usize) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        let text = self.input[start..self.pos].trim_end_matches('\r');
        Token::new(TokenKind::Comment, text, line, col)
    }

    fn read_block_comment(&mut self, line: usize, col: usize) -> Result<Token, ParseError> {
        let start = self.pos;
        self.consume_str("/*");
        loop {
            if self.consume_str("*/") {
                break;
            }
            if self.advance().is_none() {
                return Err(self.error("Unterminated block comment", line, col));
            }
        }
        Ok(Token::new(
            TokenKind::Comment,
            &self.input[start..self.pos],
            line,
            col,
        ))
    }

    fn read_identifier(&mut self, line: usize, col: usize) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_identifier_continue(c) {
                break;
            }
            self.advance();
        }
        let text = &self.input[start..self.pos];
        let kind = match text {
            "true" | "false" => TokenKind::Bool,
            "IF" => TokenKind::If,
            "ELSEIF" => TokenKind::ElseIf,
            "ELSE" => TokenKind::Else,
            _ => TokenKind::Ident,
        };
        Token::new(kind, text, line, col)
    }

    fn read_number(&mut self, line: usize, col: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if matches!(self.peek_at(digit_at), Some(c) if c.is_ascii_digit()) {
                self.advance();
                if signed {
                    self.advance();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        Token::new(TokenKind::Number, &self.input[start..self.pos], line, col)
    }

    /// Strings keep `${...}` regions verbatim (quotes and escapes included)
    /// so the interpolation pass can re-parse them.
    fn read_string(&mut self, quote: char, line: usize, col: usize) -> Result<Token, ParseError> {
        self.advance();
        let mut out = String::new();
        let mut depth = 0usize;
        loop {
            let Some(c) = self.advance() else {
                return Err(self.error("Unterminated string literal", line, col));
            };
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
                c if c == quote => break,
                '\n' if quote != '`' => {
                    return Err(self.error("Unterminated string literal", line, col));
                }
                '$' if self.peek() == Some('{') => {
                    self.advance();
                    out.push_str("${");
                    depth = 1;
                }
                '\\' => match self.advance() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some(q @ ('"' | '\'' | '`')) => out.push(q),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(self.error("Unterminated string literal", line, col)),
                },
                other => out.push(other),
            }
        }
        let mut token = Token::new(TokenKind::Str, out, line, col);
        token.quote = Some(quote);
        Ok(token)
    }

    fn read_env_var(&mut self, line: usize, col: usize) -> Result<Token, ParseError> {
        self.consume_str("${");
        let start = self.pos;
        let mut depth = 1usize;
        loop {
            match self.advance() {
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
                None => return Err(self.error("Unmatched '${'", line, col)),
            }
        }
        let inner = &self.input[start..self.pos - 1];
        Ok(Token::new(TokenKind::EnvVar, inner.trim(), line, col))
    }

    /// `<<TAG` directly followed by end of line starts a heredoc; the body
    /// runs up to the first line exactly equal to `TAG` and lexing resumes
    /// after it.
    fn try_heredoc(&mut self, line: usize, col: usize) -> Result<Option<Token>, ParseError> {
        let rest = &self.input[self.pos + 2..];
        let tag_len = rest
            .char_indices()
            .take_while(|&(i, c)| {
                if i == 0 {
                    is_identifier_start(c)
                } else {
                    is_identifier_continue(c)
                }
            })
            .count();
        if tag_len == 0 {
            return Ok(None);
        }
        let tag = &rest[..tag_len];
        let after_tag = &rest[tag_len..];
        let line_rest = after_tag.split('\n').next().unwrap_or("");
        if !line_rest.trim().is_empty() || !after_tag.contains('\n') {
            return Ok(None);
        }

        let body_start = self.pos + 2 + tag_len + line_rest.len() + 1;
        let mut offset = body_start;
        let mut terminator = None;
        for raw in self.input[body_start..].split_inclusive('\n') {
            if raw.trim_end_matches(['\n', '\r']) == tag {
                terminator = Some((offset, offset + raw.len()));
                break;
            }
            offset += raw.len();
        }
        let Some((term_start, term_end)) = terminator else {
            return Err(self.error(
                format!(
                    "Unterminated heredoc '{0}' (for a shift, write '<< {0}')",
                    tag
                ),
                line,
                col,
            ));
        };

        let content = self.input[body_start..term_start]
            .strip_suffix('\n')
            .unwrap_or(&self.input[body_start..term_start])
            .trim_end_matches('\r')
            .to_string();
        let tag = tag.to_string();

        // Resume on the remaining input, just past the terminator line
        // (its newline is left for the whitespace skipper).
        let resume = if self.input[..term_end].ends_with('\n') {
            term_end - 1
        } else {
            term_end
        };
        while self.pos < resume {
            self.advance();
        }

        let mut token = Token::new(TokenKind::Heredoc, content, line, col);
        token.delimiter = Some(tag);
        Ok(Some(token))
    }
}
