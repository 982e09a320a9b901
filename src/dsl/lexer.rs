//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Configuration Lexer
//!
//! Splits router configuration text into tokens, tracking the landmark
//! (file label and line) of each one.
//!
//! ## Lexical rules
//!
//! - Identifiers are runs of letters, digits, `_`, `@`, `/` and `.`; a `/`
//!   starting a comment ends the identifier. `elementclass` and `require`
//!   are keywords.
//! - `$name` is a compound parameter.
//! - `//` and `/* */` comments are skipped.
//! - A line starting with `# N "file"` or `#line N "file"` resets the
//!   landmark. With `ignore_line_directives` such lines are skipped like
//!   comments.
//! - Configuration strings are not tokenized; after `(` the parser asks for
//!   the raw text up to the matching `)` with [`Lexer::lex_config`].

use std::fmt;

use crate::diagnostics::{Diagnostics, Landmark};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Variable(String),
    ElementClass,
    Require,
    /// `::`
    ColonColon,
    /// `->`
    Arrow,
    Comma,
    Semicolon,
    Bar,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Other(char),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "`{}`", name),
            TokenKind::Variable(name) => write!(f, "`${}`", name),
            TokenKind::ElementClass => f.write_str("`elementclass`"),
            TokenKind::Require => f.write_str("`require`"),
            TokenKind::ColonColon => f.write_str("`::`"),
            TokenKind::Arrow => f.write_str("`->`"),
            TokenKind::Comma => f.write_str("`,`"),
            TokenKind::Semicolon => f.write_str("`;`"),
            TokenKind::Bar => f.write_str("`|`"),
            TokenKind::LParen => f.write_str("`(`"),
            TokenKind::RParen => f.write_str("`)`"),
            TokenKind::LBracket => f.write_str("`[`"),
            TokenKind::RBracket => f.write_str("`]`"),
            TokenKind::LBrace => f.write_str("`{`"),
            TokenKind::RBrace => f.write_str("`}`"),
            TokenKind::Other(c) => write!(f, "`{}`", c),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub landmark: Landmark,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'/' | b'.')
}

const KEYWORDS: [&str; 2] = ["elementclass", "require"];

/// Whether `word` lexes back as one identifier token.
pub fn is_identifier(word: &str) -> bool {
    !word.is_empty()
        && word.bytes().all(is_ident_byte)
        && !word.contains("//")
        && !word.contains("/*")
        && !KEYWORDS.contains(&word)
}

/// Whether `config`, written between parentheses, lexes back unchanged.
pub fn is_verbatim_config(config: &str) -> bool {
    let mut lexer = Lexer::new(format!("{})", config), &Landmark::default());
    let mut diag = Diagnostics::new();
    let relexed = lexer.lex_config(&mut diag);
    diag.nerrors() == 0 && lexer.pos == lexer.text.len() && relexed == config
}

#[derive(Debug)]
pub struct Lexer {
    text: String,
    pos: usize,
    file: String,
    line: u32,
    at_line_start: bool,
    ignore_line_directives: bool,
    pushback: Vec<Token>,
}

impl Lexer {
    /// Lexer over `text`, labelling tokens with `landmark`. Lines count from
    /// the landmark's line, or from 1 when it has none.
    pub fn new(text: impl Into<String>, landmark: &Landmark) -> Self {
        Self {
            text: text.into(),
            pos: 0,
            file: landmark.file.clone(),
            line: landmark.line.max(1),
            at_line_start: true,
            ignore_line_directives: false,
            pushback: Vec::new(),
        }
    }

    pub fn ignore_line_directives(mut self, ignore: bool) -> Self {
        self.ignore_line_directives = ignore;
        self
    }

    pub fn landmark(&self) -> Landmark {
        Landmark::new(self.file.clone(), self.line)
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + ahead).copied()
    }

    fn newline(&mut self) {
        self.line += 1;
        self.at_line_start = true;
    }

    /// Returns a token to the stream; it is the next one read.
    pub fn unlex(&mut self, token: Token) {
        self.pushback.push(token);
    }

    pub fn next_token(&mut self, diag: &mut Diagnostics) -> Token {
        if let Some(token) = self.pushback.pop() {
            return token;
        }
        self.skip_blanks(diag);

        let landmark = self.landmark();
        let Some(b) = self.peek_byte(0) else {
            return Token {
                kind: TokenKind::Eof,
                landmark,
            };
        };
        self.at_line_start = false;

        let kind = match b {
            b':' if self.peek_byte(1) == Some(b':') => {
                self.pos += 2;
                TokenKind::ColonColon
            }
            b'-' if self.peek_byte(1) == Some(b'>') => {
                self.pos += 2;
                TokenKind::Arrow
            }
            b'$' => {
                self.pos += 1;
                let name = self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_');
                TokenKind::Variable(name)
            }
            b if is_ident_byte(b) => {
                let word = self.take_ident();
                match word.as_str() {
                    "elementclass" => TokenKind::ElementClass,
                    "require" => TokenKind::Require,
                    _ => TokenKind::Ident(word),
                }
            }
            _ => {
                let c = self.text[self.pos..].chars().next().unwrap_or('\0');
                self.pos += c.len_utf8();
                match c {
                    ',' => TokenKind::Comma,
                    ';' => TokenKind::Semicolon,
                    '|' => TokenKind::Bar,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    other => TokenKind::Other(other),
                }
            }
        };
        Token { kind, landmark }
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek_byte(0).is_some_and(&keep) {
            self.pos += 1;
        }
        self.text[start..self.pos].to_string()
    }

    fn take_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek_byte(0) {
            let comment = b == b'/' && matches!(self.peek_byte(1), Some(b'/') | Some(b'*'));
            if !is_ident_byte(b) || comment {
                break;
            }
            self.pos += 1;
        }
        self.text[start..self.pos].to_string()
    }

    /// Skips whitespace, comments and line directives.
    fn skip_blanks(&mut self, diag: &mut Diagnostics) {
        while let Some(b) = self.peek_byte(0) {
            match b {
                b'\n' => {
                    self.pos += 1;
                    self.newline();
                }
                b' ' | b'\t' | b'\r' | b'\x0c' => self.pos += 1,
                b'#' if self.at_line_start => self.line_directive(diag),
                b'/' if self.peek_byte(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek_byte(1) == Some(b'*') => {
                    self.skip_block_comment(diag);
                    self.at_line_start = false;
                }
                _ => return,
            }
        }
    }

    fn skip_line(&mut self) {
        match self.text[self.pos..].find('\n') {
            Some(n) => self.pos += n,
            None => self.pos = self.text.len(),
        }
    }

    fn skip_block_comment(&mut self, diag: &mut Diagnostics) {
        let start = self.landmark();
        self.pos += 2;
        loop {
            match self.peek_byte(0) {
                None => {
                    diag.error(&start, "unterminated comment");
                    return;
                }
                Some(b'*') if self.peek_byte(1) == Some(b'/') => {
                    self.pos += 2;
                    return;
                }
                Some(b'\n') => {
                    self.pos += 1;
                    self.line += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Handles `# N "file"` and `#line N "file"` at the start of a line.
    fn line_directive(&mut self, diag: &mut Diagnostics) {
        let start = self.pos;
        self.skip_line();
        if self.ignore_line_directives {
            return;
        }

        let directive = self.text[start + 1..self.pos].trim();
        let directive = directive
            .strip_prefix("line")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .unwrap_or(directive)
            .trim_start();
        let (number, rest) = directive
            .split_once(char::is_whitespace)
            .unwrap_or((directive, ""));

        let Ok(line) = number.parse::<u32>() else {
            diag.warning(&self.landmark(), "unknown preprocessor directive");
            return;
        };
        let rest = rest.trim();
        if let Some(file) = rest.strip_prefix('"').and_then(|r| r.split('"').next()) {
            self.file = file.to_string();
        } else if !rest.is_empty() {
            diag.warning(&self.landmark(), "malformed line directive");
        }
        // The newline ending the directive line advances to `line`.
        self.line = line.saturating_sub(1);
    }

    /// Reads the raw configuration string after a `(`, consuming the
    /// matching `)`. Comments are removed; quoted text and nested brackets
    /// are kept verbatim. The result is trimmed.
    pub fn lex_config(&mut self, diag: &mut Diagnostics) -> String {
        let start = self.landmark();
        let mut out = String::new();
        let mut depth = 0usize;
        let mut copied = self.pos;

        while let Some(b) = self.peek_byte(0) {
            match b {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b'"' | b'\'' => self.skip_quoted(b),
                b'/' if self.peek_byte(1) == Some(b'/') => {
                    out.push_str(&self.text[copied..self.pos]);
                    self.skip_line();
                    copied = self.pos;
                }
                b'/' if self.peek_byte(1) == Some(b'*') => {
                    out.push_str(&self.text[copied..self.pos]);
                    self.skip_block_comment(diag);
                    out.push(' ');
                    copied = self.pos;
                }
                b'(' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' if depth == 0 => {
                    out.push_str(&self.text[copied..self.pos]);
                    self.pos += 1;
                    self.at_line_start = false;
                    return out.trim().to_string();
                }
                b')' => {
                    depth -= 1;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }

        diag.error(&start, "unterminated configuration string");
        out.push_str(&self.text[copied..]);
        out.trim().to_string()
    }

    fn skip_quoted(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek_byte(0) {
            self.pos += 1;
            match b {
                b'\\' if quote == b'"' => self.pos = (self.pos + 1).min(self.text.len()),
                b'\n' => self.line += 1,
                b if b == quote => return,
                _ => {}
            }
        }
    }
}
