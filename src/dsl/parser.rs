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

use serde::{Deserialize, Serialize};

use crate::confparse::{split_args, unquote};
use crate::diagnostics::{Diagnostics, Landmark};
use crate::dsl::lexer::{Lexer, Token, TokenKind};
use crate::errors::RouterError;
use crate::graph::{CompoundType, PortRef, RouterGraph, INPUT_PORT_ELEMENT, OUTPUT_PORT_ELEMENT};
use crate::registry::ClassRegistry;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Treat `# N "file"` lines as comments instead of landmark updates.
    pub ignore_line_directives: bool,
}

/// Marks a statement abandoned after its error was recorded.
struct Abort;

type Parsed<T> = std::result::Result<T, Abort>;

struct Source {
    lexer: Lexer,
    /// Archive member this text was spliced from by `require(library ...)`.
    library: Option<String>,
}

/// A compound body being parsed; statements go into `graph` until its `}`.
struct Body {
    name: String,
    formals: Vec<String>,
    graph: RouterGraph,
    landmark: Landmark,
}

/// One end of a connection as written: `[in] element [out]`.
struct Endpoint {
    element: String,
    input: Option<u32>,
    output: Option<u32>,
    landmark: Landmark,
}

/// Pull cursor over configuration text.
///
/// Each [`StatementParser::next_statement`] call consumes one statement and
/// applies it to the caller's [`RouterGraph`]; problems are recorded in the
/// caller's [`Diagnostics`] and the cursor skips to the next statement.
/// [`StatementParser::finish`] expands compounds and resolves references.
pub struct StatementParser<'g> {
    sources: Vec<Source>,
    graph: &'g mut RouterGraph,
    diag: &'g mut Diagnostics,
    bodies: Vec<Body>,
    registry: Option<&'g dyn ClassRegistry>,
    ignore_line_directives: bool,
}

impl<'g> StatementParser<'g> {
    pub fn new(
        text: impl Into<String>,
        landmark: &Landmark,
        graph: &'g mut RouterGraph,
        diag: &'g mut Diagnostics,
    ) -> Self {
        Self {
            sources: vec![Source {
                lexer: Lexer::new(text, landmark),
                library: None,
            }],
            graph,
            diag,
            bodies: Vec::new(),
            registry: None,
            ignore_line_directives: false,
        }
    }

    pub fn with_config(mut self, config: &ParserConfig) -> Self {
        self.ignore_line_directives = config.ignore_line_directives;
        self.sources = self
            .sources
            .into_iter()
            .map(|source| Source {
                lexer: source.lexer.ignore_line_directives(config.ignore_line_directives),
                library: source.library,
            })
            .collect();
        self
    }

    pub fn with_registry(mut self, registry: Option<&'g dyn ClassRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn next_token(&mut self) -> Token {
        loop {
            let token = match self.sources.last_mut() {
                Some(source) => source.lexer.next_token(self.diag),
                None => {
                    return Token {
                        kind: TokenKind::Eof,
                        landmark: Landmark::default(),
                    }
                }
            };
            if token.kind == TokenKind::Eof && self.sources.len() > 1 {
                self.sources.pop();
                continue;
            }
            return token;
        }
    }

    fn unlex(&mut self, token: Token) {
        if let Some(source) = self.sources.last_mut() {
            source.lexer.unlex(token);
        }
    }

    fn peek(&mut self) -> Token {
        let token = self.next_token();
        self.unlex(token.clone());
        token
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Parsed<Token> {
        let token = self.next_token();
        if token.kind == kind {
            Ok(token)
        } else {
            self.syntax_error(&token, context)
        }
    }

    fn syntax_error<T>(&mut self, near: &Token, context: &str) -> Parsed<T> {
        self.diag.error(
            &near.landmark,
            format!("syntax error near {}: {}", near.kind, context),
        );
        self.unlex(near.clone());
        Err(Abort)
    }

    /// Graph receiving the current statement: the innermost open compound
    /// body, or the router itself.
    fn target(&mut self) -> &mut RouterGraph {
        match self.bodies.last_mut() {
            Some(body) => &mut body.graph,
            None => &mut *self.graph,
        }
    }

    fn in_body(&self) -> bool {
        !self.bodies.is_empty()
    }

    /// Whether `name` is a compound in scope or a registry class.
    fn is_known_class(&self, name: &str) -> bool {
        self.bodies.iter().any(|body| body.graph.compound(name).is_some())
            || self.graph.compound(name).is_some()
            || self.registry.is_some_and(|registry| registry.contains(name))
    }

    fn report(&mut self, landmark: &Landmark, err: RouterError) {
        let message = match err {
            RouterError::Validation { message } => message,
            other => other.to_string(),
        };
        self.diag.error(landmark, message);
    }

    /// Skips to the end of the current statement.
    fn resync(&mut self) {
        loop {
            let token = self.next_token();
            match token.kind {
                TokenKind::Semicolon => return,
                TokenKind::RBrace | TokenKind::Eof => {
                    self.unlex(token);
                    return;
                }
                _ => {}
            }
        }
    }

    /// Parses one statement. Returns false once the input is exhausted.
    pub fn next_statement(&mut self) -> bool {
        let token = self.next_token();
        let outcome = match token.kind {
            TokenKind::Eof => {
                self.close_unterminated_bodies();
                return false;
            }
            TokenKind::Semicolon => Ok(()),
            TokenKind::RBrace => {
                self.close_body(&token);
                Ok(())
            }
            TokenKind::ElementClass => self.parse_elementclass(&token),
            TokenKind::Require => self.parse_require(&token),
            _ => {
                self.unlex(token);
                self.parse_connection()
            }
        };
        if outcome.is_err() {
            self.resync();
        }
        true
    }

    fn end_statement(&mut self) -> Parsed<()> {
        let token = self.next_token();
        match token.kind {
            TokenKind::Semicolon => Ok(()),
            TokenKind::RBrace | TokenKind::Eof => {
                self.unlex(token);
                Ok(())
            }
            _ => self.syntax_error(&token, "expected `;`"),
        }
    }

    /// Consumes the remaining statements, then expands compounds and
    /// resolves references in the graph.
    pub fn finish(mut self) {
        while self.next_statement() {}
        self.graph.finalize(self.registry, self.diag);
    }

    fn parse_connection(&mut self) -> Parsed<()> {
        let mut previous = self.parse_endpoint(true)?;
        if previous.input.is_some() {
            self.diag.error(&previous.landmark, "input port with no connection");
        }

        while self.peek().kind == TokenKind::Arrow {
            let arrow = self.next_token();
            let next = self.parse_endpoint(false)?;
            let from = PortRef::new(previous.element.clone(), previous.output.unwrap_or(0));
            let to = PortRef::new(next.element.clone(), next.input.unwrap_or(0));
            self.target().connect(from, to, arrow.landmark);
            previous = next;
        }

        if previous.output.is_some() {
            self.diag.error(&previous.landmark, "output port with no connection");
        }
        self.end_statement()
    }

    fn parse_port(&mut self) -> Parsed<Option<u32>> {
        if self.peek().kind != TokenKind::LBracket {
            return Ok(None);
        }
        self.next_token();
        let token = self.next_token();
        let port = match &token.kind {
            TokenKind::Ident(digits) => digits.parse::<u32>().ok(),
            _ => None,
        };
        let Some(port) = port else {
            self.diag.error(&token.landmark, format!("bad port number {}", token.kind));
            self.unlex(token);
            return Err(Abort);
        };
        self.expect(TokenKind::RBracket, "expected `]` after port number")?;
        Ok(Some(port))
    }

    fn parse_endpoint(&mut self, first: bool) -> Parsed<Endpoint> {
        let input = self.parse_port()?;
        let token = self.next_token();
        let TokenKind::Ident(name) = token.kind.clone() else {
            return self.syntax_error(&token, "expected element name");
        };
        let element = self.parse_element(name, &token.landmark, first)?;
        let output = self.parse_port()?;
        Ok(Endpoint {
            element,
            input,
            output,
            landmark: token.landmark,
        })
    }

    /// Parses what follows an identifier inside a connection and returns
    /// the element name it denotes.
    fn parse_element(&mut self, name: String, landmark: &Landmark, first: bool) -> Parsed<String> {
        let next = self.next_token();
        match next.kind {
            TokenKind::ColonColon => {
                let (class, config) = self.parse_class()?;
                self.declare(&name, &class, &config, landmark);
                Ok(name)
            }
            TokenKind::Comma if first => {
                let mut names = vec![name];
                loop {
                    let token = self.next_token();
                    let TokenKind::Ident(more) = token.kind.clone() else {
                        return self.syntax_error(&token, "expected element name");
                    };
                    names.push(more);
                    let sep = self.next_token();
                    match sep.kind {
                        TokenKind::Comma => continue,
                        TokenKind::ColonColon => break,
                        _ => return self.syntax_error(&sep, "expected `::` after element names"),
                    }
                }
                let (class, config) = self.parse_class()?;
                for name in &names {
                    self.declare(name, &class, &config, landmark);
                }
                let arrow = self.peek();
                if arrow.kind == TokenKind::Arrow {
                    self.diag.error(&arrow.landmark, "element list cannot be connected");
                    return Err(Abort);
                }
                Ok(names.remove(names.len() - 1))
            }
            TokenKind::LParen => {
                let config = self.lex_config();
                self.declare_anonymous(&name, &config, landmark)
            }
            _ => {
                self.unlex(next);
                if self.target().has_element(&name)
                    || (self.in_body() && (name == INPUT_PORT_ELEMENT || name == OUTPUT_PORT_ELEMENT))
                    || !self.is_known_class(&name)
                {
                    Ok(name)
                } else {
                    self.declare_anonymous(&name, "", landmark)
                }
            }
        }
    }

    fn parse_class(&mut self) -> Parsed<(String, String)> {
        let token = self.next_token();
        let TokenKind::Ident(class) = token.kind.clone() else {
            return self.syntax_error(&token, "expected element class after `::`");
        };
        let config = if self.peek().kind == TokenKind::LParen {
            self.next_token();
            self.lex_config()
        } else {
            String::new()
        };
        Ok((class, config))
    }

    fn lex_config(&mut self) -> String {
        match self.sources.last_mut() {
            Some(source) => source.lexer.lex_config(self.diag),
            None => String::new(),
        }
    }

    fn declare(&mut self, name: &str, class: &str, config: &str, landmark: &Landmark) {
        if self.in_body() && (name == INPUT_PORT_ELEMENT || name == OUTPUT_PORT_ELEMENT) {
            self.diag.error(
                landmark,
                format!("`{}` is reserved inside element classes", name),
            );
            return;
        }
        if let Err(err) = self.target().declare_element(name, class, config, landmark.clone()) {
            self.report(landmark, err);
        }
    }

    fn declare_anonymous(&mut self, class: &str, config: &str, landmark: &Landmark) -> Parsed<String> {
        match self.target().declare_anonymous(class, config, landmark.clone()) {
            Ok(name) => Ok(name),
            Err(err) => {
                self.report(landmark, err);
                Err(Abort)
            }
        }
    }

    /// `elementclass Name { [$a, $b |] body }` or `elementclass Name Other;`
    fn parse_elementclass(&mut self, keyword: &Token) -> Parsed<()> {
        let token = self.next_token();
        let TokenKind::Ident(name) = token.kind.clone() else {
            return self.syntax_error(&token, "expected element class name");
        };

        let next = self.next_token();
        match next.kind {
            TokenKind::Ident(target) => {
                let compound = CompoundType::synonym(name, target, keyword.landmark.clone());
                if let Err(err) = self.target().define_compound(compound) {
                    self.report(&keyword.landmark, err);
                }
                self.end_statement()
            }
            TokenKind::LBrace => {
                let formals = self.parse_formals()?;
                self.bodies.push(Body {
                    name,
                    formals,
                    graph: RouterGraph::new(),
                    landmark: keyword.landmark.clone(),
                });
                Ok(())
            }
            _ => self.syntax_error(&next, "expected `{` or class name"),
        }
    }

    fn parse_formals(&mut self) -> Parsed<Vec<String>> {
        let mut formals = Vec::new();
        if !matches!(self.peek().kind, TokenKind::Variable(_)) {
            return Ok(formals);
        }
        loop {
            let token = self.next_token();
            let TokenKind::Variable(formal) = token.kind.clone() else {
                return self.syntax_error(&token, "expected `$parameter`");
            };
            if formals.contains(&formal) {
                self.diag.error(&token.landmark, format!("repeated parameter `${}`", formal));
            }
            formals.push(formal);

            let sep = self.next_token();
            match sep.kind {
                TokenKind::Comma => continue,
                TokenKind::Bar => return Ok(formals),
                _ => return self.syntax_error(&sep, "expected `,` or `|` after parameter"),
            }
        }
    }

    fn close_body(&mut self, brace: &Token) {
        let Some(body) = self.bodies.pop() else {
            self.diag.error(&brace.landmark, "unmatched `}`");
            return;
        };
        let landmark = body.landmark.clone();
        let compound = CompoundType::body(body.name, body.formals, body.graph, body.landmark);
        if let Err(err) = self.target().define_compound(compound) {
            self.report(&landmark, err);
        }
    }

    fn close_unterminated_bodies(&mut self) {
        while let Some(body) = self.bodies.last() {
            let landmark = body.landmark.clone();
            let name = body.name.clone();
            self.diag.error(&landmark, format!("unterminated element class `{}`", name));
            self.close_body(&Token {
                kind: TokenKind::RBrace,
                landmark,
            });
        }
    }

    /// `require(item, ...)`. `library NAME` splices the live archive member
    /// `NAME` here; other items are kept as graph requirements.
    fn parse_require(&mut self, keyword: &Token) -> Parsed<()> {
        self.expect(TokenKind::LParen, "expected `(` after `require`")?;
        let items = self.lex_config();
        let mut libraries = Vec::new();
        for item in split_args(&items) {
            match item.split_once(char::is_whitespace) {
                Some(("library", name)) => libraries.push(unquote(name)),
                _ if item.is_empty() => {}
                _ => self.graph.add_requirement(item),
            }
        }
        self.end_statement()?;
        // Spliced in reverse so the first library is read first.
        for library in libraries.into_iter().rev() {
            self.splice_library(&library, &keyword.landmark);
        }
        Ok(())
    }

    fn splice_library(&mut self, name: &str, landmark: &Landmark) {
        let recursive = self
            .sources
            .iter()
            .any(|source| source.library.as_deref() == Some(name));
        if recursive {
            self.diag
                .error(landmark, format!("recursive inclusion of library `{}`", name));
            return;
        }
        let Some(entry) = self.graph.archive().find_live(name) else {
            self.diag
                .error(landmark, format!("library `{}` not found in archive", name));
            return;
        };
        let text = entry.text().into_owned();
        log::debug!("splicing library `{}` ({} bytes)", name, text.len());
        let lexer = Lexer::new(text, &Landmark::file(name))
            .ignore_line_directives(self.ignore_line_directives);
        self.sources.push(Source {
            lexer,
            library: Some(name.to_string()),
        });
    }
}
