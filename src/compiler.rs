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

//! # Compiler Façade
//!
//! Reading: bytes are tried as an archive first. An archive must have a live
//! `config` member, which becomes the configuration text; its other live
//! members ride along as the graph's carried archive. Anything else is read
//! as plain text.
//!
//! Writing mirrors reading: the graph is rendered to text, and if it carries
//! live members other than `config` the text is wrapped in a new archive
//! together with them.

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::{self, Archive, ArchiveEntry, CONFIG_SECTION};
use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostics, Landmark};
use crate::dsl::StatementParser;
use crate::errors::{ArchiveError, Result, RouterError};
use crate::graph::RouterGraph;
use crate::registry::ClassRegistry;

/// A finished compile: the graph and every diagnostic recorded on the way.
#[derive(Debug)]
pub struct Compilation {
    pub graph: RouterGraph,
    pub diagnostics: Diagnostics,
}

impl Compilation {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.nerrors() == 0
    }
}

/// Where [`RouterCompiler::write`] sends its output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    Path(PathBuf),
}

impl OutputTarget {
    /// `-` names standard output; anything else is a file path.
    pub fn parse(name: &str) -> Self {
        if name == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::Path(PathBuf::from(name))
        }
    }
}

impl From<&str> for OutputTarget {
    fn from(name: &str) -> Self {
        OutputTarget::parse(name)
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("<stdout>"),
            OutputTarget::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Clone, Default)]
pub struct RouterCompiler {
    config: CompilerConfig,
    registry: Option<Arc<dyn ClassRegistry>>,
}

impl fmt::Debug for RouterCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterCompiler")
            .field("config", &self.config)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

impl RouterCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration. A non-empty `known_classes` list installs
    /// a registry unless one was set explicitly.
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        if self.registry.is_none() {
            if let Some(registry) = config.registry() {
                self.registry = Some(Arc::new(registry));
            }
        }
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn ClassRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.config.allow_empty = allow_empty;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> Option<&dyn ClassRegistry> {
        self.registry.as_deref()
    }

    /// Compiles `bytes`, failing with [`RouterError::Compile`] if any error
    /// was recorded (or any warning, in strict mode).
    pub fn read(&self, bytes: &[u8], landmark: &Landmark, allow_empty: bool) -> Result<Compilation> {
        let compilation = self.compile(bytes, landmark, allow_empty)?;
        let diagnostics = &compilation.diagnostics;
        let failed = diagnostics.nerrors() > 0 || (self.config.strict && diagnostics.nwarnings() > 0);
        if failed {
            return Err(RouterError::Compile {
                landmark: landmark.to_string(),
                diagnostics: compilation.diagnostics,
            });
        }
        Ok(compilation)
    }

    /// Like [`RouterCompiler::read`], but returns the partial graph and its
    /// diagnostics even when errors were recorded. Only archive and IO
    /// failures are returned as errors.
    pub fn read_best_effort(&self, bytes: &[u8], landmark: &Landmark) -> Result<Compilation> {
        self.compile(bytes, landmark, self.config.allow_empty)
    }

    /// Reads and compiles a file; `-` reads standard input.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Compilation> {
        let path = path.as_ref();
        let label = path.to_string_lossy();
        let bytes = if label == "-" {
            let mut bytes = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .map_err(|e| RouterError::io_at("<stdin>", e))?;
            bytes
        } else {
            fs::read(path).map_err(|e| RouterError::io_at(path, e))?
        };
        self.read(&bytes, &Landmark::for_path(&label), self.config.allow_empty)
    }

    /// Compiles a configuration given directly as text.
    pub fn read_expr(&self, text: &str) -> Result<Compilation> {
        self.read(text.as_bytes(), &Landmark::file("<expr>"), self.config.allow_empty)
    }

    fn compile(&self, bytes: &[u8], landmark: &Landmark, allow_empty: bool) -> Result<Compilation> {
        let mut graph = RouterGraph::new();
        let text = match archive::decode(bytes)? {
            Some(archive) => {
                let text = archive
                    .find_live(CONFIG_SECTION)
                    .ok_or(ArchiveError::MissingConfig)?
                    .text()
                    .into_owned();
                let carried: Archive = archive
                    .into_entries()
                    .into_iter()
                    .filter(|entry| entry.live && entry.name != CONFIG_SECTION)
                    .collect();
                log::debug!("{}: archive carries {} member(s)", landmark, carried.len());
                graph.set_archive(carried);
                text
            }
            None => String::from_utf8_lossy(bytes).into_owned(),
        };

        let mut diagnostics = Diagnostics::new();
        if text.trim().is_empty() && !allow_empty {
            diagnostics.warning(landmark, "empty configuration");
        }

        StatementParser::new(text, landmark, &mut graph, &mut diagnostics)
            .with_config(&self.config.parser)
            .with_registry(self.registry())
            .finish();

        log::info!(
            "{}: {} element(s), {} connection(s), {} error(s), {} warning(s)",
            landmark,
            graph.element_count(),
            graph.connection_count(),
            diagnostics.nerrors(),
            diagnostics.nwarnings()
        );
        Ok(Compilation { graph, diagnostics })
    }

    /// Output bytes for `graph`: plain text, or an archive when the graph
    /// carries live members besides `config`.
    pub fn render(&self, graph: &RouterGraph) -> Result<Vec<u8>> {
        let text = graph.to_text();
        if !graph.archive().has_live_except(CONFIG_SECTION) {
            return Ok(text.into_bytes());
        }

        let mut archive = Archive::new();
        archive.push(ArchiveEntry::stamped(CONFIG_SECTION, text, self.config.default_mode));
        for entry in graph.archive().live().filter(|e| e.name != CONFIG_SECTION) {
            archive.push(entry.clone());
        }
        Ok(archive::encode(&archive)?)
    }

    pub fn write_to<W: Write>(&self, graph: &RouterGraph, out: &mut W) -> Result<()> {
        let bytes = self.render(graph)?;
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(())
    }

    pub fn write(&self, graph: &RouterGraph, target: &OutputTarget) -> Result<()> {
        match target {
            OutputTarget::Stdout => self
                .write_to(graph, &mut io::stdout().lock())
                .map_err(|e| match e {
                    RouterError::Io(message) => RouterError::Io(format!("<stdout>: {}", message)),
                    other => other,
                }),
            OutputTarget::Path(path) => {
                let bytes = self.render(graph)?;
                fs::write(path, bytes).map_err(|e| RouterError::io_at(path, e))
            }
        }
    }
}
