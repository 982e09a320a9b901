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

//! # Router Graph Model
//!
//! The mutable graph populated by the statement parser: element
//! declarations, port-to-port connections, compound element classes, the
//! `require` list, and the archive carried alongside the configuration.
//!
//! Mutations check only local well-formedness (a name declared twice, a
//! compound defined twice). Cross references are checked by
//! [`RouterGraph::resolve`] once parsing is over, after compound instances
//! have been expanded by [`RouterGraph::flatten`].
//!
//! ## Text form
//!
//! [`RouterGraph::to_text`] writes requirements, then declarations in
//! declaration order, then connections in connection order, then compound
//! definitions:
//!
//! ```text
//! a :: Class1;
//! b :: Class2(10, 20);
//! a -> b;
//! a [1] -> [2] b;
//! elementclass Pipe {
//!   input -> q :: Queue -> output;
//! }
//! ```

mod expand;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::archive::{Archive, ArchiveEntry};
use crate::diagnostics::Landmark;
use crate::dsl::lexer::{is_identifier, is_verbatim_config};
use crate::errors::{Result, RouterError};

pub use expand::{INPUT_PORT_ELEMENT, OUTPUT_PORT_ELEMENT};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ElementDecl {
    pub name: String,
    pub class: String,
    pub configuration: String,
    pub landmark: Landmark,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PortRef {
    pub element: String,
    pub port: u32,
}

impl PortRef {
    pub fn new(element: impl Into<String>, port: u32) -> Self {
        Self {
            element: element.into(),
            port,
        }
    }
}

impl From<&str> for PortRef {
    fn from(element: &str) -> Self {
        PortRef::new(element, 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
    pub landmark: Landmark,
}

impl Connection {
    /// Endpoints without the landmark, for comparing topologies.
    pub fn endpoints(&self) -> (PortRef, PortRef) {
        (self.from.clone(), self.to.clone())
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.from.element)?;
        if self.from.port != 0 {
            write!(f, " [{}]", self.from.port)?;
        }
        write!(f, " -> ")?;
        if self.to.port != 0 {
            write!(f, "[{}] ", self.to.port)?;
        }
        write!(f, "{}", self.to.element)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CompoundKind {
    /// `elementclass Name { $a, $b | body }`
    Body {
        formals: Vec<String>,
        body: Box<RouterGraph>,
    },
    /// `elementclass Name Other;`
    Synonym(String),
}

/// A named element class defined in the configuration itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompoundType {
    pub name: String,
    pub kind: CompoundKind,
    pub landmark: Landmark,
}

impl CompoundType {
    pub fn body(
        name: impl Into<String>,
        formals: Vec<String>,
        body: RouterGraph,
        landmark: Landmark,
    ) -> Self {
        Self {
            name: name.into(),
            kind: CompoundKind::Body {
                formals,
                body: Box::new(body),
            },
            landmark,
        }
    }

    pub fn synonym(name: impl Into<String>, target: impl Into<String>, landmark: Landmark) -> Self {
        Self {
            name: name.into(),
            kind: CompoundKind::Synonym(target.into()),
            landmark,
        }
    }

    fn write_text(&self, out: &mut String, indent: &str) {
        match &self.kind {
            CompoundKind::Synonym(target) => {
                out.push_str(&format!("{}elementclass {} {};\n", indent, self.name, target));
            }
            CompoundKind::Body { formals, body } => {
                out.push_str(&format!("{}elementclass {} {{\n", indent, self.name));
                let inner = format!("{}  ", indent);
                if !formals.is_empty() {
                    let formals: Vec<String> = formals.iter().map(|f| format!("${}", f)).collect();
                    out.push_str(&format!("{}{} |\n", inner, formals.join(", ")));
                }
                body.write_text(out, &inner);
                out.push_str(&format!("{}}}\n", indent));
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouterGraph {
    elements: Vec<ElementDecl>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    compounds: Vec<CompoundType>,
    requirements: Vec<String>,
    archive: Archive,
}

impl RouterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an element. Names are unique within the graph, and names,
    /// classes and configurations must read back from [`RouterGraph::to_text`]
    /// unchanged.
    pub fn declare_element(
        &mut self,
        name: impl Into<String>,
        class: impl Into<String>,
        configuration: impl Into<String>,
        landmark: Landmark,
    ) -> Result<()> {
        let name = name.into();
        let class = class.into();
        let configuration = configuration.into();
        if !is_identifier(&name) {
            return Err(RouterError::validation(format!(
                "element name `{}` is not an identifier",
                name
            )));
        }
        if !is_identifier(&class) {
            return Err(RouterError::validation(format!(
                "element class `{}` of `{}` is not an identifier",
                class, name
            )));
        }
        if !is_verbatim_config(&configuration) {
            return Err(RouterError::validation(format!(
                "configuration of `{}` does not read back verbatim: `{}`",
                name, configuration
            )));
        }
        if self.index.contains_key(&name) {
            return Err(RouterError::validation(format!(
                "redeclaration of element `{}`",
                name
            )));
        }
        self.index.insert(name.clone(), self.elements.len());
        self.elements.push(ElementDecl {
            name,
            class,
            configuration,
            landmark,
        });
        Ok(())
    }

    /// Declares an element named after its class, `Class@N`, and returns
    /// the generated name.
    pub fn declare_anonymous(
        &mut self,
        class: impl Into<String>,
        configuration: impl Into<String>,
        landmark: Landmark,
    ) -> Result<String> {
        let class = class.into();
        let mut n = self.elements.len() + 1;
        let mut name = format!("{}@{}", class, n);
        while self.index.contains_key(&name) {
            n += 1;
            name = format!("{}@{}", class, n);
        }
        self.declare_element(name.clone(), class, configuration, landmark)?;
        Ok(name)
    }

    /// Records a connection. Endpoints may name elements declared later.
    pub fn connect(&mut self, from: PortRef, to: PortRef, landmark: Landmark) {
        self.connections.push(Connection { from, to, landmark });
    }

    /// Defines a compound element class. A second definition of the same
    /// name in this graph is rejected.
    pub fn define_compound(&mut self, compound: CompoundType) -> Result<()> {
        if self.compound(&compound.name).is_some() {
            return Err(RouterError::validation(format!(
                "redefinition of element class `{}`",
                compound.name
            )));
        }
        self.compounds.push(compound);
        Ok(())
    }

    pub fn add_requirement(&mut self, requirement: impl Into<String>) {
        let requirement = requirement.into();
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
    }

    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.index.get(name).map(|&i| &self.elements[i])
    }

    pub fn has_element(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn elements(&self) -> &[ElementDecl] {
        &self.elements
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn compound(&self, name: &str) -> Option<&CompoundType> {
        self.compounds.iter().find(|c| c.name == name)
    }

    pub fn compounds(&self) -> &[CompoundType] {
        &self.compounds
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.connections.is_empty() && self.compounds.is_empty()
    }

    /// Auxiliary archive members carried with the configuration.
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn set_archive(&mut self, archive: Archive) {
        self.archive = archive;
    }

    pub fn add_archive(&mut self, entry: ArchiveEntry) {
        self.archive.push(entry);
    }

    fn reindex(&mut self) {
        self.index = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
    }

    /// Renders the graph in the configuration language.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out, "");
        out
    }

    fn write_text(&self, out: &mut String, indent: &str) {
        if !self.requirements.is_empty() {
            out.push_str(&format!("{}require({});\n", indent, self.requirements.join(", ")));
        }
        for element in &self.elements {
            out.push_str(indent);
            out.push_str(&element.name);
            out.push_str(" :: ");
            out.push_str(&element.class);
            if !element.configuration.is_empty() {
                out.push('(');
                out.push_str(&element.configuration);
                out.push(')');
            }
            out.push_str(";\n");
        }
        if !self.elements.is_empty() && !self.connections.is_empty() {
            out.push('\n');
        }
        for connection in &self.connections {
            out.push_str(&format!("{}{};\n", indent, connection));
        }
        if !self.compounds.is_empty() && !(self.elements.is_empty() && self.connections.is_empty()) {
            out.push('\n');
        }
        for compound in &self.compounds {
            compound.write_text(out, indent);
        }
    }

    /// JSON view of the graph for tooling.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RouterError::Serde(format!("failed to serialize router: {}", e)))
    }
}
