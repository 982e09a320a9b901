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

//! Compound expansion and finalize-time resolution.
//!
//! An instance `f` of a compound class is replaced by the compound body,
//! with every inner element renamed `f/inner`. The body's `input` and
//! `output` pseudo-elements become tunnels `f/input` and `f/output`; once
//! the body is spliced in, each connection entering a tunnel port is joined
//! to every connection leaving the same port, so no tunnel survives.

use std::collections::{HashMap, HashSet};

use crate::confparse::{split_args, substitute_params};
use crate::diagnostics::Diagnostics;
use crate::graph::{CompoundKind, CompoundType, Connection, ElementDecl, PortRef, RouterGraph};
use crate::registry::ClassRegistry;

/// Pseudo-element naming a compound's inputs inside its body.
pub const INPUT_PORT_ELEMENT: &str = "input";
/// Pseudo-element naming a compound's outputs inside its body.
pub const OUTPUT_PORT_ELEMENT: &str = "output";

enum ClassResolution<'a> {
    Primitive(String),
    Compound {
        compound: &'a CompoundType,
        formals: &'a [String],
        body: &'a RouterGraph,
        /// Scopes visible inside the body, the body itself last.
        scopes: Vec<&'a RouterGraph>,
    },
    Recursive(String),
}

/// Follows synonyms from `class` until a body compound or a primitive class.
/// `scopes` is innermost last; a definition sees only its own scope and the
/// scopes enclosing it.
fn resolve_class<'a>(
    scopes: &[&'a RouterGraph],
    class: &str,
    active: &[&'a CompoundType],
) -> ClassResolution<'a> {
    let mut scopes = scopes.to_vec();
    let mut class = class.to_string();
    let mut seen: Vec<&'a CompoundType> = Vec::new();

    loop {
        let found = scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(level, graph)| {
                let graph: &'a RouterGraph = *graph;
                graph.compound(&class).map(|c| (level, c))
            });
        let Some((level, compound)) = found else {
            return ClassResolution::Primitive(class);
        };
        let on_stack = |c: &&CompoundType| std::ptr::eq(*c, compound);
        if active.iter().any(on_stack) || seen.iter().any(on_stack) {
            return ClassResolution::Recursive(compound.name.clone());
        }
        seen.push(compound);
        scopes.truncate(level + 1);

        match &compound.kind {
            CompoundKind::Synonym(target) => class = target.clone(),
            CompoundKind::Body { formals, body } => {
                scopes.push(body);
                return ClassResolution::Compound {
                    compound,
                    formals,
                    body,
                    scopes,
                };
            }
        }
    }
}

#[derive(Debug, Default)]
struct Expansion {
    elements: Vec<ElementDecl>,
    connections: Vec<Connection>,
    tunnels: HashSet<String>,
}

#[derive(Clone, Copy)]
enum Side {
    From,
    To,
}

struct Expander<'a, 'd> {
    diag: &'d mut Diagnostics,
    active: Vec<&'a CompoundType>,
}

impl<'a, 'd> Expander<'a, 'd> {
    fn expand_instance(
        &mut self,
        instance: &ElementDecl,
        compound: &'a CompoundType,
        formals: &'a [String],
        body: &'a RouterGraph,
        scopes: Vec<&'a RouterGraph>,
        out: &mut Expansion,
    ) {
        let args = split_args(&instance.configuration);
        if args.len() != formals.len() {
            self.diag.error(
                &instance.landmark,
                format!(
                    "element class `{}` takes {} argument(s), `{}` passes {}",
                    compound.name,
                    formals.len(),
                    instance.name,
                    args.len()
                ),
            );
        }
        let bindings: HashMap<String, String> = formals
            .iter()
            .cloned()
            .zip(args.into_iter().chain(std::iter::repeat(String::new())))
            .collect();

        let prefix = format!("{}/", instance.name);
        out.tunnels.insert(format!("{}{}", prefix, INPUT_PORT_ELEMENT));
        out.tunnels.insert(format!("{}{}", prefix, OUTPUT_PORT_ELEMENT));

        self.active.push(compound);
        self.expand_body(body, &prefix, &bindings, &scopes, out);
        self.active.pop();
    }

    fn expand_body(
        &mut self,
        body: &'a RouterGraph,
        prefix: &str,
        bindings: &HashMap<String, String>,
        scopes: &[&'a RouterGraph],
        out: &mut Expansion,
    ) {
        let mut instances = HashSet::new();
        for element in body.elements() {
            let decl = ElementDecl {
                name: format!("{}{}", prefix, element.name),
                class: element.class.clone(),
                configuration: substitute_params(&element.configuration, bindings),
                landmark: element.landmark.clone(),
            };
            match resolve_class(scopes, &element.class, &self.active) {
                ClassResolution::Primitive(class) => out.elements.push(ElementDecl { class, ..decl }),
                ClassResolution::Compound {
                    compound,
                    formals,
                    body,
                    scopes,
                } => {
                    instances.insert(element.name.as_str());
                    self.expand_instance(&decl, compound, formals, body, scopes, out);
                }
                ClassResolution::Recursive(name) => {
                    self.diag.error(
                        &element.landmark,
                        format!("recursive element class `{}` in `{}`", name, decl.name),
                    );
                    out.elements.push(decl);
                }
            }
        }

        for connection in body.connections() {
            let from = self.map_endpoint(&connection.from, prefix, &instances, Side::From, connection);
            let to = self.map_endpoint(&connection.to, prefix, &instances, Side::To, connection);
            if let (Some(from), Some(to)) = (from, to) {
                out.connections.push(Connection {
                    from,
                    to,
                    landmark: connection.landmark.clone(),
                });
            }
        }
    }

    fn map_endpoint(
        &mut self,
        port: &PortRef,
        prefix: &str,
        instances: &HashSet<&str>,
        side: Side,
        connection: &Connection,
    ) -> Option<PortRef> {
        let name = port.element.as_str();
        let misused = match side {
            Side::From => name == OUTPUT_PORT_ELEMENT,
            Side::To => name == INPUT_PORT_ELEMENT,
        };
        if misused {
            self.diag.error(
                &connection.landmark,
                format!("`{}` used on the wrong side of a connection in `{}`", name, prefix.trim_end_matches('/')),
            );
            return None;
        }

        let element = if instances.contains(name) {
            let tunnel = match side {
                Side::From => OUTPUT_PORT_ELEMENT,
                Side::To => INPUT_PORT_ELEMENT,
            };
            format!("{}{}/{}", prefix, name, tunnel)
        } else {
            format!("{}{}", prefix, name)
        };
        Some(PortRef::new(element, port.port))
    }
}

/// Joins connections through tunnel elements and drops the tunnels.
fn splice_tunnels(
    connections: Vec<Connection>,
    tunnels: &HashSet<String>,
    diag: &mut Diagnostics,
) -> Vec<Connection> {
    if tunnels.is_empty() {
        return connections;
    }

    let mut exits: HashMap<&PortRef, Vec<usize>> = HashMap::new();
    for (i, connection) in connections.iter().enumerate() {
        if tunnels.contains(&connection.from.element) {
            exits.entry(&connection.from).or_default().push(i);
        }
    }

    let mut spliced = Vec::with_capacity(connections.len());
    for connection in &connections {
        if tunnels.contains(&connection.from.element) {
            continue;
        }
        let mut targets = Vec::new();
        let mut visited = HashSet::new();
        follow(&connection.to, &connections, &exits, tunnels, &mut visited, &mut targets);
        if targets.is_empty() {
            diag.warning(
                &connection.landmark,
                format!(
                    "connection to `{}` port {} leads nowhere",
                    connection.to.element, connection.to.port
                ),
            );
        }
        for to in targets {
            spliced.push(Connection {
                from: connection.from.clone(),
                to,
                landmark: connection.landmark.clone(),
            });
        }
    }
    spliced
}

fn follow<'c>(
    to: &'c PortRef,
    connections: &'c [Connection],
    exits: &HashMap<&'c PortRef, Vec<usize>>,
    tunnels: &HashSet<String>,
    visited: &mut HashSet<&'c PortRef>,
    targets: &mut Vec<PortRef>,
) {
    if !tunnels.contains(&to.element) {
        targets.push(to.clone());
        return;
    }
    if !visited.insert(to) {
        return;
    }
    if let Some(indices) = exits.get(to) {
        for &i in indices {
            follow(&connections[i].to, connections, exits, tunnels, visited, targets);
        }
    }
}

enum Instantiation {
    NotCompound,
    Renamed(String),
    Expanded(Expansion),
}

impl RouterGraph {
    /// Expands the element `instance` in place if its class names a compound
    /// (directly or through synonyms). Returns whether the graph changed.
    pub fn instantiate_compound(&mut self, instance: &str, diag: &mut Diagnostics) -> bool {
        let Some(&position) = self.index.get(instance) else {
            return false;
        };
        let decl = self.elements[position].clone();

        let outcome = {
            let scopes = [&*self];
            match resolve_class(&scopes, &decl.class, &[]) {
                ClassResolution::Primitive(class) if class == decl.class => Instantiation::NotCompound,
                ClassResolution::Primitive(class) => Instantiation::Renamed(class),
                ClassResolution::Recursive(name) => {
                    diag.error(
                        &decl.landmark,
                        format!("recursive element class `{}` in `{}`", name, decl.name),
                    );
                    Instantiation::NotCompound
                }
                ClassResolution::Compound {
                    compound,
                    formals,
                    body,
                    scopes,
                } => {
                    let mut expansion = Expansion::default();
                    let mut expander = Expander {
                        diag: &mut *diag,
                        active: Vec::new(),
                    };
                    expander.expand_instance(&decl, compound, formals, body, scopes, &mut expansion);
                    Instantiation::Expanded(expansion)
                }
            }
        };

        match outcome {
            Instantiation::NotCompound => false,
            Instantiation::Renamed(class) => {
                self.elements[position].class = class;
                true
            }
            Instantiation::Expanded(expansion) => {
                self.splice_expansion(position, expansion, diag);
                true
            }
        }
    }

    fn splice_expansion(&mut self, position: usize, expansion: Expansion, diag: &mut Diagnostics) {
        let instance = self.elements[position].name.clone();

        let mut inner = Vec::with_capacity(expansion.elements.len());
        let mut fresh = HashSet::new();
        for element in expansion.elements {
            let taken = (self.index.contains_key(&element.name) && element.name != instance)
                || !fresh.insert(element.name.clone());
            if taken {
                diag.error(
                    &element.landmark,
                    format!("expanding `{}` redeclares element `{}`", instance, element.name),
                );
                continue;
            }
            inner.push(element);
        }
        self.elements.splice(position..=position, inner);
        self.reindex();

        let input = format!("{}/{}", instance, INPUT_PORT_ELEMENT);
        let output = format!("{}/{}", instance, OUTPUT_PORT_ELEMENT);
        for connection in &mut self.connections {
            if connection.from.element == instance {
                connection.from.element = output.clone();
            }
            if connection.to.element == instance {
                connection.to.element = input.clone();
            }
        }
        self.connections.extend(expansion.connections);
        let connections = std::mem::take(&mut self.connections);
        self.connections = splice_tunnels(connections, &expansion.tunnels, diag);
    }

    /// Expands every compound instance, leaving only primitive elements.
    pub fn flatten(&mut self, diag: &mut Diagnostics) {
        let names: Vec<String> = self.elements.iter().map(|e| e.name.clone()).collect();
        for name in names {
            self.instantiate_compound(&name, diag);
        }
    }

    /// Reports dangling connection endpoints and, with a registry, element
    /// classes it does not know. Run after [`RouterGraph::flatten`].
    pub fn resolve(&self, registry: Option<&dyn ClassRegistry>, diag: &mut Diagnostics) {
        let mut reported = HashSet::new();
        for connection in &self.connections {
            for end in [&connection.from, &connection.to] {
                if !self.has_element(&end.element) && reported.insert(end.element.as_str()) {
                    diag.error(
                        &connection.landmark,
                        format!("undeclared element `{}`", end.element),
                    );
                }
            }
        }

        if let Some(registry) = registry {
            for element in &self.elements {
                if !registry.contains(&element.class) {
                    diag.error(
                        &element.landmark,
                        format!("unknown element class `{}` for `{}`", element.class, element.name),
                    );
                }
            }
        }
    }

    /// Flattens compounds, then resolves cross references.
    pub fn finalize(&mut self, registry: Option<&dyn ClassRegistry>, diag: &mut Diagnostics) {
        self.flatten(diag);
        self.resolve(registry, diag);
    }
}
