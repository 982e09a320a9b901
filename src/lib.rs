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

//! # Routec Core Library
//!
//! Configuration compiler for modular packet-processing routers. Routec reads
//! the router configuration language into a [`RouterGraph`] of elements and
//! connections, expands compound element classes, and writes graphs back as
//! text or as an `ar` archive carrying auxiliary members.
//!
//! ## Module Overview
//!
//! - **archive**: `ar` container codec with last-live shadowing
//! - **dsl**: lexer and incremental statement parser
//! - **graph**: router graph model, compound expansion and text output
//! - **compiler**: read/write façade over archives, text, files and stdio
//! - **diagnostics**: landmark-tagged errors and warnings
//! - **config**: compiler settings loaded from JSON or YAML
//! - **registry**: element class lookup supplied by the embedding runtime
//! - **metric**: link-metric capability and the threshold metric
//!
//! ## Feature Flags
//!
//! - `yaml`: YAML compiler configuration files
//! - `full`: Enables all features
//!
//! ## Quick Start
//!
//! ```rust
//! use routec::{OutputTarget, RouterCompiler};
//!
//! let compiler = RouterCompiler::new();
//! let compilation = compiler.read_expr("a :: Class1; b :: Class2; a -> b;")?;
//! assert_eq!(compilation.graph.element_count(), 2);
//! compiler.write(&compilation.graph, &OutputTarget::parse("-"))?;
//! # Ok::<(), routec::RouterError>(())
//! ```
//!
//! ## Error Handling
//!
//! Syntax and resolution problems accumulate in [`Diagnostics`] so that one
//! compile reports all of them. Archive format and IO failures abort the
//! read or write and surface as [`RouterError`].

pub mod archive;
pub mod compiler;
pub mod config;
pub mod confparse;
pub mod diagnostics;
pub mod dsl;
pub mod errors;
pub mod graph;
pub mod metric;
pub mod registry;
pub mod text;

pub use archive::{Archive, ArchiveEntry, CONFIG_SECTION};
pub use compiler::{Compilation, OutputTarget, RouterCompiler};
pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Landmark, Severity};
pub use dsl::{ParserConfig, StatementParser};
pub use errors::{ArchiveError, Result, RouterError};
pub use graph::{CompoundKind, CompoundType, Connection, ElementDecl, PortRef, RouterGraph};
pub use metric::{EtherAddress, LinkMetric, LinkStats, Metric, ThresholdConfig, ThresholdMetric};
pub use registry::{ClassRegistry, StaticRegistry};
pub use text::xml_quote;
