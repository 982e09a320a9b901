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

//! # Compiler Configuration
//!
//! Settings for a [`RouterCompiler`](crate::compiler::RouterCompiler). Every
//! field has a default, so a configuration file only lists what it changes:
//!
//! ```json
//! { "strict": true, "parser": { "ignore_line_directives": true } }
//! ```
//!
//! Files are read as JSON or YAML according to their extension.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::archive::DEFAULT_MODE;
use crate::dsl::ParserConfig;
use crate::errors::{Result, RouterError};
use crate::registry::StaticRegistry;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub parser: ParserConfig,
    /// Accept an empty configuration without a warning.
    pub allow_empty: bool,
    /// Fail compiles that produce warnings.
    pub strict: bool,
    /// Permission bits of the `config` member written into archives.
    pub default_mode: u32,
    /// Element classes accepted at finalize; empty accepts any class.
    pub known_classes: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            allow_empty: false,
            strict: false,
            default_mode: DEFAULT_MODE,
            known_classes: Vec::new(),
        }
    }
}

impl CompilerConfig {
    pub fn from_json(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| RouterError::config(format!("invalid compiler configuration: {}", e)))
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source)
            .map_err(|e| RouterError::config(format!("invalid JSON configuration: {}", e)))
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source)
            .map_err(|e| RouterError::config(format!("invalid YAML configuration: {}", e)))
    }

    /// Loads a configuration file, choosing the format by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RouterError::io_at(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Self::from_json_str(&content),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Self::from_yaml_str(&content),
            other => Err(RouterError::config(format!(
                "unsupported configuration format `{}` for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Registry built from `known_classes`, or `None` when the list is empty.
    pub fn registry(&self) -> Option<StaticRegistry> {
        if self.known_classes.is_empty() {
            None
        } else {
            Some(self.known_classes.iter().cloned().collect())
        }
    }
}
