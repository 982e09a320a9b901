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

//! # Diagnostics
//!
//! Landmarks and the accumulating diagnostic sink shared by the lexer, the
//! statement parser and the finalize passes. Every entry carries a landmark
//! (`file:line`) and a severity; only errors gate compile success.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A source location label attached to declarations and diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Landmark {
    pub file: String,
    /// 1-based line; 0 when the landmark names a whole input.
    pub line: u32,
}

impl Landmark {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Landmark for a whole input, without a line number.
    pub fn file(file: impl Into<String>) -> Self {
        Self::new(file, 0)
    }

    /// Label used for a file path; `-` is standard input.
    pub fn for_path(path: &str) -> Self {
        if path == "-" {
            Self::file("<stdin>")
        } else {
            Self::file(path)
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub landmark: Landmark,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "{}: {}", self.landmark, self.message),
            Severity::Warning => write!(f, "{}: warning: {}", self.landmark, self.message),
        }
    }
}

/// Accumulating diagnostic sink. One per compile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error at `landmark`.
    pub fn error(&mut self, landmark: &Landmark, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            landmark: landmark.clone(),
            message: message.into(),
        };
        log::debug!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Records a warning at `landmark`.
    pub fn warning(&mut self, landmark: &Landmark, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            landmark: landmark.clone(),
            message: message.into(),
        };
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn nerrors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn nwarnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// All diagnostics, one per line, in the order they were recorded.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.entries {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        out
    }
}
